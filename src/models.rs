use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngraveRequest {
    pub image_base64: Option<String>,
    pub image_url: Option<String>,
    pub remove_background: bool,
    pub has_lightbase: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngraveResponse {
    pub engraving_url: String,
}
