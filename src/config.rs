use std::env;

const DEFAULT_REPLICATE_API_BASE: &str = "https://api.replicate.com/v1";
const DEFAULT_BACKGROUND_MODEL: &str = "recraft-ai/recraft-remove-background";

/// Which transform runs after the optional background-removal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    BackgroundOnly,
    PromptedStyleTransfer,
}

impl Strategy {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("background-only") => Strategy::BackgroundOnly,
            _ => Strategy::PromptedStyleTransfer,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub replicate_api_token: Option<String>,
    pub replicate_api_base: String,
    pub background_model: String,
    pub style_api_url: Option<String>,
    pub style_api_token: Option<String>,
    pub strategy: Strategy,
}

impl Config {
    /// Read the environment once at startup. Missing tokens are recorded as
    /// `None` and surface as configuration errors per request, not a crash.
    pub fn from_env() -> Self {
        Self {
            replicate_api_token: non_empty_env("REPLICATE_API_TOKEN"),
            replicate_api_base: non_empty_env("REPLICATE_API_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_REPLICATE_API_BASE.to_string()),
            background_model: non_empty_env("ENGRAVE_BACKGROUND_MODEL")
                .unwrap_or_else(|| DEFAULT_BACKGROUND_MODEL.to_string()),
            style_api_url: non_empty_env("ENGRAVE_STYLE_API_URL"),
            style_api_token: non_empty_env("ENGRAVE_STYLE_API_TOKEN"),
            strategy: Strategy::parse(non_empty_env("ENGRAVE_STRATEGY").as_deref()),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
