use reqwest::Client;
use serde_json::Value;

use crate::config::{Config, Strategy};
use crate::models::{EngraveRequest, EngraveResponse};
use crate::provider;

// ── Constants ────────────────────────────────────────────────────────────────

/// Field names probed, in order, when a provider returns a structured object.
pub const URL_FIELDS: &[&str] = &[
    "url",
    "output",
    "image",
    "png",
    "result",
    "resultUrl",
    "output_url",
];

const PROMPT_BASE: &str = "Render this product photo as a laser engraving: high-contrast grayscale \
with clean edges, subject centered with its proportions preserved, no added frames or borders, \
transparent background, output at least 1024 pixels tall.";

const PROMPT_REMOVE_BACKGROUND: &str =
    "Remove the background entirely, leaving a clean cutout edge around the subject.";

const PROMPT_KEEP_BACKGROUND: &str =
    "Keep the background, but subdue it into a faint engraving texture behind the subject.";

const PROMPT_LIGHTBASE: &str =
    "Render brighter, as if the engraving is illuminated from below by a light base.";

const PROMPT_NO_LIGHTBASE: &str = "Render with softer tones, as an unlit engraved object.";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Provider(String),
    #[error("{0}")]
    Extraction(String),
}

// ── Input normalizer ─────────────────────────────────────────────────────────

/// Collapse the two accepted input forms into one reference the providers
/// accept: a fetchable URL, or a data URL. A bare base64 payload is promoted
/// to a PNG data URL. Empty strings count as absent.
pub fn normalize_input(
    image_base64: Option<&str>,
    image_url: Option<&str>,
) -> Result<String, PipelineError> {
    if let Some(url) = image_url.filter(|s| !s.is_empty()) {
        return Ok(url.to_string());
    }
    match image_base64.filter(|s| !s.is_empty()) {
        Some(b64) if b64.starts_with("data:") => Ok(b64.to_string()),
        Some(b64) => Ok(format!("data:image/png;base64,{b64}")),
        None => Err(PipelineError::Validation(
            "Missing imageBase64 or imageUrl".to_string(),
        )),
    }
}

// ── Prompt composer ──────────────────────────────────────────────────────────

/// Deterministic instruction string for the style-transformation provider:
/// base segment, background segment, lighting segment, newline-separated.
pub fn compose_prompt(remove_background: bool, has_lightbase: bool) -> String {
    let background = if remove_background {
        PROMPT_REMOVE_BACKGROUND
    } else {
        PROMPT_KEEP_BACKGROUND
    };
    let lighting = if has_lightbase {
        PROMPT_LIGHTBASE
    } else {
        PROMPT_NO_LIGHTBASE
    };
    [PROMPT_BASE, background, lighting].join("\n").trim().to_string()
}

// ── Output extractor ─────────────────────────────────────────────────────────

/// Locate the single result URL in a provider response. Providers are not
/// stable in their response shape: the value may be a bare string, an array
/// of strings, or an object keyed by any of `URL_FIELDS`.
pub fn extract_output_url(response: &Value) -> Result<String, PipelineError> {
    let candidate = match response {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) => items.first().and_then(Value::as_str),
        Value::Object(fields) => URL_FIELDS.iter().find_map(|name| {
            fields
                .get(*name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        }),
        _ => None,
    };

    let url = candidate.ok_or_else(|| {
        PipelineError::Extraction(format!("Unexpected model output format: {response}"))
    })?;

    if !url.starts_with("http") {
        return Err(PipelineError::Extraction(format!(
            "Could not extract output URL. Got: {url:?}"
        )));
    }

    Ok(url.to_string())
}

// ── Orchestrator ─────────────────────────────────────────────────────────────

/// Single-pass pipeline: validate credentials, normalize the input, remove
/// the background if asked, then hand the image to the configured transform.
/// The two provider calls are strictly sequential; any failure short-circuits.
pub async fn run(
    http: &Client,
    config: &Config,
    request: &EngraveRequest,
) -> Result<EngraveResponse, PipelineError> {
    let replicate_token = if request.remove_background {
        Some(required_credential(
            config.replicate_api_token.as_deref(),
            "REPLICATE_API_TOKEN",
        )?)
    } else {
        None
    };

    let style = match config.strategy {
        Strategy::PromptedStyleTransfer => Some((
            required_credential(config.style_api_url.as_deref(), "ENGRAVE_STYLE_API_URL")?,
            required_credential(config.style_api_token.as_deref(), "ENGRAVE_STYLE_API_TOKEN")?,
        )),
        Strategy::BackgroundOnly => None,
    };

    let mut processed = normalize_input(
        request.image_base64.as_deref(),
        request.image_url.as_deref(),
    )?;

    if let Some(token) = replicate_token {
        let output = provider::remove_background(http, config, token, &processed).await?;
        processed = extract_output_url(&output)?;
    }

    let engraving_url = match style {
        None => processed,
        Some((endpoint, token)) => {
            let prompt = compose_prompt(request.remove_background, request.has_lightbase);
            let response =
                provider::style_transform(http, endpoint, token, &processed, &prompt).await?;
            extract_output_url(&response)?
        }
    };

    Ok(EngraveResponse { engraving_url })
}

fn required_credential<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, PipelineError> {
    value.ok_or_else(|| PipelineError::Configuration(format!("Missing {name} env var")))
}

// ── Tests ────────────────────────────────────────────────────────────────────
