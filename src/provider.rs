use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};

use crate::config::Config;
use crate::pipeline::PipelineError;

// ── Constants ────────────────────────────────────────────────────────────────

const USER_AGENT: &str = "engraving-api/1.0";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// ── Client construction ──────────────────────────────────────────────────────

/// Shared outbound client, built once at startup. The request timeout bounds
/// how long a single provider call may block the pipeline.
pub fn build_client() -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .expect("failed to build HTTP client")
}

// ── Background removal (Replicate) ───────────────────────────────────────────

/// Run the background-removal model in sync mode and return the raw model
/// output value for the extractor to interpret.
pub async fn remove_background(
    http: &Client,
    config: &Config,
    api_token: &str,
    image: &str,
) -> Result<Value, PipelineError> {
    let endpoint = format!(
        "{}/models/{}/predictions",
        config.replicate_api_base, config.background_model
    );

    let response = http
        .post(&endpoint)
        .bearer_auth(api_token)
        .header("Prefer", "wait")
        .json(&json!({ "input": { "image": image } }))
        .send()
        .await
        .map_err(|e| send_error("Background removal", e))?;

    let prediction = response_json_or_error("Background removal", response).await?;

    if let Some(status) = prediction.get("status").and_then(Value::as_str) {
        if matches!(status, "failed" | "canceled") {
            return Err(PipelineError::Provider(format!(
                "Background removal prediction failed: {prediction}"
            )));
        }
    }

    let output = prediction.get("output").cloned().unwrap_or(Value::Null);
    tracing::debug!("background removal output: {}", output);
    Ok(output)
}

// ── Style transformation ─────────────────────────────────────────────────────

/// Send the image and composed prompt to the style-transformation provider
/// and return its JSON body verbatim.
pub async fn style_transform(
    http: &Client,
    endpoint: &str,
    api_token: &str,
    image: &str,
    prompt: &str,
) -> Result<Value, PipelineError> {
    let response = http
        .post(endpoint)
        .bearer_auth(api_token)
        .json(&json!({ "image": image, "prompt": prompt }))
        .send()
        .await
        .map_err(|e| send_error("Style transform", e))?;

    let payload = response_json_or_error("Style transform", response).await?;
    tracing::debug!("style transform output: {}", payload);
    Ok(payload)
}

// ── Shared response handling ─────────────────────────────────────────────────

fn send_error(context: &str, e: reqwest::Error) -> PipelineError {
    if e.is_timeout() {
        PipelineError::Provider(format!("{context} timed out: {e}"))
    } else if e.is_connect() {
        PipelineError::Provider(format!("{context} connection failed: {e}"))
    } else {
        PipelineError::Provider(format!("{context} request failed: {e}"))
    }
}

async fn response_json_or_error(
    context: &str,
    response: reqwest::Response,
) -> Result<Value, PipelineError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| PipelineError::Provider(format!("{context} response unreadable: {e}")))?;

    if !status.is_success() {
        return Err(PipelineError::Provider(format!(
            "{context} returned {status}: {body}"
        )));
    }

    serde_json::from_str(&body)
        .map_err(|_| PipelineError::Provider(format!("{context} returned non-JSON: {body}")))
}
