use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::json;

mod config;
mod models;
mod pipeline;
mod provider;

use config::Config;
use models::EngraveRequest;
use pipeline::PipelineError;

pub struct AppState {
    config: Config,
    http: reqwest::Client,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let state = Arc::new(AppState {
        config: Config::from_env(),
        http: provider::build_client(),
    });

    let app = app(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await.unwrap();
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/engrave", any(engrave_endpoint))
        .layer(middleware::from_fn(cors))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

// TODO: tighten the allowed origin to the storefront domain.
async fn cors(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

async fn engrave_endpoint(
    State(state): State<Arc<AppState>>,
    method: Method,
    body: Bytes,
) -> Response {
    if method == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    if method != Method::POST {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({"error": "POST only"})),
        )
            .into_response();
    }

    // An unparsable body is treated the same as an empty one.
    let request: EngraveRequest = serde_json::from_slice(&body).unwrap_or_default();

    match pipeline::run(&state.http, &state.config, &request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            tracing::error!("engrave failed: {}", e);
            let (status, body) = match &e {
                PipelineError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({"error": msg})),
                PipelineError::Configuration(msg) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, json!({"error": msg}))
                }
                PipelineError::Provider(details) | PipelineError::Extraction(details) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": "AI processing failed", "details": details}),
                ),
            };
            (status, Json(body)).into_response()
        }
    }
}
