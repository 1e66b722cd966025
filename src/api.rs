//! REST API for the ask gateway
//!
//! One public endpoint plus a health check:
//! - `POST /api/v1/ask` - forward a prompt to Gemini, return the normalized
//!   answer with token accounting
//! - `GET /` - liveness probe

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::error::ServiceError;
use crate::llm_client::LlmClient;

// ============================================================================
// SHARED STATE
// ============================================================================

/// API state shared across all handlers.
pub struct ApiState {
    pub settings: Settings,
    /// Lazily constructed Gemini client, shared by every request after the
    /// first successful construction. A failed construction is not cached;
    /// the next request re-attempts it.
    client: OnceCell<LlmClient>,
}

impl ApiState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            client: OnceCell::new(),
        }
    }

    /// The shared client, constructing it on first use.
    pub async fn client(&self) -> Result<&LlmClient, ServiceError> {
        self.client
            .get_or_try_init(|| async { LlmClient::new(&self.settings) })
            .await
    }
}

// ============================================================================
// ASK ENDPOINT
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    /// User prompt or question to send to the LLM.
    pub prompt: String,
    /// Maximum tokens to generate. Deserialized as a raw JSON value so a
    /// non-integer resolves to the default limit instead of rejecting the
    /// whole request at the framework layer.
    #[serde(default)]
    pub max_tokens: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub model: String,
    /// Derived token total; null when the provider reported no usage.
    pub usage_tokens: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

fn error_reply(status: StatusCode, detail: impl Into<String>) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            detail: detail.into(),
        }),
    )
}

/// POST /api/v1/ask - Ask the LLM a question
///
/// Classified errors keep the status and message they were constructed
/// with. Anything that escapes classification (a panic in the core path)
/// is logged server-side and surfaced as a generic internal error.
pub async fn ask(
    State(state): State<Arc<ApiState>>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, (StatusCode, Json<ErrorBody>)> {
    info!("received /ask request");

    if req.prompt.trim().is_empty() {
        return Err(error_reply(
            StatusCode::BAD_REQUEST,
            "prompt must not be empty",
        ));
    }

    let worker = {
        let state = state.clone();
        tokio::spawn(async move {
            let client = state.client().await?;
            client.ask(&req.prompt, req.max_tokens.as_ref()).await
        })
    };

    match worker.await {
        Ok(Ok(result)) => {
            info!("successfully processed /ask request");
            Ok(Json(AskResponse {
                usage_tokens: result.usage.derived_total(),
                answer: result.answer,
                model: result.model,
            }))
        }
        Ok(Err(e)) => {
            warn!(error = %e, "LLM service error");
            Err(error_reply(e.status_code(), e.to_string()))
        }
        Err(join_error) => {
            error!(error = %join_error, "unexpected error in /ask endpoint");
            let e = ServiceError::Internal;
            Err(error_reply(e.status_code(), e.to_string()))
        }
    }
}

// ============================================================================
// HEALTH ENDPOINT
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub app: String,
    pub version: String,
}

/// GET / - Simple health check endpoint
pub async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        app: state.settings.app_name.clone(),
        version: state.settings.app_version.clone(),
    })
}
