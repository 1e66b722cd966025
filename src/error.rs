//! Error types for the ask gateway.
//!
//! Every failure that can reach the HTTP boundary is one of these variants.
//! An error is constructed where the failure is detected and carried
//! unchanged through every layer to the handler that renders it.

use axum::http::StatusCode;
use thiserror::Error;

/// Gateway Result type
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Classified service error, surfaced as `{ "detail": ... }` plus a status.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing credential or failed provider-client construction.
    #[error("{0}")]
    Configuration(String),

    /// The provider returned zero candidates.
    #[error(
        "Gemini did not return any candidates. This can happen if the request \
         was blocked by safety filters or the prompt was invalid."
    )]
    NoCandidates,

    /// A candidate was present but produced no extractable text.
    #[error(
        "Gemini returned no text (finish_reason={finish_reason}). This usually \
         means the response was blocked by safety filters or the model chose \
         not to answer."
    )]
    EmptyResponse { finish_reason: String },

    /// Any other provider, network, or decode failure.
    #[error("Gemini API error: {0}")]
    Provider(String),

    /// Unanticipated failure; details stay server-side.
    #[error("Internal server error. Please try again later.")]
    Internal,
}

impl ServiceError {
    /// Stable HTTP status for each variant.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Configuration(_) | ServiceError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::NoCandidates
            | ServiceError::EmptyResponse { .. }
            | ServiceError::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }
}
