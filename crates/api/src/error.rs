use agentdash_core::error::CoreError;
use agentdash_core::invocation::InvocationError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`InvocationError`] and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `agentdash_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An agent CLI invocation that did not succeed.
    #[error(transparent)]
    Invocation(#[from] InvocationError),

    /// A request body that could not be read as the expected JSON.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Template(err) => {
                    tracing::error!(error = %err, "Script template error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "TEMPLATE_ERROR",
                        err.to_string(),
                    )
                }
                CoreError::InvalidCli(msg) | CoreError::Config(msg) => {
                    tracing::error!(error = %msg, "Configuration error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Invocation failures ---
            AppError::Invocation(err) => classify_invocation_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let mut body = json!({
            "success": false,
            "error": message,
            "code": code,
        });
        if let AppError::Invocation(err) = &self {
            if let Some(exit_code) = err.exit_code() {
                body["exit_code"] = json!(exit_code);
            }
        }

        (status, axum::Json(body)).into_response()
    }
}

/// Classify an invocation failure into an HTTP status, error code, and message.
///
/// The message is the process diagnostic, passed through unmodified.
fn classify_invocation_error(err: &InvocationError) -> (StatusCode, &'static str, String) {
    match err {
        InvocationError::NonZeroExit { .. } => {
            (StatusCode::BAD_GATEWAY, "NON_ZERO_EXIT", err.diagnostic())
        }
        InvocationError::TimedOut { .. } => {
            (StatusCode::GATEWAY_TIMEOUT, "TIMED_OUT", err.diagnostic())
        }
        InvocationError::Spawn { program, .. } => {
            tracing::error!(%program, error = %err, "Agent CLI could not be started");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SPAWN_FAILURE",
                err.diagnostic(),
            )
        }
        InvocationError::ArtifactWrite { .. } => {
            tracing::error!(error = %err, "Script artifact could not be written");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "ARTIFACT_WRITE_ERROR",
                err.diagnostic(),
            )
        }
        InvocationError::Template(_) => {
            tracing::error!(error = %err, "Script template error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "TEMPLATE_ERROR",
                err.diagnostic(),
            )
        }
        InvocationError::Aborted(msg) => {
            tracing::error!(error = %msg, "Invocation aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
