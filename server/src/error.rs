//! Unified error handling for the server.

use crate::config::ConfigError;
use crate::protocol::Response;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Engine(#[from] sgmock_engine::Error),

    #[error("Invalid request: {0}")]
    Protocol(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AppError {
    /// Error class reported on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Engine(e) => e.kind().as_str(),
            AppError::Protocol(_) | AppError::Json(_) => "protocol",
            AppError::Io(_) => "io",
            AppError::Config(_) => "configuration",
        }
    }

    /// Turn this error into a response, logging it on the way.
    pub fn into_response(self, request_id: Option<String>) -> Response {
        match &self {
            AppError::Io(e) => tracing::error!(error = %e, "request failed"),
            other => tracing::warn!(kind = other.kind(), error = %other, "request rejected"),
        }
        Response::error(self.kind(), self.to_string(), request_id)
    }
}

/// Result type alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
