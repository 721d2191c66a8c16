//! Shared error and result types

use hyper::StatusCode;

use crate::services::ServiceError;

/// Errors surfaced by the orchestrator and the HTTP boundary
#[derive(Debug, thiserror::Error)]
pub enum TrellisError {
    /// Malformed or missing request input
    #[error("{0}")]
    Validation(String),

    /// Referenced entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// A downstream collaborator failed
    #[error("{operation} failed: {message}")]
    ExternalService { operation: String, message: String },

    /// Store backend failure
    #[error("Database error: {0}")]
    Database(String),

    /// Startup configuration problem
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrellisError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// HTTP status this error maps to at the boundary
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ExternalService { .. } | Self::Database(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Io(_) | Self::Json(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short machine-readable kind used in error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::NotFound(_) => "NotFoundError",
            Self::ExternalService { .. } | Self::Database(_) => "ExternalServiceError",
            Self::Config(_) => "ConfigError",
            Self::Io(_) | Self::Json(_) | Self::Internal(_) => "InternalError",
        }
    }
}

impl From<ServiceError> for TrellisError {
    fn from(err: ServiceError) -> Self {
        Self::ExternalService {
            operation: err.operation.to_string(),
            message: err.message,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrellisError>;
