// Error types for the detection and translation services
//
// Each service gets its own thiserror enum; ApiError is the single
// place where they are turned into HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

/// Message returned when `/translate` is missing one of its fields
pub const MISSING_TRANSLATE_FIELDS: &str = "Missing text or language";

/// Detection service errors
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("ONNX inference failed: {0}")]
    InferenceFailed(#[from] ort::Error),

    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    #[error("Failed to load {model} model from {path}: {reason}")]
    ModelLoadFailed {
        model: String,
        path: String,
        reason: String,
    },

    #[error("Failed to read labels file {path}: {source}")]
    LabelsUnreadable {
        path: String,
        source: std::io::Error,
    },

    #[error("Unexpected model output shape {shape:?} (expected [1, 4 + classes, N])")]
    UnexpectedOutput { shape: Vec<i64> },

    #[error("Session pool for {0} model is closed")]
    PoolClosed(String),
}

/// Translation and speech synthesis errors
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Missing text or language")]
    MissingFields,

    #[error("{provider} request failed: {source}")]
    RequestFailed {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned {status}: {body}")]
    ProviderStatus {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("Invalid {provider} response: {reason}")]
    InvalidResponse {
        provider: &'static str,
        reason: String,
    },

    #[error("No text to speak")]
    NothingToSpeak,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IoU threshold must be in [0.0, 1.0], got {0}")]
    InvalidIoUThreshold(f32),

    #[error("Target size must be a multiple of 32 between 32 and 2048, got {0}")]
    InvalidTargetSize(u32),

    #[error("{name} must be > 0")]
    MustBePositive { name: &'static str },

    #[error("Unknown inference backend '{0}' (valid: auto, cpu, cuda, tensorrt, coreml, directml, openvino)")]
    UnknownBackend(String),

    #[error("Invalid {name} URL: {value}")]
    InvalidUrl { name: &'static str, value: String },
}

pub type DetectionResult<T> = Result<T, DetectionError>;
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Error returned from route handlers, rendered as `{"error": message}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<DetectionError> for ApiError {
    fn from(err: DetectionError) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<TranslationError> for ApiError {
    fn from(err: TranslationError) -> Self {
        match err {
            TranslationError::MissingFields => Self::bad_request(MISSING_TRANSLATE_FIELDS),
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}
