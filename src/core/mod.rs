pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items for convenience
pub use config::Config;
pub use errors::{ApiError, ConfigError, DetectionError, TranslationError};
pub use types::{AppState, DetectionRecord, RawDetection, TranslateRequest, TranslationResult};
