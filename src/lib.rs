// Library exports for the sign detection and translation backend

pub mod core;
pub mod server;
pub mod services;
pub mod utils;

// Re-export commonly used types and functions
pub use core::{
    config::Config,
    errors::{ApiError, ConfigError, DetectionError, TranslationError},
    types::{AppState, DetectionRecord, TranslateRequest, TranslationResult},
};

pub use server::create_app;

pub use services::{
    Detector, ModelKind, ModelRegistry, SpeechSynthesizer, TranslationBridge, Translator,
    YoloDetector,
};

pub use utils::{decode_frame, to_nchw_tensor};
