// Request, response and shared state types

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::services::detection::ModelRegistry;
use crate::services::translation::TranslationBridge;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    pub bridge: Arc<TranslationBridge>,
    /// Request body limit applied to the upload routes
    pub max_upload_bytes: usize,
}

/// One detected box as returned by `/detect`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
    pub label: String,
    pub confidence: f32,
}

/// Raw box produced by model output decoding, before label resolution.
/// Coordinates are in original frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub bbox: [f32; 4],
    pub class_id: usize,
    pub confidence: f32,
}

/// Body of `POST /translate`. Both fields are optional here so that a
/// missing field is reported as a 400 rather than a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranslateRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Translated text plus its speech rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub translated_text: String,
    /// `data:audio/mp3;base64,...`
    pub audio_url: String,
}
