pub mod detection;
pub mod onnx_builder;
pub mod translation;

// Re-export commonly used services
pub use detection::{Detector, ModelKind, ModelRegistry, YoloDetector};
pub use translation::{SpeechSynthesizer, TranslationBridge, Translator};
