// Sign detection: model registry, YOLO inference and output normalization

pub mod labels;
pub mod normalize;
pub mod registry;
pub mod yolo;

use image::DynamicImage;

use crate::core::errors::DetectionResult;
use crate::core::types::DetectionRecord;

pub use labels::ClassNames;
pub use normalize::normalize;
pub use registry::{ModelKind, ModelRegistry};
pub use yolo::YoloDetector;

/// Boxes scoring at or below this are never reported
pub const CONFIDENCE_THRESHOLD: f32 = 0.25;

/// A loaded detection model.
///
/// Implementations are shared across requests and must be safe to call
/// concurrently. `detect` is synchronous and CPU bound; callers run it on
/// the blocking pool.
pub trait Detector: Send + Sync {
    fn name(&self) -> &str;

    fn detect(&self, frame: &DynamicImage) -> DetectionResult<Vec<DetectionRecord>>;
}
