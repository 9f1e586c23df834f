use crate::core::types::{DetectionRecord, RawDetection};
use crate::services::detection::labels::ClassNames;

/// Turn decoded model output into response records.
///
/// Corners are truncated toward zero, labels resolved through `names`.
/// Order is kept exactly as the model produced it.
pub fn normalize(detections: &[RawDetection], names: &ClassNames) -> Vec<DetectionRecord> {
    detections
        .iter()
        .map(|det| DetectionRecord {
            x1: det.bbox[0] as i32,
            y1: det.bbox[1] as i32,
            x2: det.bbox[2] as i32,
            y2: det.bbox[3] as i32,
            label: names.resolve(det.class_id),
            confidence: det.confidence,
        })
        .collect()
}
