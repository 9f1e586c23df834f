use image::DynamicImage;
use ort::value::Value;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::core::config::{DetectionConfig, ModelSource};
use crate::core::errors::{DetectionError, DetectionResult};
use crate::core::types::{DetectionRecord, RawDetection};
use crate::services::detection::labels::ClassNames;
use crate::services::detection::normalize::normalize;
use crate::services::detection::{Detector, CONFIDENCE_THRESHOLD};
use crate::services::onnx_builder::OnnxSessionPool;
use crate::utils::image_ops::{to_nchw_tensor, Letterbox};

/// Parameters for turning raw YOLO output into boxes
#[derive(Debug, Clone, Copy)]
pub struct DecodeParams {
    pub target_size: u32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl From<&DetectionConfig> for DecodeParams {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            target_size: config.target_size,
            iou_threshold: config.iou_threshold,
            max_detections: config.max_detections,
        }
    }
}

/// Exported YOLO detector running on ONNX Runtime
pub struct YoloDetector {
    name: String,
    pool: OnnxSessionPool,
    input_name: String,
    names: ClassNames,
    params: DecodeParams,
}

impl YoloDetector {
    /// Load the model described by `source`. Builds the whole session pool
    /// up front, so a broken model file fails here rather than per request.
    pub fn load(name: &str, source: &ModelSource, config: &DetectionConfig) -> DetectionResult<Self> {
        let model_path = Path::new(&source.model_path);
        if !model_path.exists() {
            return Err(DetectionError::ModelNotFound(source.model_path.clone()));
        }

        info!("Loading {} model from {}", name, model_path.display());

        let (_, pool) =
            OnnxSessionPool::build(model_path, name, config.inference_backend, config.pool_size)
                .map_err(|e| DetectionError::ModelLoadFailed {
                    model: name.to_string(),
                    path: source.model_path.clone(),
                    reason: format!("{:#}", e),
                })?;

        let (input_name, embedded_names) = {
            let session = pool
                .acquire()
                .ok_or_else(|| DetectionError::PoolClosed(name.to_string()))?;

            let input_name = session
                .inputs
                .first()
                .map(|input| input.name.clone())
                .unwrap_or_else(|| "images".to_string());

            if let Some(input) = session.inputs.first() {
                debug!("{} model input {}: {:?}", name, input.name, input.input_type);
            }

            let embedded = session
                .metadata()
                .ok()
                .and_then(|meta| meta.custom("names").ok().flatten());

            (input_name, embedded)
        };

        let names = match &source.labels_path {
            Some(path) => ClassNames::from_file(Path::new(path))?,
            None => embedded_names
                .as_deref()
                .and_then(ClassNames::from_metadata)
                .unwrap_or_else(|| {
                    warn!("{} model has no class names; labels will be class indices", name);
                    ClassNames::default()
                }),
        };

        info!(
            "✓ {} model ready: {} classes, {} sessions",
            name,
            names.len(),
            pool.capacity()
        );

        Ok(Self {
            name: name.to_string(),
            pool,
            input_name,
            names,
            params: DecodeParams::from(config),
        })
    }
}

impl Detector for YoloDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&self, frame: &DynamicImage) -> DetectionResult<Vec<DetectionRecord>> {
        let start = Instant::now();
        let input = Value::from_array(to_nchw_tensor(frame, self.params.target_size))?;

        let (shape, data) = {
            let mut session = self
                .pool
                .acquire()
                .ok_or_else(|| DetectionError::PoolClosed(self.name.clone()))?;
            let outputs = session.run(ort::inputs![self.input_name.as_str() => input])?;
            let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
            (shape.to_vec(), data.to_vec())
        };

        debug!(
            "{} inference completed in {:.2}ms",
            self.name,
            start.elapsed().as_secs_f64() * 1000.0
        );

        let raw = decode_output(&shape, &data, (frame.width(), frame.height()), &self.params)?;
        Ok(normalize(&raw, &self.names))
    }
}

/// Decode a YOLO output tensor of shape `[1, 4 + classes, N]`.
///
/// Each of the N columns holds `cx, cy, w, h` in model input pixels
/// followed by one score per class. Candidates whose best score does not
/// exceed [`CONFIDENCE_THRESHOLD`] are dropped. The rest are mapped back
/// through the input letterbox onto the original frame, clipped to it and
/// passed through class-aware NMS.
pub fn decode_output(
    shape: &[i64],
    data: &[f32],
    frame_size: (u32, u32),
    params: &DecodeParams,
) -> DetectionResult<Vec<RawDetection>> {
    let (rows, candidates) = match shape {
        [1, rows, candidates] if *rows > 4 && *candidates >= 0 => (*rows as usize, *candidates as usize),
        _ => {
            return Err(DetectionError::UnexpectedOutput {
                shape: shape.to_vec(),
            })
        }
    };
    if data.len() != rows * candidates {
        return Err(DetectionError::UnexpectedOutput {
            shape: shape.to_vec(),
        });
    }

    let num_classes = rows - 4;
    let at = |row: usize, col: usize| data[row * candidates + col];

    let letterbox = Letterbox::fit(frame_size.0, frame_size.1, params.target_size);
    let (frame_w, frame_h) = (frame_size.0 as f32, frame_size.1 as f32);

    let mut detections = Vec::new();
    for i in 0..candidates {
        let (class_id, confidence) = (0..num_classes)
            .map(|c| (c, at(4 + c, i)))
            .fold((0, f32::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });

        if !(confidence > CONFIDENCE_THRESHOLD) {
            continue;
        }

        let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
        let [x1, y1, x2, y2] =
            letterbox.unmap([cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]);
        let bbox = [
            x1.clamp(0.0, frame_w),
            y1.clamp(0.0, frame_h),
            x2.clamp(0.0, frame_w),
            y2.clamp(0.0, frame_h),
        ];

        trace!(
            "Candidate {}: class={} conf={:.3} bbox=[{:.1}, {:.1}, {:.1}, {:.1}]",
            i, class_id, confidence, bbox[0], bbox[1], bbox[2], bbox[3]
        );

        detections.push(RawDetection {
            bbox,
            class_id,
            confidence,
        });
    }

    let candidates_above = detections.len();
    let mut kept = nms(detections, params.iou_threshold);
    kept.truncate(params.max_detections);

    debug!(
        "Decoded {} detections ({} above threshold {:.2})",
        kept.len(),
        candidates_above,
        CONFIDENCE_THRESHOLD
    );
    Ok(kept)
}

fn calculate_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let intersection = (x2 - x1) * (y2 - y1);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Class-aware non-maximum suppression. Output is in descending
/// confidence order.
fn nms(mut detections: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<RawDetection> = Vec::with_capacity(detections.len());
    for det in detections {
        let suppressed = keep.iter().any(|kept| {
            kept.class_id == det.class_id && calculate_iou(&kept.bbox, &det.bbox) > iou_threshold
        });
        if !suppressed {
            keep.push(det);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: DecodeParams = DecodeParams {
        target_size: 640,
        iou_threshold: 0.7,
        max_detections: 300,
    };

    /// Build a `[1, 4 + classes, N]` tensor from per-candidate columns
    fn tensor(columns: &[([f32; 4], Vec<f32>)]) -> (Vec<i64>, Vec<f32>) {
        let classes = columns.first().map(|(_, s)| s.len()).unwrap_or(1);
        let rows = 4 + classes;
        let n = columns.len();
        let mut data = vec![0.0; rows * n];
        for (i, (bbox, scores)) in columns.iter().enumerate() {
            for r in 0..4 {
                data[r * n + i] = bbox[r];
            }
            for (c, score) in scores.iter().enumerate() {
                data[(4 + c) * n + i] = *score;
            }
        }
        (vec![1, rows as i64, n as i64], data)
    }

    #[test]
    fn test_threshold_is_exclusive_at_quarter() {
        let (shape, data) = tensor(&[
            ([100.0, 100.0, 20.0, 20.0], vec![0.25, 0.0]),
            ([300.0, 300.0, 20.0, 20.0], vec![0.0, 0.2501]),
        ]);

        let dets = decode_output(&shape, &data, (640, 640), &PARAMS).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 1);
    }

    #[test]
    fn test_nothing_below_threshold_survives() {
        let (shape, data) = tensor(&[
            ([100.0, 100.0, 20.0, 20.0], vec![0.1, 0.2]),
            ([200.0, 200.0, 20.0, 20.0], vec![0.24, 0.01]),
        ]);

        assert!(decode_output(&shape, &data, (640, 640), &PARAMS)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_picks_best_class_and_rescales() {
        let (shape, data) = tensor(&[([320.0, 320.0, 64.0, 32.0], vec![0.3, 0.9, 0.5])]);

        // 320x1280 frame is halved to 160x640 and padded by 240 columns each side
        let dets = decode_output(&shape, &data, (320, 1280), &PARAMS).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 1);
        assert!((dets[0].confidence - 0.9).abs() < 1e-6);
        assert_eq!(dets[0].bbox, [96.0, 608.0, 224.0, 672.0]);
    }

    #[test]
    fn test_webcam_frame_maps_through_letterbox_padding() {
        // 640x480 frame goes in unscaled with 80 rows of padding above it
        let (shape, data) = tensor(&[([320.0, 320.0, 100.0, 100.0], vec![0.8])]);

        let dets = decode_output(&shape, &data, (640, 480), &PARAMS).unwrap();
        assert_eq!(dets[0].bbox, [270.0, 190.0, 370.0, 290.0]);
    }

    #[test]
    fn test_box_in_padding_clips_to_frame_edge() {
        let (shape, data) = tensor(&[([320.0, 40.0, 100.0, 100.0], vec![0.8])]);

        let dets = decode_output(&shape, &data, (640, 480), &PARAMS).unwrap();
        assert_eq!(dets[0].bbox, [270.0, 0.0, 370.0, 10.0]);
    }

    #[test]
    fn test_boxes_are_clipped_to_frame() {
        let (shape, data) = tensor(&[([10.0, 630.0, 40.0, 40.0], vec![0.8])]);

        let dets = decode_output(&shape, &data, (640, 640), &PARAMS).unwrap();
        assert_eq!(dets[0].bbox, [0.0, 610.0, 30.0, 640.0]);
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap_only() {
        let (shape, data) = tensor(&[
            ([100.0, 100.0, 50.0, 50.0], vec![0.6, 0.0]),
            ([101.0, 101.0, 50.0, 50.0], vec![0.9, 0.0]),
            ([100.0, 100.0, 50.0, 50.0], vec![0.0, 0.5]),
            ([400.0, 400.0, 50.0, 50.0], vec![0.7, 0.0]),
        ]);

        let dets = decode_output(&shape, &data, (640, 640), &PARAMS).unwrap();
        let summary: Vec<_> = dets.iter().map(|d| (d.class_id, d.confidence)).collect();
        assert_eq!(summary, vec![(0, 0.9), (0, 0.7), (1, 0.5)]);
    }

    #[test]
    fn test_max_detections_cap() {
        let columns: Vec<_> = (0..10)
            .map(|i| ([i as f32 * 60.0 + 30.0, 30.0, 20.0, 20.0], vec![0.5 + i as f32 * 0.01]))
            .collect();
        let (shape, data) = tensor(&columns);

        let params = DecodeParams {
            max_detections: 3,
            ..PARAMS
        };
        let dets = decode_output(&shape, &data, (640, 640), &params).unwrap();
        assert_eq!(dets.len(), 3);
        assert!(dets[0].confidence > dets[2].confidence);
    }

    #[test]
    fn test_empty_output() {
        let dets = decode_output(&[1, 6, 0], &[], (640, 480), &PARAMS).unwrap();
        assert!(dets.is_empty());
    }

    #[test]
    fn test_rejects_unexpected_shape() {
        assert!(matches!(
            decode_output(&[1, 4, 2], &[0.0; 8], (640, 640), &PARAMS),
            Err(DetectionError::UnexpectedOutput { .. })
        ));
        assert!(matches!(
            decode_output(&[1, 6, 2], &[0.0; 5], (640, 640), &PARAMS),
            Err(DetectionError::UnexpectedOutput { .. })
        ));
    }

    #[test]
    fn test_iou() {
        let a = [0.0, 0.0, 10.0, 10.0];
        assert!((calculate_iou(&a, &a) - 1.0).abs() < 1e-6);
        assert_eq!(calculate_iou(&a, &[20.0, 20.0, 30.0, 30.0]), 0.0);
        assert!((calculate_iou(&a, &[5.0, 0.0, 15.0, 10.0]) - 1.0 / 3.0).abs() < 1e-6);
    }
}
