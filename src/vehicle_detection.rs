// src/vehicle_detection.rs

use anyhow::{Context, Result};
use ndarray::ArrayView2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::{debug, info};

use crate::types::{Config, Detection, Frame};

const YOLO_INPUT_SIZE: usize = 640;
const YOLO_CLASSES: usize = 80;
const YOLO_ANCHORS: usize = 8400;

/// YOLOv8 detector over ONNX Runtime.
///
/// Emits every class the model knows; the vehicle whitelist is applied
/// downstream by the occupancy layer. Boxes are normalized xyxy in
/// `[0, 1]` of the source frame.
pub struct YoloDetector {
    session: Session,
    confidence_threshold: f32,
    nms_iou_threshold: f32,
}

impl YoloDetector {
    pub fn new(config: &Config) -> Result<Self> {
        info!("Loading YOLO model: {}", config.model.path);

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.inference.num_threads)?
            .commit_from_file(&config.model.path)
            .context("Failed to load model")?;

        info!("✓ YOLO detector initialized");

        Ok(Self {
            session,
            confidence_threshold: config.detection.confidence_threshold,
            nms_iou_threshold: config.detection.nms_iou_threshold,
        })
    }

    /// Run detection on every frame, in order.
    pub fn detect_all(&mut self, frames: &[Frame]) -> Result<Vec<Vec<Detection>>> {
        let mut results = Vec::with_capacity(frames.len());

        for (idx, frame) in frames.iter().enumerate() {
            let detections = self.detect(frame)?;
            debug!("frame {}: {} detection(s)", idx, detections.len());
            results.push(detections);

            if (idx + 1) % 100 == 0 {
                info!("Processed {}/{} frames", idx + 1, frames.len());
            }
        }

        Ok(results)
    }

    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let (input, scale, pad_x, pad_y) = preprocess(&frame.data, frame.width, frame.height);
        let output = self.infer(&input)?;
        self.postprocess(&output, scale, pad_x, pad_y, frame.width, frame.height)
    }

    fn infer(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let shape = [1, 3, YOLO_INPUT_SIZE, YOLO_INPUT_SIZE];
        let input_value =
            ort::value::Value::from_array((shape.as_slice(), input.to_vec().into_boxed_slice()))?;

        let outputs = self.session.run(ort::inputs!["images" => input_value])?;
        let output = &outputs[0];
        let (_, data) = output.try_extract_tensor::<f32>()?;

        Ok(data.to_vec())
    }

    fn postprocess(
        &self,
        output: &[f32],
        scale: f32,
        pad_x: f32,
        pad_y: f32,
        src_w: usize,
        src_h: usize,
    ) -> Result<Vec<Detection>> {
        // YOLOv8 output: [1, 84, 8400], one column per anchor:
        // [cx, cy, w, h, class0_conf, ..., class79_conf]
        let view = ArrayView2::from_shape((4 + YOLO_CLASSES, YOLO_ANCHORS), output)?;

        let mut detections = Vec::new();

        for i in 0..YOLO_ANCHORS {
            let cx = view[[0, i]];
            let cy = view[[1, i]];
            let w = view[[2, i]];
            let h = view[[3, i]];

            let mut max_conf = 0.0f32;
            let mut best_class = 0u32;

            for c in 0..YOLO_CLASSES {
                let conf = view[[4 + c, i]];
                if conf > max_conf {
                    max_conf = conf;
                    best_class = c as u32;
                }
            }

            if max_conf < self.confidence_threshold {
                continue;
            }

            // center format -> corner format, in letterbox coordinates
            let x1 = cx - w / 2.0;
            let y1 = cy - h / 2.0;
            let x2 = cx + w / 2.0;
            let y2 = cy + h / 2.0;

            // reverse the letterbox, then normalize to [0, 1]
            let x1 = (((x1 - pad_x) / scale) / src_w as f32).clamp(0.0, 1.0);
            let y1 = (((y1 - pad_y) / scale) / src_h as f32).clamp(0.0, 1.0);
            let x2 = (((x2 - pad_x) / scale) / src_w as f32).clamp(0.0, 1.0);
            let y2 = (((y2 - pad_y) / scale) / src_h as f32).clamp(0.0, 1.0);

            detections.push(Detection {
                class_id: best_class,
                bbox: [x1, y1, x2, y2],
                confidence: max_conf,
            });
        }

        Ok(nms(detections, self.nms_iou_threshold))
    }
}

/// Letterbox a frame to the model input: aspect-preserving resize onto
/// a gray 640x640 canvas, normalized to [0, 1], HWC -> CHW.
///
/// Returns the input tensor plus the scale and padding needed to map
/// detections back to source coordinates.
fn preprocess(src: &[u8], src_w: usize, src_h: usize) -> (Vec<f32>, f32, f32, f32) {
    let target = YOLO_INPUT_SIZE;

    let scale = (target as f32 / src_w as f32).min(target as f32 / src_h as f32);
    let scaled_w = (src_w as f32 * scale) as usize;
    let scaled_h = (src_h as f32 * scale) as usize;

    let pad_x = (target - scaled_w) as f32 / 2.0;
    let pad_y = (target - scaled_h) as f32 / 2.0;

    let resized = resize_bilinear(src, src_w, src_h, scaled_w, scaled_h);

    let mut canvas = vec![114u8; target * target * 3];
    for y in 0..scaled_h {
        for x in 0..scaled_w {
            let src_idx = (y * scaled_w + x) * 3;
            let dst_x = x + pad_x as usize;
            let dst_y = y + pad_y as usize;
            let dst_idx = (dst_y * target + dst_x) * 3;
            canvas[dst_idx..dst_idx + 3].copy_from_slice(&resized[src_idx..src_idx + 3]);
        }
    }

    let mut input = vec![0.0f32; 3 * target * target];
    for c in 0..3 {
        for h in 0..target {
            for w in 0..target {
                let hwc_idx = (h * target + w) * 3 + c;
                let chw_idx = c * target * target + h * target + w;
                input[chw_idx] = canvas[hwc_idx] as f32 / 255.0;
            }
        }
    }

    (input, scale, pad_x, pad_y)
}

fn resize_bilinear(src: &[u8], src_w: usize, src_h: usize, dst_w: usize, dst_h: usize) -> Vec<u8> {
    let mut dst = vec![0u8; dst_h * dst_w * 3];
    let x_ratio = src_w as f32 / dst_w as f32;
    let y_ratio = src_h as f32 / dst_h as f32;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx as f32 * x_ratio;
            let sy = dy as f32 * y_ratio;
            let sx0 = sx.floor() as usize;
            let sy0 = sy.floor() as usize;
            let sx1 = (sx0 + 1).min(src_w - 1);
            let sy1 = (sy0 + 1).min(src_h - 1);
            let fx = sx - sx0 as f32;
            let fy = sy - sy0 as f32;

            for c in 0..3 {
                let p00 = src[(sy0 * src_w + sx0) * 3 + c] as f32;
                let p10 = src[(sy0 * src_w + sx1) * 3 + c] as f32;
                let p01 = src[(sy1 * src_w + sx0) * 3 + c] as f32;
                let p11 = src[(sy1 * src_w + sx1) * 3 + c] as f32;

                let val = p00 * (1.0 - fx) * (1.0 - fy)
                    + p10 * fx * (1.0 - fy)
                    + p01 * (1.0 - fx) * fy
                    + p11 * fx * fy;

                dst[(dy * dst_w + dx) * 3 + c] = val.round() as u8;
            }
        }
    }
    dst
}

/// Class-agnostic non-maximum suppression.
fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    if detections.is_empty() {
        return detections;
    }

    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();

    while !detections.is_empty() {
        let current = detections.remove(0);

        detections.retain(|det| calculate_iou(&current.bbox, &det.bbox) < iou_threshold);
        keep.push(current);
    }

    keep
}

fn calculate_iou(box1: &[f32; 4], box2: &[f32; 4]) -> f32 {
    let x1 = box1[0].max(box2[0]);
    let y1 = box1[1].max(box2[1]);
    let x2 = box1[2].min(box2[2]);
    let y2 = box1[3].min(box2[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area1 = (box1[2] - box1[0]) * (box1[3] - box1[1]);
    let area2 = (box2[2] - box2[0]) * (box2[3] - box2[1]);
    let union = area1 + area2 - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_identical_boxes() {
        let bbox = [0.1, 0.1, 0.5, 0.5];
        assert!((calculate_iou(&bbox, &bbox) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        assert_eq!(
            calculate_iou(&[0.0, 0.0, 0.2, 0.2], &[0.5, 0.5, 0.9, 0.9]),
            0.0
        );
    }

    #[test]
    fn test_nms_suppresses_overlapping_detections() {
        let detections = vec![
            Detection {
                class_id: 2,
                bbox: [0.10, 0.10, 0.50, 0.50],
                confidence: 0.6,
            },
            Detection {
                class_id: 2,
                bbox: [0.11, 0.11, 0.51, 0.51],
                confidence: 0.9,
            },
            Detection {
                class_id: 7,
                bbox: [0.70, 0.70, 0.90, 0.90],
                confidence: 0.8,
            },
        ];

        let kept = nms(detections, 0.45);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
    }

    #[test]
    fn test_preprocess_shape_and_letterbox() {
        let src = vec![128u8; 1280 * 720 * 3];
        let (input, scale, pad_x, pad_y) = preprocess(&src, 1280, 720);

        assert_eq!(input.len(), 3 * YOLO_INPUT_SIZE * YOLO_INPUT_SIZE);
        assert!((scale - 0.5).abs() < 1e-6);
        assert_eq!(pad_x, 0.0);
        assert_eq!(pad_y, 140.0);
    }

    #[test]
    fn test_resize_bilinear_dimensions() {
        let src = vec![255u8; 100 * 100 * 3];
        let dst = resize_bilinear(&src, 100, 100, 50, 50);
        assert_eq!(dst.len(), 50 * 50 * 3);
        assert!(dst.iter().all(|&p| p == 255));
    }
}
