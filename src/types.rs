use serde::{Deserialize, Serialize};

/// COCO class ids treated as vehicles: car, bus, train, truck.
pub const DEFAULT_VEHICLE_CLASSES: [u32; 4] = [2, 5, 6, 7];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub inference: InferenceConfig,
    pub detection: DetectionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "models/yolov8l.onnx".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub num_threads: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self { num_threads: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub confidence_threshold: f32,
    pub nms_iou_threshold: f32,
    /// Class ids that count towards region occupancy.
    pub vehicle_classes: Vec<u32>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            nms_iou_threshold: 0.45,
            vehicle_classes: DEFAULT_VEHICLE_CLASSES.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// A decoded video frame, RGB interleaved.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub timestamp_ms: f64,
}

/// One detected object in a frame.
///
/// The bounding box is `[xmin, ymin, xmax, ymax]` normalized to
/// `[0, 1]` of the source frame.
#[derive(Debug, Clone)]
pub struct Detection {
    pub class_id: u32,
    pub bbox: [f32; 4],
    pub confidence: f32,
}
