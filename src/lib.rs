//! Frame-by-frame vehicle presence detection inside polygonal regions
//! of a video.
//!
//! The pipeline: a frame source yields ordered frames, a pretrained
//! detector yields per-frame detections with normalized bounding
//! boxes, and [`occupancy::detect_occupancy`] reduces each frame to a
//! single occupancy bit for a target polygon, restricted to a
//! whitelist of vehicle classes. The resulting binary sequence is
//! compressed into closed `[start, end]` frame intervals by
//! [`intervals::find_intervals`].
//!
//! Video decoding (`video-opencv`) and YOLO inference (`detector-ort`)
//! are feature-gated; the core compiles with `--no-default-features`.

pub mod geometry;
pub mod intervals;
pub mod occupancy;
pub mod regions;
pub mod types;

mod config;

#[cfg(feature = "detector-ort")]
pub mod vehicle_detection;
#[cfg(feature = "video-opencv")]
pub mod video_processor;

pub use geometry::{is_box_inside_polygon, Polygon};
pub use intervals::{find_intervals, to_binary_sequence, Interval};
pub use occupancy::detect_occupancy;
pub use types::{Config, Detection, Frame, DEFAULT_VEHICLE_CLASSES};
