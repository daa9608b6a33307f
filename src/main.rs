// src/main.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use vehicle_occupancy::occupancy::detect_occupancy;
use vehicle_occupancy::regions::{load_regions, write_result};
use vehicle_occupancy::types::Config;
use vehicle_occupancy::vehicle_detection::YoloDetector;
use vehicle_occupancy::video_processor::read_all_frames;

/// Detect vehicle presence inside polygonal video regions and report
/// the occupied frame intervals per region.
#[derive(Parser, Debug)]
#[command(name = "vehicle-occupancy", version)]
struct Args {
    /// Input video file
    #[arg(long)]
    video_path: PathBuf,

    /// Region JSON file: region name -> polygon vertices
    #[arg(long)]
    polygon_path: PathBuf,

    /// Output JSON file: region name -> [start, end] intervals
    #[arg(long, default_value = "result.json")]
    output_path: PathBuf,

    /// Optional YAML config (model path, thresholds, class whitelist)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "vehicle_occupancy={},ort=warn",
            config.logging.level
        ))
        .init();

    info!("🚗 Vehicle occupancy detection starting");

    let regions = load_regions(&args.polygon_path)?;
    info!("✓ Loaded {} region(s)", regions.len());

    let frames = read_all_frames(&args.video_path)?;

    let detections = if frames.is_empty() {
        Vec::new()
    } else {
        let mut detector = YoloDetector::new(&config)?;
        detector.detect_all(&frames)?
    };

    let mut result = BTreeMap::new();
    for (name, polygon) in &regions {
        let (occupancy, intervals) = detect_occupancy(
            &frames,
            &detections,
            polygon,
            &config.detection.vehicle_classes,
        );

        let occupied = occupancy.iter().filter(|&&bit| bit == 1).count();
        info!(
            "Region '{}': {} occupied frame(s) across {} interval(s)",
            name,
            occupied,
            intervals.len()
        );

        result.insert(name.clone(), intervals);
    }

    write_result(&args.output_path, &result)?;
    info!("✓ Result written to {}", args.output_path.display());

    Ok(())
}
