// src/occupancy.rs

use tracing::debug;

use crate::geometry::{is_box_inside_polygon, Polygon};
use crate::intervals::{find_intervals, Interval};
use crate::types::{Detection, Frame};

/// Decide per-frame vehicle occupancy of a polygon and compress the
/// binary result into intervals.
///
/// `frames` is consulted only for pixel dimensions, taken from the
/// first frame (all frames in a run share them). `detections_per_frame`
/// is the parallel per-frame detector output with normalized boxes. A
/// frame is occupied when any whitelisted detection has a box corner
/// inside the polygon; one hit is sufficient and the remaining
/// detections of that frame are skipped.
///
/// Each frame's bit depends only on that frame's detections and is
/// written into its own pre-indexed slot, so the map stage stays
/// order-safe under any evaluation strategy. The interval scan runs
/// once over the completed sequence.
pub fn detect_occupancy(
    frames: &[Frame],
    detections_per_frame: &[Vec<Detection>],
    polygon: &Polygon,
    vehicle_classes: &[u32],
) -> (Vec<u8>, Vec<Interval>) {
    if frames.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let width = frames[0].width;
    let height = frames[0].height;

    let mut occupancy = vec![0u8; frames.len()];

    for (t, detections) in detections_per_frame
        .iter()
        .enumerate()
        .take(frames.len())
    {
        let occupied = detections
            .iter()
            .filter(|det| vehicle_classes.contains(&det.class_id))
            .any(|det| is_box_inside_polygon(polygon, denormalize(det.bbox, width, height)));

        occupancy[t] = occupied as u8;
    }

    let intervals = find_intervals(&occupancy);
    debug!(
        "occupancy: {}/{} frames occupied, {} interval(s)",
        occupancy.iter().filter(|&&bit| bit == 1).count(),
        occupancy.len(),
        intervals.len()
    );

    (occupancy, intervals)
}

/// Scale a normalized box to pixel coordinates, truncating to integers.
fn denormalize(bbox: [f32; 4], width: usize, height: usize) -> [i32; 4] {
    [
        (bbox[0] * width as f32) as i32,
        (bbox[1] * height as f32) as i32,
        (bbox[2] * width as f32) as i32,
        (bbox[3] * height as f32) as i32,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: usize, height: usize) -> Frame {
        Frame {
            data: Vec::new(),
            width,
            height,
            timestamp_ms: 0.0,
        }
    }

    fn detection(class_id: u32, bbox: [f32; 4]) -> Detection {
        Detection {
            class_id,
            bbox,
            confidence: 0.9,
        }
    }

    fn square() -> Polygon {
        Polygon::new(vec![(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)]).unwrap()
    }

    const VEHICLES: [u32; 4] = [2, 5, 6, 7];

    #[test]
    fn test_empty_frame_sequence_yields_empty_outputs() {
        let (occupancy, intervals) = detect_occupancy(&[], &[], &square(), &VEHICLES);
        assert!(occupancy.is_empty());
        assert!(intervals.is_empty());
    }

    #[test]
    fn test_qualifying_corner_hit_marks_frame_occupied() {
        // top-left corner denormalizes to (5, 5), inside the square
        let frames = [frame(100, 100)];
        let detections = [vec![detection(2, [0.05, 0.05, 0.5, 0.5])]];

        let (occupancy, intervals) = detect_occupancy(&frames, &detections, &square(), &VEHICLES);
        assert_eq!(occupancy, vec![1]);
        assert_eq!(intervals, vec![Interval { start: 0, end: 0 }]);
    }

    #[test]
    fn test_non_whitelisted_class_never_contributes() {
        // box fully inside the polygon, but class 0 is not a vehicle
        let frames = [frame(100, 100)];
        let detections = [vec![detection(0, [0.01, 0.01, 0.08, 0.08])]];

        let (occupancy, intervals) = detect_occupancy(&frames, &detections, &square(), &VEHICLES);
        assert_eq!(occupancy, vec![0]);
        assert!(intervals.is_empty());
    }

    #[test]
    fn test_frame_without_detections_is_unoccupied() {
        let frames = [frame(100, 100)];
        let detections = [Vec::new()];

        let (occupancy, _) = detect_occupancy(&frames, &detections, &square(), &VEHICLES);
        assert_eq!(occupancy, vec![0]);
    }

    #[test]
    fn test_vehicle_outside_polygon_is_unoccupied() {
        let frames = [frame(100, 100)];
        let detections = [vec![detection(7, [0.5, 0.5, 0.9, 0.9])]];

        let (occupancy, _) = detect_occupancy(&frames, &detections, &square(), &VEHICLES);
        assert_eq!(occupancy, vec![0]);
    }

    #[test]
    fn test_multi_frame_runs_merge_into_intervals() {
        let frames: Vec<Frame> = (0..5).map(|_| frame(100, 100)).collect();
        let inside = vec![detection(2, [0.02, 0.02, 0.3, 0.3])];
        let outside = vec![detection(2, [0.5, 0.5, 0.9, 0.9])];
        let detections = [
            outside.clone(),
            inside.clone(),
            inside.clone(),
            outside,
            inside,
        ];

        let (occupancy, intervals) = detect_occupancy(&frames, &detections, &square(), &VEHICLES);
        assert_eq!(occupancy, vec![0, 1, 1, 0, 1]);
        assert_eq!(
            intervals,
            vec![
                Interval { start: 1, end: 2 },
                Interval { start: 4, end: 4 }
            ]
        );
    }

    #[test]
    fn test_mixed_classes_in_one_frame() {
        // a person inside plus a truck inside: only the truck counts,
        // and one qualifying hit is enough
        let frames = [frame(100, 100)];
        let detections = [vec![
            detection(0, [0.02, 0.02, 0.05, 0.05]),
            detection(7, [0.03, 0.03, 0.4, 0.4]),
            detection(2, [0.5, 0.5, 0.9, 0.9]),
        ]];

        let (occupancy, _) = detect_occupancy(&frames, &detections, &square(), &VEHICLES);
        assert_eq!(occupancy, vec![1]);
    }
}
