//! Approach extraction
//!
//! Segments frames whose interaction state is `approaching` and summarizes
//! distance kinematics, heading and head-area trend per bout.

use super::EventExtractor;
use crate::error::ComputeError;
use crate::segment::{segment, Block};
use crate::stats;
use crate::types::{ApproachEvent, FrameRecord};

/// Extractor for approach bouts
pub struct ApproachExtractor;

impl EventExtractor for ApproachExtractor {
    type Event = ApproachEvent;

    fn extract(&self, frames: &[FrameRecord]) -> Result<Vec<ApproachEvent>, ComputeError> {
        Ok(segment(frames, FrameRecord::is_approaching)
            .enumerate()
            .map(|(i, block)| summarize(i as u32 + 1, &block))
            .collect())
    }
}

fn summarize(approach_id: u32, block: &Block<'_, FrameRecord>) -> ApproachEvent {
    let first = block.first();
    let start_frame = first.frame;
    let end_frame = block.last().frame;

    let distance = block.column(|f| f.distance_to_roi);
    let delta = block.column(|f| f.delta_distance);
    let angle = block.column(|f| f.angle_to_roi);
    let head_area = block.column(|f| f.head_area);

    let start_distance = first.distance_to_roi;
    let min_distance = stats::min(&distance);

    ApproachEvent {
        approach_id,
        roi_name: first.roi_name.clone(),
        start_frame,
        end_frame,
        duration_frames: end_frame - start_frame + 1,
        start_distance,
        min_distance,
        max_distance: stats::max(&distance),
        mean_distance: stats::mean(&distance),
        distance_variance: stats::sample_variance(&distance),
        distance_reduction: start_distance - min_distance,
        mean_delta_distance: stats::mean(&delta),
        // Most negative delta is the fastest closing speed
        peak_approach_speed: stats::min(&delta),
        mean_angle_to_roi: stats::mean(&angle),
        angle_variance: stats::sample_variance(&angle),
        mean_head_area: stats::mean(&head_area),
        head_area_slope: stats::linear_slope(&head_area),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::test_support::{frame, frames_with_states};
    use crate::types::InteractionState::{Approaching, Other};

    fn approach_block() -> Vec<FrameRecord> {
        let distances = [10.0, 8.0, 5.0, 6.0];
        let deltas = [-1.0, -2.0, -3.0, 1.0];
        let angles = [10.0, 20.0, 30.0, 40.0];
        let areas = [100.0, 110.0, 120.0, 130.0];

        let mut frames = vec![frame(99, Other, false)];
        for i in 0..4 {
            let mut f = frame(100 + i as u64, Approaching, false);
            f.distance_to_roi = distances[i];
            f.delta_distance = deltas[i];
            f.angle_to_roi = angles[i];
            f.head_area = areas[i];
            frames.push(f);
        }
        frames.push(frame(104, Other, false));
        frames
    }

    #[test]
    fn test_approach_metrics() {
        let events = ApproachExtractor.extract(&approach_block()).unwrap();
        assert_eq!(events.len(), 1);

        let e = &events[0];
        assert_eq!(e.approach_id, 1);
        assert_eq!(e.start_frame, 100);
        assert_eq!(e.end_frame, 103);
        assert_eq!(e.duration_frames, 4);
        assert_eq!(e.start_distance, 10.0);
        assert_eq!(e.min_distance, 5.0);
        assert_eq!(e.max_distance, 10.0);
        assert_eq!(e.distance_reduction, 5.0);
        assert!((e.mean_delta_distance + 1.25).abs() < 1e-12);
        assert_eq!(e.peak_approach_speed, -3.0);
        assert!((e.mean_angle_to_roi - 25.0).abs() < 1e-12);
        // Sample variance of 10, 20, 30, 40
        assert!((e.angle_variance - 500.0 / 3.0).abs() < 1e-9);
        assert!((e.mean_head_area - 115.0).abs() < 1e-12);
        assert!((e.head_area_slope - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_frame_bout_has_undefined_spread() {
        let frames = frames_with_states(&[Other, Approaching, Other]);
        let events = ApproachExtractor.extract(&frames).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].duration_frames, 1);
        assert!(events[0].angle_variance.is_nan());
        assert!(events[0].head_area_slope.is_nan());
        assert_eq!(events[0].distance_reduction, 0.0);
    }

    #[test]
    fn test_no_approaching_frames() {
        let frames = frames_with_states(&[Other, Other]);
        assert!(ApproachExtractor.extract(&frames).unwrap().is_empty());
    }

    #[test]
    fn test_provisional_ids_follow_start_order() {
        let frames =
            frames_with_states(&[Approaching, Other, Approaching, Approaching, Other, Approaching]);
        let events = ApproachExtractor.extract(&frames).unwrap();
        let ids: Vec<(u32, u64)> = events.iter().map(|e| (e.approach_id, e.start_frame)).collect();
        assert_eq!(ids, vec![(1, 0), (2, 2), (3, 5)]);
    }
}
