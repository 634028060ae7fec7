//! Retreat extraction
//!
//! Mirror image of approach extraction: segments `retreating` frames and
//! measures how far and how fast the animal opened distance to the ROI.

use super::EventExtractor;
use crate::error::ComputeError;
use crate::segment::{segment, Block};
use crate::stats;
use crate::types::{FrameRecord, RetreatEvent};

/// Extractor for retreat bouts
pub struct RetreatExtractor;

impl EventExtractor for RetreatExtractor {
    type Event = RetreatEvent;

    fn extract(&self, frames: &[FrameRecord]) -> Result<Vec<RetreatEvent>, ComputeError> {
        Ok(segment(frames, FrameRecord::is_retreating)
            .enumerate()
            .map(|(i, block)| summarize(i as u32 + 1, &block))
            .collect())
    }
}

fn summarize(retreat_id: u32, block: &Block<'_, FrameRecord>) -> RetreatEvent {
    let first = block.first();
    let start_frame = first.frame;
    let end_frame = block.last().frame;

    let distance = block.column(|f| f.distance_to_roi);
    let delta = block.column(|f| f.delta_distance);
    let angle = block.column(|f| f.angle_to_roi);
    let head_area = block.column(|f| f.head_area);

    let start_distance = first.distance_to_roi;
    let max_distance = stats::max(&distance);

    RetreatEvent {
        retreat_id,
        roi_name: first.roi_name.clone(),
        start_frame,
        end_frame,
        duration_frames: end_frame - start_frame + 1,
        start_distance,
        min_distance: stats::min(&distance),
        max_distance,
        mean_distance: stats::mean(&distance),
        distance_variance: stats::sample_variance(&distance),
        distance_increase: max_distance - start_distance,
        mean_retreat_speed: stats::mean(&delta),
        peak_retreat_speed: stats::max(&delta),
        mean_angle_to_roi: stats::mean(&angle),
        angle_variance: stats::sample_variance(&angle),
        mean_head_area: stats::mean(&head_area),
        head_area_slope: stats::linear_slope(&head_area),
    }
}
