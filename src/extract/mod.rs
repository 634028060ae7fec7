//! Event extraction
//!
//! Each extractor segments an animal's frame series on one predicate and
//! summarizes every block into an event row. Extraction assigns provisional
//! IDs; [`filter::filter_and_reassign`] drops short events and renumbers the
//! survivors densely before anything links them.
//!
//! Pipeline: frames → prepare → extract (approach, collision, retreat) → filter

mod approach;
mod collision;
pub mod filter;
mod retreat;

pub use approach::ApproachExtractor;
pub use collision::{frame_collision_points, normalize_collision_positions, CollisionExtractor};
pub use filter::filter_and_reassign;
pub use retreat::RetreatExtractor;

use crate::config::PipelineConfig;
use crate::error::ComputeError;
use crate::types::{ApproachEvent, CollisionEvent, Event, FrameRecord, RetreatEvent};

/// Trait for the per-kind event extractors
pub trait EventExtractor {
    type Event: Event;

    /// Extract events from frames already ordered by frame index
    fn extract(&self, frames: &[FrameRecord]) -> Result<Vec<Self::Event>, ComputeError>;
}

/// Filtered, densely numbered events of one animal
#[derive(Debug, Clone, Default)]
pub struct ExtractedEvents {
    pub approach: Vec<ApproachEvent>,
    pub collision: Vec<CollisionEvent>,
    pub retreat: Vec<RetreatEvent>,
}

/// Group frames by ROI, sort each stream by index and reject an index
/// repeated within one stream
pub fn prepare_frames(mut frames: Vec<FrameRecord>) -> Result<Vec<FrameRecord>, ComputeError> {
    frames.sort_by(|a, b| a.roi_name.cmp(&b.roi_name).then(a.frame.cmp(&b.frame)));

    if let Some(pair) = frames
        .windows(2)
        .find(|w| w[0].roi_name == w[1].roi_name && w[0].frame == w[1].frame)
    {
        return Err(ComputeError::MalformedInput(format!(
            "duplicate frame index {} in ROI {}",
            pair[0].frame, pair[0].roi_name
        )));
    }

    Ok(frames)
}

/// Split prepared frames into one slice per ROI
pub fn roi_streams(frames: &[FrameRecord]) -> Vec<&[FrameRecord]> {
    let mut streams = Vec::new();
    let mut start = 0;

    for end in 1..=frames.len() {
        if end == frames.len() || frames[end].roi_name != frames[start].roi_name {
            streams.push(&frames[start..end]);
            start = end;
        }
    }

    streams
}

/// Run all three extractors and the duration filter over one animal's frames.
///
/// Each ROI stream is segmented on its own, so no block spans two ROIs. IDs
/// are then assigned across the whole animal.
pub fn extract_events(
    frames: &[FrameRecord],
    config: &PipelineConfig,
) -> Result<ExtractedEvents, ComputeError> {
    let mut approach = Vec::new();
    let mut collision = Vec::new();
    let mut retreat = Vec::new();

    for stream in roi_streams(frames) {
        approach.extend(ApproachExtractor.extract(stream)?);
        collision.extend(CollisionExtractor.extract(stream)?);
        retreat.extend(RetreatExtractor.extract(stream)?);
    }

    log::debug!(
        "Extracted {} approaches, {} collisions, {} retreats before filtering",
        approach.len(),
        collision.len(),
        retreat.len()
    );

    Ok(ExtractedEvents {
        approach: filter_and_reassign(approach, config.min_event_frames),
        collision: filter_and_reassign(collision, config.min_event_frames),
        retreat: filter_and_reassign(retreat, config.min_event_frames),
    })
}
