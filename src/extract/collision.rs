//! Collision extraction
//!
//! Segments frames flagged as collisions and summarizes contact geometry,
//! including the spread of the reported contact points.

use super::EventExtractor;
use crate::error::ComputeError;
use crate::segment::{segment, Block};
use crate::stats;
use crate::types::{CollisionEvent, FrameRecord};
use serde_json::Value;

/// Extractor for collision bouts
pub struct CollisionExtractor;

impl EventExtractor for CollisionExtractor {
    type Event = CollisionEvent;

    fn extract(&self, frames: &[FrameRecord]) -> Result<Vec<CollisionEvent>, ComputeError> {
        segment(frames, FrameRecord::is_colliding)
            .enumerate()
            .map(|(i, block)| summarize(i as u32 + 1, &block))
            .collect()
    }
}

fn summarize(
    collision_id: u32,
    block: &Block<'_, FrameRecord>,
) -> Result<CollisionEvent, ComputeError> {
    let first = block.first();
    let start_frame = first.frame;
    let end_frame = block.last().frame;

    let distance = block.column(|f| f.distance_to_roi);
    let angle = block.column(|f| f.angle_to_roi);
    let head_area = block.column(|f| f.head_area);

    let mut points = Vec::new();
    for record in block.records {
        points.extend(frame_collision_points(record)?);
    }

    Ok(CollisionEvent {
        collision_id,
        roi_name: first.roi_name.clone(),
        start_frame,
        end_frame,
        duration_frames: end_frame - start_frame + 1,
        mean_distance: stats::mean(&distance),
        distance_variance: stats::sample_variance(&distance),
        mean_angle_to_roi: stats::mean(&angle),
        angle_variance: stats::sample_variance(&angle),
        mean_head_area: stats::mean(&head_area),
        head_area_variance: stats::sample_variance(&head_area),
        collision_position_variance: position_variance(&points),
    })
}

/// Sum of per-axis sample variance; NaN with fewer than two points
fn position_variance(points: &[(f64, f64)]) -> f64 {
    if points.len() < 2 {
        return f64::NAN;
    }
    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    stats::sample_variance(&xs) + stats::sample_variance(&ys)
}

/// Normalize one frame's raw collision payload into a list of points.
///
/// Accepted shapes: absent/`null` (no points), `[]` (no points), a single
/// pair `[x, y]`, or a list of pairs `[[x, y], ...]`. Coordinates may be
/// `null` (lost keypoint) and read as NaN. Anything else is rejected, since
/// coercing it would corrupt the position variance.
pub fn normalize_collision_positions(
    payload: Option<&Value>,
) -> Result<Vec<(f64, f64)>, ComputeError> {
    let items = match payload {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(ComputeError::MalformedInput(format!(
                "unexpected collision position payload: {}",
                other
            )))
        }
    };

    if items.is_empty() {
        return Ok(Vec::new());
    }

    if items.len() == 2 && items.iter().all(is_coordinate) {
        return Ok(vec![(coordinate(&items[0]), coordinate(&items[1]))]);
    }

    items
        .iter()
        .map(|item| match item {
            Value::Array(pair) if pair.len() == 2 && pair.iter().all(is_coordinate) => {
                Ok((coordinate(&pair[0]), coordinate(&pair[1])))
            }
            _ => Err(ComputeError::MalformedInput(format!(
                "unexpected collision position shape: {}",
                Value::Array(items.clone())
            ))),
        })
        .collect()
}

/// Collision points of one frame; errors name the frame
pub fn frame_collision_points(record: &FrameRecord) -> Result<Vec<(f64, f64)>, ComputeError> {
    normalize_collision_positions(record.collision_pos.as_ref()).map_err(|e| match e {
        ComputeError::MalformedInput(msg) => {
            ComputeError::MalformedInput(format!("frame {}: {}", record.frame, msg))
        }
        other => other,
    })
}

fn is_coordinate(value: &Value) -> bool {
    value.is_number() || value.is_null()
}

fn coordinate(value: &Value) -> f64 {
    value.as_f64().unwrap_or(f64::NAN)
}
