//! Outcome latency in seconds

use super::order;
use crate::types::{AnimalMetadata, InteractionSequence, OutcomeType, Tagged};
use serde::{Deserialize, Serialize};

/// Time from approach onset to the event that decided the outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyRow {
    #[serde(flatten)]
    pub meta: AnimalMetadata,
    pub outcome: OutcomeType,
    pub latency_sec: f64,
}

/// Long-format latency table.
///
/// Collision outcomes use the approach-to-collision latency, abortive
/// retreats the approach-to-retreat latency. Approach-only sequences have
/// no latency and are left out.
pub fn latency_table(sequences: &[Tagged<InteractionSequence>], fps: f64) -> Vec<LatencyRow> {
    let mut rows: Vec<LatencyRow> = sequences
        .iter()
        .filter_map(|row| {
            let s = &row.record;
            let frames = match s.outcome_type {
                OutcomeType::Collision => s.approach_to_collision_latency,
                OutcomeType::AbortiveRetreat => s.approach_to_retreat_latency,
                OutcomeType::ApproachOnly => None,
            }?;

            Some(LatencyRow {
                meta: row.meta.clone(),
                outcome: s.outcome_type,
                latency_sec: frames as f64 / fps,
            })
        })
        .collect();

    order::organize(&mut rows, |r| &r.meta);
    rows
}
