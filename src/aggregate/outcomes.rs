//! Per-animal outcome counts and rates

use super::{bout_counts, BoutCounts, Cohort, OutcomeTally};
use crate::stats;
use crate::types::OutcomeType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bout counts plus outcome counts and rates for one animal.
///
/// Rates are relative to the number of approaches and are NaN when the
/// animal has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoutOutcomes {
    #[serde(flatten)]
    pub counts: BoutCounts,
    pub n_collision_outcomes: usize,
    pub n_abortive_retreats: usize,
    pub n_approach_only: usize,
    #[serde(with = "crate::types::nan_as_null")]
    pub success_rate: f64,
    #[serde(with = "crate::types::nan_as_null")]
    pub abortive_rate: f64,
    /// Abortive retreats and approach-only bouts together
    #[serde(with = "crate::types::nan_as_null")]
    pub failure_rate: f64,
}

pub fn bout_outcomes(cohort: &Cohort) -> Vec<BoutOutcomes> {
    let mut tallies: BTreeMap<&str, OutcomeTally> = BTreeMap::new();
    for row in &cohort.sequences {
        tallies
            .entry(row.meta.animal_name.as_str())
            .or_default()
            .add(row.record.outcome_type);
    }

    bout_counts(cohort)
        .into_iter()
        .map(|counts| {
            let tally = tallies
                .get(counts.meta.animal_name.as_str())
                .copied()
                .unwrap_or_default();
            let n_approach = counts.n_approach_bouts;

            let n_collision = tally.count(OutcomeType::Collision);
            let n_abortive = tally.count(OutcomeType::AbortiveRetreat);
            let n_only = tally.count(OutcomeType::ApproachOnly);

            BoutOutcomes {
                counts,
                n_collision_outcomes: n_collision,
                n_abortive_retreats: n_abortive,
                n_approach_only: n_only,
                success_rate: stats::ratio(n_collision, n_approach),
                abortive_rate: stats::ratio(n_abortive, n_approach),
                failure_rate: stats::ratio(n_abortive + n_only, n_approach),
            }
        })
        .collect()
}
