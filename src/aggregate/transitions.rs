//! Transition matrices
//!
//! Conditional outcome frequencies: P(outcome | context), pooled over
//! phases, and P(outcome | phase, context).

use super::OutcomeTally;
use crate::types::{Context, InteractionSequence, OutcomeType, Phase, Tagged};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextTransition {
    pub context: Context,
    pub outcome_type: OutcomeType,
    pub count: usize,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub phase: Phase,
    pub context: Context,
    pub outcome_type: OutcomeType,
    pub count: usize,
    pub probability: f64,
}

fn tally_by<K: Ord>(
    sequences: &[Tagged<InteractionSequence>],
    key: impl Fn(&Tagged<InteractionSequence>) -> K,
) -> BTreeMap<K, OutcomeTally> {
    let mut cells: BTreeMap<K, OutcomeTally> = BTreeMap::new();
    for row in sequences {
        cells.entry(key(row)).or_default().add(row.record.outcome_type);
    }
    cells
}

pub fn transitions_by_context(sequences: &[Tagged<InteractionSequence>]) -> Vec<ContextTransition> {
    tally_by(sequences, |r| r.meta.context)
        .into_iter()
        .flat_map(|(context, tally)| {
            OutcomeType::ALL.into_iter().map(move |outcome| ContextTransition {
                context,
                outcome_type: outcome,
                count: tally.count(outcome),
                probability: tally.proportion(outcome),
            })
        })
        .collect()
}

pub fn transitions_by_phase(sequences: &[Tagged<InteractionSequence>]) -> Vec<PhaseTransition> {
    tally_by(sequences, |r| (r.meta.phase, r.meta.context))
        .into_iter()
        .flat_map(|((phase, context), tally)| {
            OutcomeType::ALL.into_iter().map(move |outcome| PhaseTransition {
                phase,
                context,
                outcome_type: outcome,
                count: tally.count(outcome),
                probability: tally.proportion(outcome),
            })
        })
        .collect()
}
