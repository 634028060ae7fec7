//! Sequence archetypes
//!
//! Outcome proportions per cohort cell (group, phase, context) and per animal.
//! Every cell with at least one sequence lists all three outcomes, so its
//! proportions sum to one.

use super::{order, OutcomeTally};
use crate::types::{AnimalMetadata, Context, InteractionSequence, OutcomeType, Phase, Tagged};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeRow {
    pub group: String,
    pub phase: Phase,
    pub context: Context,
    pub outcome_type: OutcomeType,
    pub count: usize,
    pub total: usize,
    pub proportion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalArchetypeRow {
    #[serde(flatten)]
    pub meta: AnimalMetadata,
    pub outcome_type: OutcomeType,
    pub count: usize,
    pub total: usize,
    pub proportion: f64,
}

pub fn sequence_archetypes(sequences: &[Tagged<InteractionSequence>]) -> Vec<ArchetypeRow> {
    let mut cells: BTreeMap<(&str, Phase, Context), OutcomeTally> = BTreeMap::new();
    for row in sequences {
        let key = (row.meta.group.as_str(), row.meta.phase, row.meta.context);
        cells.entry(key).or_default().add(row.record.outcome_type);
    }

    let mut cells: Vec<_> = cells.into_iter().collect();
    cells.sort_by(|a, b| order::compare_groups(a.0 .0, b.0 .0));

    cells
        .into_iter()
        .flat_map(|((group, phase, context), tally)| {
            OutcomeType::ALL.into_iter().map(move |outcome| ArchetypeRow {
                group: group.to_string(),
                phase,
                context,
                outcome_type: outcome,
                count: tally.count(outcome),
                total: tally.total(),
                proportion: tally.proportion(outcome),
            })
        })
        .collect()
}

/// Per-animal outcome proportions, for replicate-level statistics
pub fn sequence_archetypes_by_animal(
    sequences: &[Tagged<InteractionSequence>],
) -> Vec<AnimalArchetypeRow> {
    let mut animals: BTreeMap<&str, (&AnimalMetadata, OutcomeTally)> = BTreeMap::new();
    for row in sequences {
        animals
            .entry(row.meta.animal_name.as_str())
            .or_insert_with(|| (&row.meta, OutcomeTally::default()))
            .1
            .add(row.record.outcome_type);
    }

    let mut rows: Vec<AnimalArchetypeRow> = animals
        .into_values()
        .flat_map(|(meta, tally)| {
            OutcomeType::ALL.into_iter().map(move |outcome| AnimalArchetypeRow {
                meta: meta.clone(),
                outcome_type: outcome,
                count: tally.count(outcome),
                total: tally.total(),
                proportion: tally.proportion(outcome),
            })
        })
        .collect();

    order::organize(&mut rows, |r| &r.meta);
    rows
}
