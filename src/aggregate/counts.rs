//! Per-animal bout counts

use super::{order, Cohort};
use crate::types::{AnimalMetadata, Tagged};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw number of events of each kind for one animal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoutCounts {
    #[serde(flatten)]
    pub meta: AnimalMetadata,
    pub n_approach_bouts: usize,
    pub n_collision_bouts: usize,
    pub n_retreat_bouts: usize,
}

fn count_by_animal<T>(rows: &[Tagged<T>]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for row in rows {
        *counts.entry(row.meta.animal_name.as_str()).or_insert(0) += 1;
    }
    counts
}

fn lookup(counts: &BTreeMap<&str, usize>, name: &str) -> usize {
    counts.get(name).copied().unwrap_or(0)
}

/// One row per animal, zero counts for kinds the animal never showed
pub fn bout_counts(cohort: &Cohort) -> Vec<BoutCounts> {
    let approach = count_by_animal(&cohort.approach);
    let collision = count_by_animal(&cohort.collision);
    let retreat = count_by_animal(&cohort.retreat);

    let mut rows: Vec<BoutCounts> = cohort
        .animals()
        .into_iter()
        .map(|(name, meta)| BoutCounts {
            meta: meta.clone(),
            n_approach_bouts: lookup(&approach, name),
            n_collision_bouts: lookup(&collision, name),
            n_retreat_bouts: lookup(&retreat, name),
        })
        .collect();

    order::organize(&mut rows, |r| &r.meta);
    rows
}
