//! Stage 2 aggregation
//!
//! Pure reductions over the cohort's concatenated event and sequence tables.
//! Every grouping goes through ordered maps, so the derived tables do not
//! depend on the order in which per-animal files were read.

mod archetypes;
mod counts;
mod duration;
mod geometry;
mod latency;
mod latent;
pub mod order;
mod outcomes;
mod transitions;

pub use archetypes::{
    sequence_archetypes, sequence_archetypes_by_animal, AnimalArchetypeRow, ArchetypeRow,
};
pub use counts::{bout_counts, BoutCounts};
pub use duration::{approach_durations, summarize_durations, DurationRow, DurationSummary};
pub use geometry::{angle_mad, approach_geometry, summarize_geometry, GeometryRow, GeometrySummary};
pub use latency::{latency_table, LatencyRow};
pub use latent::{latent_indices, summarize_latent, LatentRow, LatentSummary};
pub use outcomes::{bout_outcomes, BoutOutcomes};
pub use transitions::{
    transitions_by_context, transitions_by_phase, ContextTransition, PhaseTransition,
};

use crate::stats;
use crate::types::{
    AnimalMetadata, ApproachEvent, CollisionEvent, InteractionSequence, OutcomeType,
    RetreatEvent, Tagged,
};
use std::collections::BTreeMap;

/// Concatenated Stage 1 tables for a whole cohort
#[derive(Debug, Clone, Default)]
pub struct Cohort {
    pub approach: Vec<Tagged<ApproachEvent>>,
    pub collision: Vec<Tagged<CollisionEvent>>,
    pub retreat: Vec<Tagged<RetreatEvent>>,
    pub sequences: Vec<Tagged<InteractionSequence>>,
    /// Animals processed in Stage 1, including those that produced no rows
    pub roster: Vec<AnimalMetadata>,
}

impl Cohort {
    /// Every animal in the roster or in any table, keyed by name
    pub fn animals(&self) -> BTreeMap<&str, &AnimalMetadata> {
        let mut animals = BTreeMap::new();

        let seen = self
            .roster
            .iter()
            .chain(self.approach.iter().map(|r| &r.meta))
            .chain(self.collision.iter().map(|r| &r.meta))
            .chain(self.retreat.iter().map(|r| &r.meta))
            .chain(self.sequences.iter().map(|r| &r.meta));

        for meta in seen {
            animals.entry(meta.animal_name.as_str()).or_insert(meta);
        }
        animals
    }
}

/// Counts of each outcome within one conditioning cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeTally {
    counts: [usize; 3],
}

impl OutcomeTally {
    fn slot(outcome: OutcomeType) -> usize {
        match outcome {
            OutcomeType::Collision => 0,
            OutcomeType::AbortiveRetreat => 1,
            OutcomeType::ApproachOnly => 2,
        }
    }

    pub fn add(&mut self, outcome: OutcomeType) {
        self.counts[Self::slot(outcome)] += 1;
    }

    pub fn count(&self, outcome: OutcomeType) -> usize {
        self.counts[Self::slot(outcome)]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Share of `outcome` in this cell; NaN for an empty cell
    pub fn proportion(&self, outcome: OutcomeType) -> f64 {
        stats::ratio(self.count(outcome), self.total())
    }
}

/// Group rows by animal name
pub(crate) fn by_animal<'a, R>(
    rows: &'a [R],
    meta: impl Fn(&'a R) -> &'a AnimalMetadata,
) -> BTreeMap<&'a str, Vec<&'a R>> {
    let mut groups: BTreeMap<&str, Vec<&R>> = BTreeMap::new();
    for row in rows {
        groups
            .entry(meta(row).animal_name.as_str())
            .or_default()
            .push(row);
    }
    groups
}

/// NaN-skipping mean of one column; NaN when there are no rows
pub(crate) fn column_mean<R>(rows: &[&R], column: impl Fn(&R) -> f64) -> f64 {
    let values: Vec<f64> = rows.iter().map(|r| column(*r)).collect();
    stats::mean(&values)
}

/// Every Stage 2 table, built from one cohort
#[derive(Debug, Clone)]
pub struct DerivedTables {
    pub bout_counts: Vec<BoutCounts>,
    pub bout_outcomes: Vec<BoutOutcomes>,
    pub latency: Vec<LatencyRow>,
    pub duration: Vec<DurationRow>,
    pub duration_summary: Vec<DurationSummary>,
    pub geometry: Vec<GeometryRow>,
    pub geometry_summary: Vec<GeometrySummary>,
    pub latent: Vec<LatentRow>,
    pub latent_summary: Vec<LatentSummary>,
    pub archetypes: Vec<ArchetypeRow>,
    pub archetypes_by_animal: Vec<AnimalArchetypeRow>,
    pub transitions_by_context: Vec<ContextTransition>,
    pub transitions_by_phase: Vec<PhaseTransition>,
}

impl DerivedTables {
    /// Run every aggregator over the cohort
    ///
    /// # Arguments
    /// * `cohort` - Concatenated Stage 1 tables
    /// * `fps` - Frames per second used for second-valued columns
    pub fn build(cohort: &Cohort, fps: f64) -> Self {
        let duration = approach_durations(&cohort.approach, fps);
        let geometry = approach_geometry(&cohort.approach, &cohort.sequences);
        let latent = latent_indices(&geometry, &duration);

        Self {
            bout_counts: bout_counts(cohort),
            bout_outcomes: bout_outcomes(cohort),
            latency: latency_table(&cohort.sequences, fps),
            duration_summary: summarize_durations(cohort, &duration),
            geometry_summary: summarize_geometry(cohort, &geometry),
            latent_summary: summarize_latent(cohort, &latent),
            archetypes: sequence_archetypes(&cohort.sequences),
            archetypes_by_animal: sequence_archetypes_by_animal(&cohort.sequences),
            transitions_by_context: transitions_by_context(&cohort.sequences),
            transitions_by_phase: transitions_by_phase(&cohort.sequences),
            duration,
            geometry,
            latent,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{cohort, meta};
    use super::*;

    #[test]
    fn test_animals_is_union_of_tables() {
        let mut cohort = cohort();
        cohort.roster.push(meta("m4", "tta"));

        let names: Vec<&str> = cohort.animals().keys().copied().collect();
        assert_eq!(names, vec!["m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn test_outcome_tally() {
        let mut tally = OutcomeTally::default();
        assert!(tally.proportion(OutcomeType::Collision).is_nan());

        tally.add(OutcomeType::Collision);
        tally.add(OutcomeType::ApproachOnly);
        tally.add(OutcomeType::ApproachOnly);
        tally.add(OutcomeType::ApproachOnly);

        assert_eq!(tally.total(), 4);
        assert_eq!(tally.count(OutcomeType::AbortiveRetreat), 0);
        assert_eq!(tally.proportion(OutcomeType::ApproachOnly), 0.75);
    }

    #[test]
    fn test_derived_tables_build_over_empty_cohort() {
        let tables = DerivedTables::build(&Cohort::default(), 30.0);
        assert!(tables.bout_counts.is_empty());
        assert!(tables.latent.is_empty());
        assert!(tables.archetypes.is_empty());
        assert!(tables.transitions_by_phase.is_empty());
    }

    #[test]
    fn test_derived_tables_row_counts() {
        let tables = DerivedTables::build(&cohort(), 30.0);
        assert_eq!(tables.bout_counts.len(), 3);
        assert_eq!(tables.bout_outcomes.len(), 3);
        assert_eq!(tables.duration.len(), 5);
        assert_eq!(tables.geometry.len(), 5);
        assert_eq!(tables.latent.len(), 5);
        // m1: collision + abortive; m2: two collisions
        assert_eq!(tables.latency.len(), 4);
    }
}
