//! Approach geometry
//!
//! Distance reduction and angular spread per approach, labelled with the
//! approach's sequence outcome.

use super::{by_animal, column_mean, order, Cohort};
use crate::types::{AnimalMetadata, ApproachEvent, InteractionSequence, OutcomeType, Tagged};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryRow {
    #[serde(flatten)]
    pub meta: AnimalMetadata,
    pub approach_id: u32,
    #[serde(with = "crate::types::nan_as_null")]
    pub distance_reduction: f64,
    #[serde(with = "crate::types::nan_as_null")]
    pub mean_angle_to_roi: f64,
    #[serde(with = "crate::types::nan_as_null")]
    pub angle_variance: f64,
    #[serde(with = "crate::types::nan_as_null")]
    pub angle_mad: f64,
    /// None when no sequence row references this approach
    pub outcome_type: Option<OutcomeType>,
}

/// Per-animal means of the geometry columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometrySummary {
    #[serde(flatten)]
    pub meta: AnimalMetadata,
    #[serde(with = "crate::types::nan_as_null")]
    pub distance_reduction: f64,
    #[serde(with = "crate::types::nan_as_null")]
    pub mean_angle_to_roi: f64,
    #[serde(with = "crate::types::nan_as_null")]
    pub angle_variance: f64,
    #[serde(with = "crate::types::nan_as_null")]
    pub angle_mad: f64,
}

/// Mean absolute deviation approximated from a variance.
///
/// Uses the MAD/SD ratio of a normal distribution, `sqrt(2/π)`. Only the
/// per-bout variance is stored, so this is an approximation that holds for
/// roughly normal angle samples, not an exact MAD.
pub fn angle_mad(angle_variance: f64) -> f64 {
    angle_variance.sqrt() * (2.0 / PI).sqrt()
}

pub fn approach_geometry(
    approach: &[Tagged<ApproachEvent>],
    sequences: &[Tagged<InteractionSequence>],
) -> Vec<GeometryRow> {
    let outcomes: BTreeMap<(&str, u32), OutcomeType> = sequences
        .iter()
        .map(|s| {
            (
                (s.meta.animal_name.as_str(), s.record.approach_id),
                s.record.outcome_type,
            )
        })
        .collect();

    let mut rows: Vec<GeometryRow> = approach
        .iter()
        .map(|row| {
            let a = &row.record;
            GeometryRow {
                meta: row.meta.clone(),
                approach_id: a.approach_id,
                distance_reduction: a.distance_reduction,
                mean_angle_to_roi: a.mean_angle_to_roi,
                angle_variance: a.angle_variance,
                angle_mad: angle_mad(a.angle_variance),
                outcome_type: outcomes
                    .get(&(row.meta.animal_name.as_str(), a.approach_id))
                    .copied(),
            }
        })
        .collect();

    order::organize(&mut rows, |r| &r.meta);
    rows
}

pub fn summarize_geometry(cohort: &Cohort, rows: &[GeometryRow]) -> Vec<GeometrySummary> {
    let grouped = by_animal(rows, |r| &r.meta);

    let mut summary: Vec<GeometrySummary> = cohort
        .animals()
        .into_iter()
        .map(|(name, meta)| {
            let bouts = grouped.get(name).map(Vec::as_slice).unwrap_or_default();
            GeometrySummary {
                meta: meta.clone(),
                distance_reduction: column_mean(bouts, |r| r.distance_reduction),
                mean_angle_to_roi: column_mean(bouts, |r| r.mean_angle_to_roi),
                angle_variance: column_mean(bouts, |r| r.angle_variance),
                angle_mad: column_mean(bouts, |r| r.angle_mad),
            }
        })
        .collect();

    order::organize(&mut summary, |r| &r.meta);
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::test_support::cohort;

    #[test]
    fn test_angle_mad_approximation() {
        // sqrt(4) * sqrt(2/pi)
        assert!((angle_mad(4.0) - 1.595_769_121_605_731).abs() < 1e-12);
        assert_eq!(angle_mad(0.0), 0.0);
        assert!(angle_mad(f64::NAN).is_nan());
    }

    #[test]
    fn test_geometry_joins_outcomes() {
        let cohort = cohort();
        let rows = approach_geometry(&cohort.approach, &cohort.sequences);

        let m1: Vec<Option<OutcomeType>> = rows
            .iter()
            .filter(|r| r.meta.animal_name == "m1")
            .map(|r| r.outcome_type)
            .collect();
        assert_eq!(
            m1,
            vec![
                Some(OutcomeType::Collision),
                Some(OutcomeType::AbortiveRetreat),
                Some(OutcomeType::ApproachOnly),
            ]
        );
    }

    #[test]
    fn test_geometry_without_sequences() {
        let cohort = cohort();
        let rows = approach_geometry(&cohort.approach, &[]);
        assert_eq!(rows.len(), cohort.approach.len());
        assert!(rows.iter().all(|r| r.outcome_type.is_none()));
    }

    #[test]
    fn test_geometry_summary_skips_nan() {
        let mut cohort = cohort();
        cohort.approach[0].record.angle_variance = f64::NAN;

        let rows = approach_geometry(&cohort.approach, &cohort.sequences);
        let summary = summarize_geometry(&cohort, &rows);

        let m1 = summary.iter().find(|s| s.meta.animal_name == "m1").unwrap();
        assert_eq!(m1.angle_variance, 4.0);
        assert!((m1.angle_mad - angle_mad(4.0)).abs() < 1e-12);
        assert_eq!(m1.distance_reduction, 6.0);

        let m3 = summary.iter().find(|s| s.meta.animal_name == "m3").unwrap();
        assert!(m3.angle_mad.is_nan());
    }
}
