//! Commitment and hesitation indices
//!
//! Standard scores are taken across the whole cohort table, not per animal:
//! - commitment = z(distance_reduction) - z(angle_mad)
//! - hesitation = z(angle_mad) + z(duration_sec)

use super::{by_animal, column_mean, order, Cohort, DurationRow, GeometryRow};
use crate::stats;
use crate::types::AnimalMetadata;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentRow {
    #[serde(flatten)]
    pub geometry: GeometryRow,
    #[serde(with = "crate::types::nan_as_null")]
    pub duration_sec: f64,
    #[serde(with = "crate::types::nan_as_null")]
    pub z_distance: f64,
    #[serde(with = "crate::types::nan_as_null")]
    pub z_angle_mad: f64,
    #[serde(with = "crate::types::nan_as_null")]
    pub z_duration: f64,
    #[serde(with = "crate::types::nan_as_null")]
    pub commitment_index: f64,
    #[serde(with = "crate::types::nan_as_null")]
    pub hesitation_index: f64,
}

/// Per-animal means of the latent table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentSummary {
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
    #[serde(with = "crate::types::nan_as_null")]
    pub duration_sec: f64,
    #[serde(with = "crate::types::nan_as_null")]
    pub commitment_index: f64,
    #[serde(with = "crate::types::nan_as_null")]
    pub hesitation_index: f64,
}

/// Join geometry with durations and derive the composite indices
pub fn latent_indices(geometry: &[GeometryRow], durations: &[DurationRow]) -> Vec<LatentRow> {
    let seconds: BTreeMap<(&str, u32), f64> = durations
        .iter()
        .map(|d| ((d.meta.animal_name.as_str(), d.approach_id), d.duration_sec))
        .collect();

    let duration: Vec<f64> = geometry
        .iter()
        .map(|g| {
            seconds
                .get(&(g.meta.animal_name.as_str(), g.approach_id))
                .copied()
                .unwrap_or(f64::NAN)
        })
        .collect();
    let distance: Vec<f64> = geometry.iter().map(|g| g.distance_reduction).collect();
    let mad: Vec<f64> = geometry.iter().map(|g| g.angle_mad).collect();

    let z_distance = stats::z_scores(&distance);
    let z_mad = stats::z_scores(&mad);
    let z_duration = stats::z_scores(&duration);

    geometry
        .iter()
        .enumerate()
        .map(|(i, g)| LatentRow {
            geometry: g.clone(),
            duration_sec: duration[i],
            z_distance: z_distance[i],
            z_angle_mad: z_mad[i],
            z_duration: z_duration[i],
            commitment_index: z_distance[i] - z_mad[i],
            hesitation_index: z_mad[i] + z_duration[i],
        })
        .collect()
}

pub fn summarize_latent(cohort: &Cohort, rows: &[LatentRow]) -> Vec<LatentSummary> {
    let grouped = by_animal(rows, |r| &r.geometry.meta);

    let mut summary: Vec<LatentSummary> = cohort
        .animals()
        .into_iter()
        .map(|(name, meta)| {
            let bouts = grouped.get(name).map(Vec::as_slice).unwrap_or_default();
            LatentSummary {
                meta: meta.clone(),
                distance_reduction: column_mean(bouts, |r| r.geometry.distance_reduction),
                mean_angle_to_roi: column_mean(bouts, |r| r.geometry.mean_angle_to_roi),
                angle_variance: column_mean(bouts, |r| r.geometry.angle_variance),
                angle_mad: column_mean(bouts, |r| r.geometry.angle_mad),
                duration_sec: column_mean(bouts, |r| r.duration_sec),
                commitment_index: column_mean(bouts, |r| r.commitment_index),
                hesitation_index: column_mean(bouts, |r| r.hesitation_index),
            }
        })
        .collect();

    order::organize(&mut summary, |r| &r.meta);
    summary
}
