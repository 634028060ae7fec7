//! Approach durations in seconds

use super::{by_animal, column_mean, order, Cohort};
use crate::stats;
use crate::types::{AnimalMetadata, ApproachEvent, Tagged};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationRow {
    #[serde(flatten)]
    pub meta: AnimalMetadata,
    pub approach_id: u32,
    pub duration_sec: f64,
}

/// Mean, sample std and count of approach durations for one animal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationSummary {
    #[serde(flatten)]
    pub meta: AnimalMetadata,
    #[serde(with = "crate::types::nan_as_null")]
    pub mean_duration_sec: f64,
    #[serde(with = "crate::types::nan_as_null")]
    pub std_duration_sec: f64,
    pub n_approaches: usize,
}

/// One row per approach, `duration_frames / fps`
pub fn approach_durations(approach: &[Tagged<ApproachEvent>], fps: f64) -> Vec<DurationRow> {
    let mut rows: Vec<DurationRow> = approach
        .iter()
        .map(|row| DurationRow {
            meta: row.meta.clone(),
            approach_id: row.record.approach_id,
            duration_sec: row.record.duration_frames as f64 / fps,
        })
        .collect();

    order::organize(&mut rows, |r| &r.meta);
    rows
}

pub fn summarize_durations(cohort: &Cohort, rows: &[DurationRow]) -> Vec<DurationSummary> {
    let grouped = by_animal(rows, |r| &r.meta);

    let mut summary: Vec<DurationSummary> = cohort
        .animals()
        .into_iter()
        .map(|(name, meta)| {
            let bouts = grouped.get(name).map(Vec::as_slice).unwrap_or_default();
            let seconds: Vec<f64> = bouts.iter().map(|r| r.duration_sec).collect();

            DurationSummary {
                meta: meta.clone(),
                mean_duration_sec: column_mean(bouts, |r| r.duration_sec),
                std_duration_sec: stats::sample_std(&seconds),
                n_approaches: bouts.len(),
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
    fn test_duration_seconds() {
        let cohort = cohort();
        let rows = approach_durations(&cohort.approach, 10.0);

        let m2: Vec<f64> = rows
            .iter()
            .filter(|r| r.meta.animal_name == "m2")
            .map(|r| r.duration_sec)
            .collect();
        // 6 and 13 frames
        assert_eq!(m2, vec![0.6, 1.3]);
    }

    #[test]
    fn test_duration_summary() {
        let cohort = cohort();
        let rows = approach_durations(&cohort.approach, 1.0);
        let summary = summarize_durations(&cohort, &rows);

        let m1 = summary.iter().find(|s| s.meta.animal_name == "m1").unwrap();
        // 10, 5 and 11 frames
        assert_eq!(m1.n_approaches, 3);
        assert!((m1.mean_duration_sec - 26.0 / 3.0).abs() < 1e-12);
        assert!((m1.std_duration_sec - stats::sample_std(&[10.0, 5.0, 11.0])).abs() < 1e-12);

        let m3 = summary.iter().find(|s| s.meta.animal_name == "m3").unwrap();
        assert_eq!(m3.n_approaches, 0);
        assert!(m3.mean_duration_sec.is_nan());
        assert!(m3.std_duration_sec.is_nan());
    }
}
