//! Pipeline orchestration
//!
//! Stage 1 turns each animal's frame file into event and sequence tables.
//! Animals are processed independently: one animal's failure is logged and
//! recorded in the run manifest while the rest of the batch continues.
//! Stage 2 runs only over what Stage 1 persisted and writes the cohort-level
//! derived tables.

use crate::aggregate::{Cohort, DerivedTables};
use crate::config::PipelineConfig;
use crate::error::ComputeError;
use crate::extract::{extract_events, frame_collision_points, prepare_frames, roi_streams};
use crate::metadata::{attach, SessionGroupMap};
use crate::sequence::SequenceBuilder;
use crate::table::{self, TableFormat};
use crate::types::{
    AnimalMetadata, ApproachEvent, CollisionEvent, EventKind, FrameRecord, InteractionSequence,
    RetreatEvent, Tagged,
};
use crate::{ETHOFLUX_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Directory under the output root holding Stage 1 tables
pub const EVENTS_DIR: &str = "events";
/// Directory under the output root holding Stage 2 tables
pub const DERIVED_DIR: &str = "derived";
/// Directory under `events/` holding sequence tables
pub const SEQUENCES_DIR: &str = "sequences";
/// Run manifest file name under `events/`
pub const MANIFEST_FILE: &str = "manifest.json";

/// Stage 1 tables of one animal, metadata attached
#[derive(Debug, Clone)]
pub struct AnimalOutputs {
    pub meta: AnimalMetadata,
    pub approach: Vec<Tagged<ApproachEvent>>,
    pub collision: Vec<Tagged<CollisionEvent>>,
    pub retreat: Vec<Tagged<RetreatEvent>>,
    pub sequences: Vec<Tagged<InteractionSequence>>,
}

impl AnimalOutputs {
    pub fn summary(&self) -> AnimalSummary {
        AnimalSummary {
            meta: self.meta.clone(),
            n_approach: self.approach.len(),
            n_collision: self.collision.len(),
            n_retreat: self.retreat.len(),
            n_sequences: self.sequences.len(),
        }
    }
}

/// Per-animal event counts recorded in the run manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalSummary {
    #[serde(flatten)]
    pub meta: AnimalMetadata,
    pub n_approach: usize,
    pub n_collision: usize,
    pub n_retreat: usize,
    pub n_sequences: usize,
}

/// An animal excluded from a run, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimalFailure {
    pub animal_name: String,
    pub error: String,
}

/// Record of one Stage 1 batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub producer: String,
    pub version: String,
    pub run_id: String,
    pub computed_at_utc: String,
    pub config: PipelineConfig,
    /// Format of the per-animal tables this run wrote
    #[serde(default)]
    pub format: TableFormat,
    pub animals: Vec<AnimalSummary>,
    pub failures: Vec<AnimalFailure>,
}

impl RunManifest {
    fn new(config: &PipelineConfig, format: TableFormat) -> Self {
        Self {
            producer: PRODUCER_NAME.to_string(),
            version: ETHOFLUX_VERSION.to_string(),
            run_id: Uuid::new_v4().to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
            config: config.clone(),
            format,
            animals: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// True when there was at least one animal and none succeeded
    pub fn all_failed(&self) -> bool {
        self.animals.is_empty() && !self.failures.is_empty()
    }

    /// Names of the animals whose tables were written, sorted
    pub fn animal_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .animals
            .iter()
            .map(|a| a.meta.animal_name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Frame counts reported by [`check_frames`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSummary {
    pub n_frames: usize,
    pub n_rois: usize,
    pub n_approaching: usize,
    pub n_retreating: usize,
    pub n_colliding: usize,
    pub n_collision_points: usize,
}

/// Check one animal's frames without extracting anything.
///
/// Applies the same ordering and collision-payload rules as extraction, so
/// a frame set that passes here will not fail Stage 1 for those reasons.
pub fn check_frames(frames: Vec<FrameRecord>) -> Result<FrameSummary, ComputeError> {
    let frames = prepare_frames(frames)?;
    let mut summary = FrameSummary {
        n_frames: frames.len(),
        n_rois: roi_streams(&frames).len(),
        ..FrameSummary::default()
    };

    for frame in &frames {
        if frame.is_approaching() {
            summary.n_approaching += 1;
        }
        if frame.is_retreating() {
            summary.n_retreating += 1;
        }
        if frame.is_colliding() {
            summary.n_colliding += 1;
            summary.n_collision_points += frame_collision_points(frame)?.len();
        }
    }

    Ok(summary)
}

/// Stage 1 processor: extraction, linking and metadata for a batch of animals
pub struct EthoProcessor {
    config: PipelineConfig,
    groups: SessionGroupMap,
    format: TableFormat,
}

impl EthoProcessor {
    /// Create a processor, rejecting an invalid config up front
    pub fn new(config: PipelineConfig, groups: SessionGroupMap) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            groups,
            format: TableFormat::default(),
        })
    }

    /// Write tables in `format` instead of NDJSON
    pub fn with_format(mut self, format: TableFormat) -> Self {
        self.format = format;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run Stage 1 for one animal in memory.
    ///
    /// # Arguments
    /// * `animal_name` - Key into the session-group map
    /// * `frames` - The animal's frame records, in any order
    ///
    /// # Returns
    /// Filtered events and linked sequences, each row tagged with metadata
    pub fn process_animal(
        &self,
        animal_name: &str,
        frames: Vec<FrameRecord>,
    ) -> Result<AnimalOutputs, ComputeError> {
        let meta = self.groups.get(animal_name)?.clone();
        let frames = prepare_frames(frames)?;
        let events = extract_events(&frames, &self.config)?;

        let sequences = SequenceBuilder::from_config(&self.config).build(
            &events.approach,
            &events.collision,
            &events.retreat,
        );

        log::info!(
            "{}: {} approaches, {} collisions, {} retreats, {} sequences",
            animal_name,
            events.approach.len(),
            events.collision.len(),
            events.retreat.len(),
            sequences.len()
        );

        Ok(AnimalOutputs {
            approach: attach(events.approach, &meta),
            collision: attach(events.collision, &meta),
            retreat: attach(events.retreat, &meta),
            sequences: attach(sequences, &meta),
            meta,
        })
    }

    /// Read a frame file and run Stage 1 on it; the file stem names the animal
    pub fn process_file(&self, path: &Path) -> Result<AnimalOutputs, ComputeError> {
        let animal_name = table::animal_name(path).ok_or_else(|| {
            ComputeError::ParseError(format!("no animal name in {}", path.display()))
        })?;
        let frames: Vec<FrameRecord> = table::read_table(path)?;
        self.process_animal(animal_name, frames)
    }

    /// Persist one animal's tables under `<out>/events/`
    pub fn write_outputs(
        &self,
        out_dir: &Path,
        outputs: &AnimalOutputs,
    ) -> Result<(), ComputeError> {
        let name = outputs.meta.animal_name.as_str();

        table::write_table(
            &event_dir(out_dir, EventKind::Approach.as_str()),
            name,
            &outputs.approach,
            self.format,
        )?;
        table::write_table(
            &event_dir(out_dir, EventKind::Collision.as_str()),
            name,
            &outputs.collision,
            self.format,
        )?;
        table::write_table(
            &event_dir(out_dir, EventKind::Retreat.as_str()),
            name,
            &outputs.retreat,
            self.format,
        )?;
        table::write_table(
            &event_dir(out_dir, SEQUENCES_DIR),
            name,
            &outputs.sequences,
            self.format,
        )?;
        Ok(())
    }

    /// Run Stage 1 over every frame file in `frames_dir`.
    ///
    /// Tables from any earlier run under `out_dir` are removed first, so the
    /// event directories hold exactly this run's animals in one format.
    /// Parse, metadata and extraction errors exclude only the animal they
    /// occur in. Errors writing outputs abort the run.
    pub fn run_extraction(
        &self,
        frames_dir: &Path,
        out_dir: &Path,
    ) -> Result<RunManifest, ComputeError> {
        let files = table::list_tables(frames_dir)?;
        log::info!("Stage 1: {} frame files in {}", files.len(), frames_dir.display());

        clear_events(out_dir)?;
        let mut manifest = RunManifest::new(&self.config, self.format);

        for path in &files {
            match self.process_file(path) {
                Ok(outputs) => {
                    self.write_outputs(out_dir, &outputs)?;
                    manifest.animals.push(outputs.summary());
                }
                Err(e) => {
                    let animal_name = table::animal_name(path)
                        .map(str::to_string)
                        .unwrap_or_else(|| path.display().to_string());
                    log::warn!("Skipping animal {}: {}", animal_name, e);
                    manifest.failures.push(AnimalFailure {
                        animal_name,
                        error: e.to_string(),
                    });
                }
            }
        }

        fs::create_dir_all(out_dir.join(EVENTS_DIR))?;
        fs::write(manifest_path(out_dir), manifest.to_json()?)?;

        log::info!(
            "Stage 1 done: {} animals saved, {} failed (run {})",
            manifest.animals.len(),
            manifest.failures.len(),
            manifest.run_id
        );

        Ok(manifest)
    }
}

fn manifest_path(out_dir: &Path) -> PathBuf {
    out_dir.join(EVENTS_DIR).join(MANIFEST_FILE)
}

fn event_dir(out_dir: &Path, kind: &str) -> PathBuf {
    out_dir.join(EVENTS_DIR).join(kind)
}

/// Remove `dir` and everything in it; a missing directory is already clear
fn remove_dir(dir: &Path) -> Result<(), ComputeError> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// Remove the per-kind event tables and manifest of an earlier run
fn clear_events(out_dir: &Path) -> Result<(), ComputeError> {
    for kind in [
        EventKind::Approach.as_str(),
        EventKind::Collision.as_str(),
        EventKind::Retreat.as_str(),
        SEQUENCES_DIR,
    ] {
        remove_dir(&event_dir(out_dir, kind))?;
    }

    match fs::remove_file(manifest_path(out_dir)) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// The run manifest under `<out>/events/`, if Stage 1 wrote one
pub fn read_manifest(out_dir: &Path) -> Result<Option<RunManifest>, ComputeError> {
    match fs::read_to_string(manifest_path(out_dir)) {
        Ok(json) => Ok(Some(RunManifest::from_json(&json)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// One kind's rows: the manifest's animals only, or every table without one
fn load_events<T: DeserializeOwned>(
    dir: &Path,
    manifest: Option<&RunManifest>,
) -> Result<Vec<T>, ComputeError> {
    match manifest {
        Some(m) => table::load_named_tables(dir, &m.animal_names(), m.format),
        None => table::load_cohort_table(dir),
    }
}

/// Load the concatenated Stage 1 tables under `<out>/events/`.
///
/// With a manifest, only the animals it lists as saved are read, and the
/// manifest also supplies animals whose tables are empty. Without one, every
/// table file is read.
pub fn load_cohort(out_dir: &Path) -> Result<Cohort, ComputeError> {
    let manifest = read_manifest(out_dir)?;
    let m = manifest.as_ref();

    Ok(Cohort {
        approach: load_events(&event_dir(out_dir, EventKind::Approach.as_str()), m)?,
        collision: load_events(&event_dir(out_dir, EventKind::Collision.as_str()), m)?,
        retreat: load_events(&event_dir(out_dir, EventKind::Retreat.as_str()), m)?,
        sequences: load_events(&event_dir(out_dir, SEQUENCES_DIR), m)?,
        roster: m
            .map(|m| m.animals.iter().map(|a| a.meta.clone()).collect())
            .unwrap_or_default(),
    })
}

/// Run Stage 2 over `<out>/events/` and write `<out>/derived/`
pub fn run_aggregation(
    out_dir: &Path,
    fps: f64,
    format: TableFormat,
) -> Result<DerivedTables, ComputeError> {
    if !fps.is_finite() || fps <= 0.0 {
        return Err(ComputeError::InvalidConfig(format!(
            "fps must be positive, got {}",
            fps
        )));
    }

    let cohort = load_cohort(out_dir)?;
    log::info!(
        "Stage 2: {} animals, {} approaches, {} sequences",
        cohort.animals().len(),
        cohort.approach.len(),
        cohort.sequences.len()
    );

    let tables = DerivedTables::build(&cohort, fps);
    let derived = out_dir.join(DERIVED_DIR);
    remove_dir(&derived)?;
    write_derived(&derived, &tables, format)?;

    log::info!("Stage 2 done: derived tables in {}", derived.display());
    Ok(tables)
}

fn write_derived(dir: &Path, t: &DerivedTables, format: TableFormat) -> Result<(), ComputeError> {
    table::write_table(dir, "animal_bout_counts", &t.bout_counts, format)?;
    table::write_table(dir, "animal_bout_outcomes", &t.bout_outcomes, format)?;
    table::write_table(dir, "approach_latency_table", &t.latency, format)?;
    table::write_table(dir, "approach_duration_table", &t.duration, format)?;
    table::write_table(dir, "approach_duration_summary", &t.duration_summary, format)?;
    table::write_table(dir, "approach_geometry_table", &t.geometry, format)?;
    table::write_table(dir, "approach_geometry_summary", &t.geometry_summary, format)?;
    table::write_table(dir, "approach_latent_indices", &t.latent, format)?;
    table::write_table(dir, "approach_latent_summary", &t.latent_summary, format)?;
    table::write_table(dir, "sequence_archetypes", &t.archetypes, format)?;
    table::write_table(
        dir,
        "sequence_archetypes_by_animal",
        &t.archetypes_by_animal,
        format,
    )?;
    table::write_table(
        dir,
        "transition_matrix_by_context",
        &t.transitions_by_context,
        format,
    )?;
    table::write_table(dir, "transition_matrix_by_phase", &t.transitions_by_phase, format)?;
    Ok(())
}
