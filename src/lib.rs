//! Ethoflux - batch engine for ethogram interaction sequences
//!
//! Ethoflux turns per-frame behavioral tracking of animals around a region of
//! interest into discrete behavioral events and causally linked interaction
//! sequences, then reduces them to cohort-level statistics:
//! frames → block segmentation → event extraction → duration filter →
//! sequence linking → metadata → aggregation.
//!
//! ## Stages
//!
//! - **Stage 1**: per animal, independent: approach/collision/retreat events
//!   and their linked sequences ([`pipeline::EthoProcessor`])
//! - **Stage 2**: per cohort, after Stage 1 completes: counts, rates,
//!   latencies, geometry, latent indices, archetypes and transition matrices
//!   ([`pipeline::run_aggregation`])

pub mod aggregate;
pub mod config;
pub mod error;
pub mod extract;
pub mod metadata;
pub mod pipeline;
pub mod segment;
pub mod sequence;
pub mod stats;
pub mod table;
pub mod types;

pub use config::PipelineConfig;
pub use error::ComputeError;
pub use metadata::SessionGroupMap;
pub use pipeline::{check_frames, load_cohort, run_aggregation, EthoProcessor, RunManifest};
pub use sequence::SequenceBuilder;
pub use table::TableFormat;

/// Ethoflux version recorded in every run manifest
pub const ETHOFLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name recorded in every run manifest
pub const PRODUCER_NAME: &str = "ethoflux";
