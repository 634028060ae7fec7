//! Pipeline configuration
//!
//! Link windows and the minimum-duration threshold are parameters rather than
//! constants so that a run can be reproduced with different settings.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Default link window for approach → collision (frames)
pub const DEFAULT_COLLISION_WINDOW: u64 = 30;

/// Default link window for approach/collision → retreat (frames)
pub const DEFAULT_RETREAT_WINDOW: u64 = 30;

/// Events shorter than this many frames are dropped
pub const DEFAULT_MIN_EVENT_FRAMES: u64 = 3;

/// Recording frame rate
pub const DEFAULT_FPS: f64 = 30.0;

/// Tunable thresholds for extraction, linking and aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// A collision may start in `(approach_end, approach_end + collision_window]`
    pub collision_window: u64,
    /// A retreat may start in `(ref_end, ref_end + retreat_window]`
    pub retreat_window: u64,
    /// Minimum `duration_frames` for an event to survive filtering
    pub min_event_frames: u64,
    /// Frames per second, for second-valued tables
    pub fps: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collision_window: DEFAULT_COLLISION_WINDOW,
            retreat_window: DEFAULT_RETREAT_WINDOW,
            min_event_frames: DEFAULT_MIN_EVENT_FRAMES,
            fps: DEFAULT_FPS,
        }
    }
}

impl PipelineConfig {
    /// Load a config from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings that would make derived tables meaningless
    pub fn validate(&self) -> Result<(), ComputeError> {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return Err(ComputeError::InvalidConfig(format!(
                "fps must be positive, got {}",
                self.fps
            )));
        }
        if self.min_event_frames == 0 {
            return Err(ComputeError::InvalidConfig(
                "min_event_frames must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
