//! Core types for the ethoflux pipeline
//!
//! This module defines the rows that flow between stages: per-frame records
//! (input), the three event variants produced by the extractors, linked
//! interaction sequences, and the animal/session metadata attached to both.

use serde::{Deserialize, Serialize};

/// Categorical interaction state reported for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionState {
    Approaching,
    Retreating,
    #[serde(other)]
    Other,
}

/// One video frame of geometric/behavioral signals for one animal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameRecord {
    /// Frame index (unique within an animal's stream)
    pub frame: u64,
    /// Region of interest the geometry refers to
    pub roi_name: String,
    /// Distance from the head to the ROI
    #[serde(with = "nan_as_null")]
    pub distance_to_roi: f64,
    /// Angle between heading and the ROI
    #[serde(with = "nan_as_null")]
    pub angle_to_roi: f64,
    /// Apparent head area
    #[serde(with = "nan_as_null")]
    pub head_area: f64,
    /// Frame-to-frame change of `distance_to_roi` (negative when closing in)
    #[serde(alias = "delta distance", with = "nan_as_null")]
    pub delta_distance: f64,
    /// Approaching / retreating / other
    pub interaction_state: InteractionState,
    /// 1 when the head collides with the ROI in this frame
    pub collision_flag: u8,
    /// Raw collision-position payload: null, `[x, y]` or `[[x, y], ...]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collision_pos: Option<serde_json::Value>,
}

impl FrameRecord {
    pub fn is_approaching(&self) -> bool {
        self.interaction_state == InteractionState::Approaching
    }

    pub fn is_retreating(&self) -> bool {
        self.interaction_state == InteractionState::Retreating
    }

    pub fn is_colliding(&self) -> bool {
        self.collision_flag == 1
    }
}

/// Event kind, also the name of the per-kind output directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Approach,
    Collision,
    Retreat,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Approach, EventKind::Collision, EventKind::Retreat];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Approach => "approach",
            EventKind::Collision => "collision",
            EventKind::Retreat => "retreat",
        }
    }
}

/// Shared shape of the three event variants.
///
/// Filtering and sequence linking only need identity and frame bounds, so
/// they are written once against this trait.
pub trait Event {
    const KIND: EventKind;

    fn id(&self) -> u32;
    fn set_id(&mut self, id: u32);
    fn start_frame(&self) -> u64;
    fn end_frame(&self) -> u64;

    fn duration_frames(&self) -> u64 {
        self.end_frame() - self.start_frame() + 1
    }
}

macro_rules! impl_event {
    ($ty:ty, $kind:expr, $id:ident) => {
        impl Event for $ty {
            const KIND: EventKind = $kind;

            fn id(&self) -> u32 {
                self.$id
            }

            fn set_id(&mut self, id: u32) {
                self.$id = id;
            }

            fn start_frame(&self) -> u64 {
                self.start_frame
            }

            fn end_frame(&self) -> u64 {
                self.end_frame
            }
        }
    };
}

/// A contiguous bout of approaching frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproachEvent {
    pub approach_id: u32,
    pub roi_name: String,
    pub start_frame: u64,
    /// Inclusive
    pub end_frame: u64,
    pub duration_frames: u64,
    #[serde(with = "nan_as_null")]
    pub start_distance: f64,
    #[serde(with = "nan_as_null")]
    pub min_distance: f64,
    #[serde(with = "nan_as_null")]
    pub max_distance: f64,
    #[serde(with = "nan_as_null")]
    pub mean_distance: f64,
    #[serde(with = "nan_as_null")]
    pub distance_variance: f64,
    /// `start_distance - min_distance`
    #[serde(with = "nan_as_null")]
    pub distance_reduction: f64,
    #[serde(with = "nan_as_null")]
    pub mean_delta_distance: f64,
    /// Most negative per-frame delta (fastest closing)
    #[serde(with = "nan_as_null")]
    pub peak_approach_speed: f64,
    #[serde(with = "nan_as_null")]
    pub mean_angle_to_roi: f64,
    #[serde(with = "nan_as_null")]
    pub angle_variance: f64,
    #[serde(with = "nan_as_null")]
    pub mean_head_area: f64,
    /// Slope of head area over the bout; NaN for single-frame bouts
    #[serde(with = "nan_as_null")]
    pub head_area_slope: f64,
}

impl_event!(ApproachEvent, EventKind::Approach, approach_id);

/// A contiguous bout of collision frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionEvent {
    pub collision_id: u32,
    pub roi_name: String,
    pub start_frame: u64,
    /// Inclusive
    pub end_frame: u64,
    pub duration_frames: u64,
    #[serde(with = "nan_as_null")]
    pub mean_distance: f64,
    #[serde(with = "nan_as_null")]
    pub distance_variance: f64,
    #[serde(with = "nan_as_null")]
    pub mean_angle_to_roi: f64,
    #[serde(with = "nan_as_null")]
    pub angle_variance: f64,
    #[serde(with = "nan_as_null")]
    pub mean_head_area: f64,
    #[serde(with = "nan_as_null")]
    pub head_area_variance: f64,
    /// Sum of per-axis sample variance of all pooled contact points
    #[serde(with = "nan_as_null")]
    pub collision_position_variance: f64,
}

impl_event!(CollisionEvent, EventKind::Collision, collision_id);

/// A contiguous bout of retreating frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetreatEvent {
    pub retreat_id: u32,
    pub roi_name: String,
    pub start_frame: u64,
    /// Inclusive
    pub end_frame: u64,
    pub duration_frames: u64,
    #[serde(with = "nan_as_null")]
    pub start_distance: f64,
    #[serde(with = "nan_as_null")]
    pub min_distance: f64,
    #[serde(with = "nan_as_null")]
    pub max_distance: f64,
    #[serde(with = "nan_as_null")]
    pub mean_distance: f64,
    #[serde(with = "nan_as_null")]
    pub distance_variance: f64,
    /// `max_distance - start_distance`
    #[serde(with = "nan_as_null")]
    pub distance_increase: f64,
    #[serde(with = "nan_as_null")]
    pub mean_retreat_speed: f64,
    /// Largest per-frame delta (fastest opening)
    #[serde(with = "nan_as_null")]
    pub peak_retreat_speed: f64,
    #[serde(with = "nan_as_null")]
    pub mean_angle_to_roi: f64,
    #[serde(with = "nan_as_null")]
    pub angle_variance: f64,
    #[serde(with = "nan_as_null")]
    pub mean_head_area: f64,
    #[serde(with = "nan_as_null")]
    pub head_area_slope: f64,
}

impl_event!(RetreatEvent, EventKind::Retreat, retreat_id);

/// Outcome of one approach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeType {
    Collision,
    AbortiveRetreat,
    ApproachOnly,
}

impl OutcomeType {
    pub const ALL: [OutcomeType; 3] = [
        OutcomeType::Collision,
        OutcomeType::AbortiveRetreat,
        OutcomeType::ApproachOnly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeType::Collision => "collision",
            OutcomeType::AbortiveRetreat => "abortive_retreat",
            OutcomeType::ApproachOnly => "approach_only",
        }
    }
}

/// One approach with its linked collision and retreat, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionSequence {
    pub sequence_id: u32,
    pub roi_name: String,
    pub approach_id: u32,
    pub collision_id: Option<u32>,
    pub retreat_id: Option<u32>,
    pub outcome_type: OutcomeType,
    pub approach_start_frame: u64,
    pub approach_end_frame: u64,
    pub collision_start_frame: Option<u64>,
    pub retreat_start_frame: Option<u64>,
    pub total_sequence_duration: u64,
    pub approach_to_collision_latency: Option<u64>,
    pub approach_to_retreat_latency: Option<u64>,
    pub collision_to_retreat_latency: Option<u64>,
}

/// Experimental phase derived from the session group code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Training,
    Testing,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Training => "training",
            Phase::Testing => "testing",
        }
    }
}

/// Arena context derived from the session group code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Context {
    A,
    B,
}

/// Session metadata joined onto every table by `animal_name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimalMetadata {
    pub animal_name: String,
    /// Session group code (e.g. `tra`, `ttb`)
    pub group: String,
    pub phase: Phase,
    pub context: Context,
}

/// A row with metadata columns prepended.
///
/// Serializes as one flat object, so a tagged approach row carries
/// `animal_name, group, phase, context, approach_id, ...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tagged<T> {
    #[serde(flatten)]
    pub meta: AnimalMetadata,
    #[serde(flatten)]
    pub record: T,
}

/// Serde adapter writing `NaN` as `null` and reading `null` back as `NaN`.
pub mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
