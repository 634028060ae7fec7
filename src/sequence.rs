//! Interaction sequence linking
//!
//! Every approach becomes one sequence. Walking approaches in start order,
//! each one greedily claims the earliest unclaimed collision that starts
//! within the collision window after the approach ends, then the earliest
//! unclaimed retreat that starts within the retreat window after the
//! collision (or, without a collision, after the approach). A claimed event
//! can never be linked again. There is no backtracking: the result depends on
//! processing order.
//!
//! Events only link within their own ROI stream.

use crate::config::PipelineConfig;
use crate::types::{
    ApproachEvent, CollisionEvent, Event, InteractionSequence, OutcomeType, RetreatEvent,
};
use std::collections::BTreeMap;

/// Events of one kind that can still be claimed, in start order
struct Pool<'a, E> {
    events: Vec<&'a E>,
    claimed: Vec<bool>,
    floor: usize,
}

impl<'a, E: Event> Pool<'a, E> {
    fn new(mut events: Vec<&'a E>) -> Self {
        events.sort_by_key(|e| e.start_frame());
        let claimed = vec![false; events.len()];
        Self {
            events,
            claimed,
            floor: 0,
        }
    }

    /// Forget every event starting at or before `frame`.
    ///
    /// Only valid when no later query can use a lower bound below `frame`.
    fn retire_through(&mut self, frame: u64) {
        while self.floor < self.events.len()
            && (self.claimed[self.floor] || self.events[self.floor].start_frame() <= frame)
        {
            self.floor += 1;
        }
    }

    /// Claim the earliest unclaimed event starting in `(after, after + window]`
    fn claim_first(&mut self, after: u64, window: u64) -> Option<&'a E> {
        let upper = after.saturating_add(window);

        for idx in self.floor..self.events.len() {
            let start = self.events[idx].start_frame();
            if start > upper {
                break;
            }
            if start > after && !self.claimed[idx] {
                self.claimed[idx] = true;
                return Some(self.events[idx]);
            }
        }
        None
    }
}

/// Links approach, collision and retreat events of one animal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceBuilder {
    /// Frames after the approach end in which a collision may start
    pub collision_window: u64,
    /// Frames after the reference end in which a retreat may start
    pub retreat_window: u64,
}

impl Default for SequenceBuilder {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl SequenceBuilder {
    pub fn new(collision_window: u64, retreat_window: u64) -> Self {
        Self {
            collision_window,
            retreat_window,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.collision_window, config.retreat_window)
    }

    /// Build one sequence per approach.
    ///
    /// Inputs are expected to be filtered with dense IDs. Each ROI is linked
    /// on its own, and sequence IDs follow approach start order across ROIs.
    /// Approaches of one ROI must not overlap, as block segmentation
    /// guarantees: candidates are retired by approach end, which only holds
    /// while those ends increase. All linking state is local to this call.
    pub fn build(
        &self,
        approaches: &[ApproachEvent],
        collisions: &[CollisionEvent],
        retreats: &[RetreatEvent],
    ) -> Vec<InteractionSequence> {
        let mut streams: BTreeMap<&str, RoiEvents<'_>> = BTreeMap::new();
        for a in approaches {
            streams.entry(a.roi_name.as_str()).or_default().approaches.push(a);
        }
        for c in collisions {
            streams.entry(c.roi_name.as_str()).or_default().collisions.push(c);
        }
        for r in retreats {
            streams.entry(r.roi_name.as_str()).or_default().retreats.push(r);
        }

        let mut sequences: Vec<InteractionSequence> = streams
            .into_values()
            .flat_map(|stream| self.link_stream(stream))
            .collect();

        sequences.sort_by_key(|s| s.approach_start_frame);
        for (idx, sequence) in sequences.iter_mut().enumerate() {
            sequence.sequence_id = idx as u32 + 1;
        }

        sequences
    }

    /// Link the events of one ROI; sequence IDs are assigned by the caller
    fn link_stream(&self, stream: RoiEvents<'_>) -> Vec<InteractionSequence> {
        let mut ordered = stream.approaches;
        ordered.sort_by_key(|a| a.start_frame);
        debug_assert!(
            ordered.windows(2).all(|w| w[0].end_frame < w[1].start_frame),
            "approaches of one ROI overlap"
        );

        let mut collision_pool = Pool::new(stream.collisions);
        let mut retreat_pool = Pool::new(stream.retreats);

        let mut sequences = Vec::with_capacity(ordered.len());

        for approach in ordered {
            let a_start = approach.start_frame;
            let a_end = approach.end_frame;

            // Approach ends only increase and every later lower bound is at
            // least the next approach's end, so nothing at or before this end
            // can be claimed again.
            collision_pool.retire_through(a_end);
            retreat_pool.retire_through(a_end);

            let collision = collision_pool.claim_first(a_end, self.collision_window);

            let ref_end = collision.map_or(a_end, |c| c.end_frame);
            let retreat = retreat_pool.claim_first(ref_end, self.retreat_window);

            let outcome_type = match (collision, retreat) {
                (Some(_), _) => OutcomeType::Collision,
                (None, Some(_)) => OutcomeType::AbortiveRetreat,
                (None, None) => OutcomeType::ApproachOnly,
            };

            let end_frame = retreat
                .map(|r| r.end_frame)
                .or(collision.map(|c| c.end_frame))
                .unwrap_or(a_end);

            log::debug!(
                "{}: approach {} -> collision {:?}, retreat {:?} ({})",
                approach.roi_name,
                approach.approach_id,
                collision.map(|c| c.collision_id),
                retreat.map(|r| r.retreat_id),
                outcome_type.as_str()
            );

            sequences.push(InteractionSequence {
                sequence_id: 0,
                roi_name: approach.roi_name.clone(),
                approach_id: approach.approach_id,
                collision_id: collision.map(|c| c.collision_id),
                retreat_id: retreat.map(|r| r.retreat_id),
                outcome_type,
                approach_start_frame: a_start,
                approach_end_frame: a_end,
                collision_start_frame: collision.map(|c| c.start_frame),
                retreat_start_frame: retreat.map(|r| r.start_frame),
                total_sequence_duration: end_frame - a_start + 1,
                approach_to_collision_latency: collision.map(|c| c.start_frame - a_start),
                approach_to_retreat_latency: retreat.map(|r| r.start_frame - a_start),
                collision_to_retreat_latency: match (collision, retreat) {
                    (Some(c), Some(r)) => Some(r.start_frame - c.end_frame),
                    _ => None,
                },
            });
        }

        sequences
    }
}

/// Events of one ROI stream
#[derive(Default)]
struct RoiEvents<'a> {
    approaches: Vec<&'a ApproachEvent>,
    collisions: Vec<&'a CollisionEvent>,
    retreats: Vec<&'a RetreatEvent>,
}
