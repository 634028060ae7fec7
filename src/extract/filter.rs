//! Duration filter and ID assignment

use crate::types::Event;

/// Drop events shorter than `min_frames` and renumber the rest `1..=N`.
///
/// Survivors keep their start-frame order, so the IDs are dense and follow
/// time. Sequence linking relies on both properties.
pub fn filter_and_reassign<E: Event>(mut events: Vec<E>, min_frames: u64) -> Vec<E> {
    events.retain(|e| e.duration_frames() >= min_frames);
    events.sort_by_key(|e| e.start_frame());

    for (i, event) in events.iter_mut().enumerate() {
        event.set_id(i as u32 + 1);
    }

    events
}
