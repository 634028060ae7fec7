//! Row ordering for per-animal tables
//!
//! Cohort groups come first in the experimental order `tra, trb, tta, ttb`;
//! unknown group codes follow alphabetically. Within a group rows are ordered
//! by animal name, and the sort is stable so per-approach rows keep their
//! approach order.

use crate::types::AnimalMetadata;
use std::cmp::Ordering;

const GROUP_ORDER: [&str; 4] = ["tra", "trb", "tta", "ttb"];

/// Position of a group code in the experimental order
fn group_rank(group: &str) -> usize {
    GROUP_ORDER
        .iter()
        .position(|g| *g == group)
        .unwrap_or(GROUP_ORDER.len())
}

/// Compare two group codes by experimental order
pub fn compare_groups(a: &str, b: &str) -> Ordering {
    group_rank(a)
        .cmp(&group_rank(b))
        .then_with(|| a.cmp(b))
}

/// Compare metadata by group order, then animal name
pub fn compare_meta(a: &AnimalMetadata, b: &AnimalMetadata) -> Ordering {
    compare_groups(&a.group, &b.group).then_with(|| a.animal_name.cmp(&b.animal_name))
}

/// Stable-sort rows by their metadata
pub fn organize<T>(rows: &mut [T], meta: impl Fn(&T) -> &AnimalMetadata) {
    rows.sort_by(|a, b| compare_meta(meta(a), meta(b)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::classify_group;
    use pretty_assertions::assert_eq;

    fn meta(animal: &str, group: &str) -> AnimalMetadata {
        let (phase, context) = classify_group(group);
        AnimalMetadata {
            animal_name: animal.to_string(),
            group: group.to_string(),
            phase,
            context,
        }
    }

    #[test]
    fn test_group_order() {
        let mut groups = vec!["ttb", "zzz", "tra", "abc", "tta", "trb"];
        groups.sort_by(|a, b| compare_groups(a, b));
        assert_eq!(groups, vec!["tra", "trb", "tta", "ttb", "abc", "zzz"]);
    }

    #[test]
    fn test_organize_is_stable() {
        let mut rows = vec![
            (meta("m2", "ttb"), 1),
            (meta("m1", "tra"), 1),
            (meta("m2", "ttb"), 0),
            (meta("m3", "tra"), 1),
            (meta("m1", "tra"), 2),
        ];
        organize(&mut rows, |r| &r.0);

        let order: Vec<(&str, i32)> = rows
            .iter()
            .map(|(m, i)| (m.animal_name.as_str(), *i))
            .collect();
        assert_eq!(
            order,
            vec![("m1", 1), ("m1", 2), ("m3", 1), ("m2", 1), ("m2", 0)]
        );
    }
}
