//! Session-group map and metadata attachment
//!
//! The session-group file lists, per group code, the video paths recorded in
//! that group. Each path's file stem is an animal name; the group code itself
//! encodes phase (`tr…` = training) and context (`…a` = A).

use crate::error::ComputeError;
use crate::types::{AnimalMetadata, Context, Phase, Tagged};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SessionGroupFile {
    merged: BTreeMap<String, Vec<String>>,
}

/// Derive phase and context from a session group code
pub fn classify_group(code: &str) -> (Phase, Context) {
    let phase = if code.starts_with("tr") {
        Phase::Training
    } else {
        Phase::Testing
    };
    let context = if code.ends_with('a') {
        Context::A
    } else {
        Context::B
    };
    (phase, context)
}

/// Animal name for a recorded video path, accepting either separator
fn animal_name_from_path(path: &str) -> Option<String> {
    let normalized = path.replace('\\', "/");
    Path::new(&normalized)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Lookup from animal name to its session metadata
#[derive(Debug, Clone, Default)]
pub struct SessionGroupMap {
    animals: BTreeMap<String, AnimalMetadata>,
}

impl SessionGroupMap {
    /// Build a map from group codes to the video paths recorded in them
    pub fn from_groups(groups: &BTreeMap<String, Vec<String>>) -> Result<Self, ComputeError> {
        let mut animals = BTreeMap::new();

        for (code, paths) in groups {
            let (phase, context) = classify_group(code);

            for path in paths {
                let animal_name = animal_name_from_path(path).ok_or_else(|| {
                    ComputeError::ParseError(format!(
                        "group {}: no file name in path '{}'",
                        code, path
                    ))
                })?;

                let meta = AnimalMetadata {
                    animal_name: animal_name.clone(),
                    group: code.clone(),
                    phase,
                    context,
                };

                if let Some(previous) = animals.insert(animal_name.clone(), meta) {
                    log::warn!(
                        "Animal {} listed in groups {} and {}; keeping {}",
                        animal_name,
                        previous.group,
                        code,
                        code
                    );
                }
            }
        }

        Ok(Self { animals })
    }

    /// Parse the session-group JSON document (`{"merged": {...}}`)
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let file: SessionGroupFile = serde_json::from_str(json)?;
        Self::from_groups(&file.merged)
    }

    pub fn from_file(path: &Path) -> Result<Self, ComputeError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Metadata for one animal; absence is a hard error
    pub fn get(&self, animal_name: &str) -> Result<&AnimalMetadata, ComputeError> {
        self.animals
            .get(animal_name)
            .ok_or_else(|| ComputeError::MissingMetadata(animal_name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.animals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animals.is_empty()
    }
}

/// Prepend one animal's metadata columns to every row
pub fn attach<T>(rows: Vec<T>, meta: &AnimalMetadata) -> Vec<Tagged<T>> {
    rows.into_iter()
        .map(|record| Tagged {
            meta: meta.clone(),
            record,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const GROUPS: &str = r#"{
        "merged": {
            "tra": ["C:\\videos\\day1\\m01.mp4", "C:\\videos\\day1\\m02.mp4"],
            "ttb": ["/data/videos/day3/m03.avi"]
        }
    }"#;

    #[test]
    fn test_classify_group() {
        assert_eq!(classify_group("tra"), (Phase::Training, Context::A));
        assert_eq!(classify_group("trb"), (Phase::Training, Context::B));
        assert_eq!(classify_group("tta"), (Phase::Testing, Context::A));
        assert_eq!(classify_group("ttb"), (Phase::Testing, Context::B));
    }

    #[test]
    fn test_from_json_resolves_stems() {
        let map = SessionGroupMap::from_json(GROUPS).unwrap();
        assert_eq!(map.len(), 3);

        let m01 = map.get("m01").unwrap();
        assert_eq!(m01.group, "tra");
        assert_eq!(m01.phase, Phase::Training);
        assert_eq!(m01.context, Context::A);

        let m03 = map.get("m03").unwrap();
        assert_eq!(m03.group, "ttb");
        assert_eq!(m03.phase, Phase::Testing);
        assert_eq!(m03.context, Context::B);
    }

    #[test]
    fn test_missing_animal_is_error() {
        let map = SessionGroupMap::from_json(GROUPS).unwrap();
        let err = map.get("m99").unwrap_err();
        assert!(matches!(err, ComputeError::MissingMetadata(ref name) if name == "m99"));
    }

    #[test]
    fn test_missing_merged_key_is_error() {
        assert!(SessionGroupMap::from_json(r#"{"groups": {}}"#).is_err());
    }

    #[test]
    fn test_attach_tags_every_row() {
        let map = SessionGroupMap::from_json(GROUPS).unwrap();
        let meta = map.get("m02").unwrap();

        let tagged = attach(vec![1u32, 2, 3], meta);
        assert_eq!(tagged.len(), 3);
        assert!(tagged.iter().all(|t| t.meta.animal_name == "m02"));
        assert_eq!(tagged[2].record, 3);
    }

    #[test]
    fn test_attach_empty_rows() {
        let map = SessionGroupMap::from_json(GROUPS).unwrap();
        let tagged: Vec<Tagged<u32>> = attach(Vec::new(), map.get("m01").unwrap());
        assert!(tagged.is_empty());
    }
}
