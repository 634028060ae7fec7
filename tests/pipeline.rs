use ethoflux::aggregate::{transitions_by_context, transitions_by_phase};
use ethoflux::pipeline::{DERIVED_DIR, EVENTS_DIR, MANIFEST_FILE};
use ethoflux::table::{self, TableFormat};
use ethoflux::types::{InteractionSequence, OutcomeType, Tagged};
use ethoflux::{load_cohort, run_aggregation, EthoProcessor, PipelineConfig, SessionGroupMap};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

const GROUPS: &str = r#"{
    "merged": {
        "tra": ["D:\\rec\\train\\m01.mp4", "D:\\rec\\train\\m02.mp4"],
        "ttb": ["/rec/test/m03.mp4", "/rec/test/m05.mp4"]
    }
}"#;

/// A frame row as a tracking export would write it
fn frame(index: u64, state: &str, collision_pos: Option<Value>) -> Value {
    let mut row = json!({
        "frame": index,
        "roi_name": "object_1",
        "distance_to_roi": 20.0 - index as f64 * 0.1,
        "angle_to_roi": (index % 7) as f64,
        "head_area": 100.0 + index as f64,
        "delta distance": -0.1,
        "interaction_state": state,
        "collision_flag": u8::from(collision_pos.is_some()),
    });
    if let Some(pos) = collision_pos {
        row["collision_pos"] = pos;
    }
    row
}

/// Frames for `len` frames where `spans` sets states and collisions
fn frames(
    len: u64,
    approach: &[(u64, u64)],
    retreat: &[(u64, u64)],
    collide: &[(u64, u64)],
) -> Vec<Value> {
    let within = |spans: &[(u64, u64)], i: u64| spans.iter().any(|(a, b)| (*a..=*b).contains(&i));
    (0..len)
        .map(|i| {
            let state = if within(approach, i) {
                "approaching"
            } else if within(retreat, i) {
                "retreating"
            } else {
                "other"
            };
            let pos = within(collide, i).then(|| json!([i as f64, 2.0]));
            frame(i, state, pos)
        })
        .collect()
}

fn write_ndjson(path: &Path, rows: &[Value]) {
    let body: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
    fs::write(path, body.join("\n")).unwrap();
}

fn setup(frames_dir: &Path) {
    fs::create_dir_all(frames_dir).unwrap();

    // collision, then abortive retreat, then approach only
    write_ndjson(
        &frames_dir.join("m01.ndjson"),
        &frames(200, &[(0, 9), (60, 69), (150, 159)], &[(20, 25), (75, 80)], &[(12, 15)]),
    );

    // array file: two collisions
    let m03 = frames(120, &[(0, 5), (50, 60)], &[], &[(8, 10), (70, 73)]);
    fs::write(frames_dir.join("m03.json"), Value::Array(m03).to_string()).unwrap();

    // malformed collision payload
    let mut m02 = frames(40, &[(0, 5)], &[], &[(8, 10)]);
    m02[9]["collision_pos"] = json!([[1.0, 2.0, 3.0]]);
    write_ndjson(&frames_dir.join("m02.ndjson"), &m02);

    // no session metadata
    write_ndjson(&frames_dir.join("m04.ndjson"), &frames(20, &[(0, 5)], &[], &[]));

    // nothing but idle frames
    write_ndjson(&frames_dir.join("m05.ndjson"), &frames(30, &[], &[], &[]));
}

fn sequences_by_outcome(rows: &[Tagged<InteractionSequence>], animal: &str) -> Vec<OutcomeType> {
    rows.iter()
        .filter(|r| r.meta.animal_name == animal)
        .map(|r| r.record.outcome_type)
        .collect()
}

#[test]
fn test_end_to_end_batch() {
    let root = tempfile::tempdir().unwrap();
    let frames_dir = root.path().join("frames");
    let out = root.path().join("out");
    setup(&frames_dir);

    let groups = SessionGroupMap::from_json(GROUPS).unwrap();
    let processor = EthoProcessor::new(PipelineConfig::default(), groups).unwrap();
    let manifest = processor.run_extraction(&frames_dir, &out).unwrap();

    // Failures are isolated to their animal
    let saved: Vec<&str> = manifest.animals.iter().map(|a| a.meta.animal_name.as_str()).collect();
    assert_eq!(saved, vec!["m01", "m03", "m05"]);

    let failed: Vec<&str> = manifest.failures.iter().map(|f| f.animal_name.as_str()).collect();
    assert_eq!(failed, vec!["m02", "m04"]);
    assert!(manifest.failures[0].error.contains("frame 9"));
    assert!(manifest.failures[1].error.contains("m04"));
    assert!(!manifest.all_failed());

    assert!(out.join(EVENTS_DIR).join(MANIFEST_FILE).is_file());
    assert!(out.join(EVENTS_DIR).join("approach").join("m01.ndjson").is_file());
    assert!(!out.join(EVENTS_DIR).join("approach").join("m02.ndjson").exists());

    let cohort = load_cohort(&out).unwrap();
    assert_eq!(
        sequences_by_outcome(&cohort.sequences, "m01"),
        vec![
            OutcomeType::Collision,
            OutcomeType::AbortiveRetreat,
            OutcomeType::ApproachOnly
        ]
    );
    assert_eq!(
        sequences_by_outcome(&cohort.sequences, "m03"),
        vec![OutcomeType::Collision, OutcomeType::Collision]
    );
    assert_eq!(cohort.animals().len(), 3);

    // Stage 2
    let tables = run_aggregation(&out, 30.0, TableFormat::Ndjson).unwrap();

    let counts: Vec<(&str, usize)> = tables
        .bout_counts
        .iter()
        .map(|r| (r.meta.animal_name.as_str(), r.n_approach_bouts))
        .collect();
    assert_eq!(counts, vec![("m01", 3), ("m03", 2), ("m05", 0)]);

    let m05 = tables
        .bout_outcomes
        .iter()
        .find(|r| r.counts.meta.animal_name == "m05")
        .unwrap();
    assert!(m05.success_rate.is_nan());

    for name in [
        "animal_bout_counts",
        "animal_bout_outcomes",
        "approach_latency_table",
        "approach_duration_table",
        "approach_duration_summary",
        "approach_geometry_table",
        "approach_geometry_summary",
        "approach_latent_indices",
        "approach_latent_summary",
        "sequence_archetypes",
        "sequence_archetypes_by_animal",
        "transition_matrix_by_context",
        "transition_matrix_by_phase",
    ] {
        let path = out.join(DERIVED_DIR).join(format!("{}.ndjson", name));
        assert!(path.is_file(), "missing {}", name);
    }

    // Persisted rates write NaN as null
    let outcomes: Vec<Value> =
        table::read_table(&out.join(DERIVED_DIR).join("animal_bout_outcomes.ndjson")).unwrap();
    let m05_row = outcomes.iter().find(|r| r["animal_name"] == "m05").unwrap();
    assert!(m05_row["success_rate"].is_null());

    // Archetype proportions sum to one per cohort cell
    let archetypes: Vec<Value> =
        table::read_table(&out.join(DERIVED_DIR).join("sequence_archetypes.ndjson")).unwrap();
    for group in ["tra", "ttb"] {
        let sum: f64 = archetypes
            .iter()
            .filter(|r| r["group"] == group)
            .map(|r| r["proportion"].as_f64().unwrap())
            .sum();
        assert!((sum - 1.0).abs() < 1e-9, "{} sums to {}", group, sum);
    }
}

#[test]
fn test_transitions_independent_of_read_order() {
    let root = tempfile::tempdir().unwrap();
    let frames_dir = root.path().join("frames");
    let out = root.path().join("out");
    setup(&frames_dir);

    let groups = SessionGroupMap::from_json(GROUPS).unwrap();
    EthoProcessor::new(PipelineConfig::default(), groups)
        .unwrap()
        .run_extraction(&frames_dir, &out)
        .unwrap();

    let sequences = load_cohort(&out).unwrap().sequences;
    let by_context = transitions_by_context(&sequences);
    let by_phase = transitions_by_phase(&sequences);

    let mut reordered = sequences.clone();
    reordered.reverse();
    reordered.rotate_left(1);

    assert_eq!(transitions_by_context(&reordered), by_context);
    assert_eq!(transitions_by_phase(&reordered), by_phase);

    for context in ["A", "B"] {
        let sum: f64 = by_context
            .iter()
            .filter(|r| serde_json::to_value(r.context).unwrap() == context)
            .map(|r| r.probability)
            .sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_json_output_format() {
    let root = tempfile::tempdir().unwrap();
    let frames_dir = root.path().join("frames");
    let out = root.path().join("out");
    setup(&frames_dir);

    let groups = SessionGroupMap::from_json(GROUPS).unwrap();
    EthoProcessor::new(PipelineConfig::default(), groups)
        .unwrap()
        .with_format(TableFormat::Json)
        .run_extraction(&frames_dir, &out)
        .unwrap();

    let path = out.join(EVENTS_DIR).join("sequences").join("m01.json");
    let rows: Vec<Value> = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["outcome_type"], "collision");
    assert_eq!(rows[2]["collision_id"], Value::Null);

    let tables = run_aggregation(&out, 30.0, TableFormat::Json).unwrap();
    assert_eq!(tables.latency.len(), 4);
}

#[test]
fn test_stricter_config_changes_links() {
    let root = tempfile::tempdir().unwrap();
    let frames_dir = root.path().join("frames");
    let out = root.path().join("out");
    setup(&frames_dir);

    // m01's collision starts 3 frames after its approach; a 2-frame window misses it
    let config = PipelineConfig {
        collision_window: 2,
        ..PipelineConfig::default()
    };
    let groups = SessionGroupMap::from_json(GROUPS).unwrap();
    EthoProcessor::new(config, groups)
        .unwrap()
        .run_extraction(&frames_dir, &out)
        .unwrap();

    let cohort = load_cohort(&out).unwrap();
    let m01 = sequences_by_outcome(&cohort.sequences, "m01");
    assert_eq!(m01[0], OutcomeType::AbortiveRetreat);
}

#[test]
fn test_rerun_replaces_previous_outputs() {
    let root = tempfile::tempdir().unwrap();
    let frames_dir = root.path().join("frames");
    let out = root.path().join("out");
    setup(&frames_dir);

    let extract = |format: TableFormat| {
        let groups = SessionGroupMap::from_json(GROUPS).unwrap();
        EthoProcessor::new(PipelineConfig::default(), groups)
            .unwrap()
            .with_format(format)
            .run_extraction(&frames_dir, &out)
            .unwrap()
    };

    extract(TableFormat::Ndjson);
    let first = load_cohort(&out).unwrap();

    // Same input, other format: one file per animal, no doubled rows
    extract(TableFormat::Json);
    let approach_dir = out.join(EVENTS_DIR).join("approach");
    assert!(approach_dir.join("m01.json").is_file());
    assert!(!approach_dir.join("m01.ndjson").exists());

    let second = load_cohort(&out).unwrap();
    assert_eq!(second.approach.len(), first.approach.len());
    assert_eq!(second.sequences, first.sequences);

    // m01 now fails; its earlier tables must not reach Stage 2
    let mut m01 = frames(200, &[(0, 9), (60, 69), (150, 159)], &[(20, 25), (75, 80)], &[(12, 15)]);
    m01[13]["collision_pos"] = json!([[1.0, 2.0, 3.0]]);
    write_ndjson(&frames_dir.join("m01.ndjson"), &m01);

    let manifest = extract(TableFormat::Ndjson);
    assert!(manifest.failures.iter().any(|f| f.animal_name == "m01"));
    assert!(!approach_dir.join("m01.json").exists());
    assert!(!approach_dir.join("m01.ndjson").exists());

    let cohort = load_cohort(&out).unwrap();
    assert!(cohort.approach.iter().all(|r| r.meta.animal_name != "m01"));
    assert!(cohort.sequences.iter().all(|r| r.meta.animal_name != "m01"));

    let tables = run_aggregation(&out, 30.0, TableFormat::Ndjson).unwrap();
    let animals: Vec<&str> = tables
        .bout_counts
        .iter()
        .map(|r| r.meta.animal_name.as_str())
        .collect();
    assert_eq!(animals, vec!["m03", "m05"]);
}

#[test]
fn test_two_roi_streams_in_one_file() {
    let root = tempfile::tempdir().unwrap();
    let frames_dir = root.path().join("frames");
    let out = root.path().join("out");
    fs::create_dir_all(&frames_dir).unwrap();

    // Both objects tracked over the same frame indices
    let mut rows = frames(40, &[(0, 5)], &[], &[(8, 10)]);
    for mut row in frames(40, &[(20, 25)], &[(28, 32)], &[]) {
        row["roi_name"] = json!("object_2");
        rows.push(row);
    }
    write_ndjson(&frames_dir.join("m01.ndjson"), &rows);

    let groups = SessionGroupMap::from_json(GROUPS).unwrap();
    let manifest = EthoProcessor::new(PipelineConfig::default(), groups)
        .unwrap()
        .run_extraction(&frames_dir, &out)
        .unwrap();
    assert!(manifest.failures.is_empty());

    let cohort = load_cohort(&out).unwrap();
    let sequences: Vec<(u32, &str, OutcomeType)> = cohort
        .sequences
        .iter()
        .map(|r| (r.record.sequence_id, r.record.roi_name.as_str(), r.record.outcome_type))
        .collect();
    assert_eq!(
        sequences,
        vec![
            (1, "object_1", OutcomeType::Collision),
            (2, "object_2", OutcomeType::AbortiveRetreat),
        ]
    );
}
