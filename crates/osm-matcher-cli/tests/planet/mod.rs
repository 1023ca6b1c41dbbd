//! Tests for `osm-matcher planet`

use super::*;

#[test]
fn import_and_summarize() {
    let env = TestEnv::with_planet();
    assert!(env.planet.is_file());

    osm_matcher_success!("planet", "summarize", "--planet", env.planet.path())
        .stdout(contains("planet_point"))
        .stdout(is_match(r"(?m)^\s*planet\s+planet_point\s+3\s*$"))
        .stdout(is_match(r"(?m)^\s*planet\s+planet_polygon\s+1\s*$"))
        .stdout(is_match(r"(?m)^\s*planet\s+planet_line\s+0\s*$"));
}

#[test]
fn import_reports_count() {
    let env = TestEnv::new();
    let elements = env.input_file_with_contents("elements.jsonl", ELEMENTS);
    osm_matcher_success!(
        "planet",
        "import",
        "--planet",
        env.planet.path(),
        "--prefix",
        "london",
        elements.path()
    )
    .stdout(contains("Imported 4 elements into the london tables"));
}

#[test]
fn reimport_replaces() {
    let env = TestEnv::with_planet();
    let elements = env.root.child("elements.jsonl");
    osm_matcher_success!("planet", "import", "--planet", env.planet.path(), elements.path());

    let output = osm_matcher!("planet", "summarize", "--planet", env.planet.path(), "-f", "json")
        .output()
        .unwrap();
    assert!(output.status.success());
    let entries: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let total: u64 = entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["rows"].as_u64().unwrap())
        .sum();
    assert_eq!(total, 4);
}

#[test]
fn import_bad_element() {
    let env = TestEnv::new();
    let elements = env.input_file_with_contents(
        "elements.jsonl",
        "{\"type\": \"node\", \"id\": 1, \"lat\": 1.0, \"lon\": 2.0}\n{\"type\": \"blob\"}\n",
    );
    osm_matcher_failure!("planet", "import", "--planet", env.planet.path(), elements.path())
        .code(2)
        .stderr(contains("Failed to parse OSM element at"))
        .stderr(contains("elements.jsonl:2"));
}

#[test]
fn import_bad_prefix() {
    let env = TestEnv::new();
    let elements = env.input_file_with_contents("elements.jsonl", ELEMENTS);
    osm_matcher_failure!(
        "planet",
        "import",
        "--planet",
        env.planet.path(),
        "--prefix",
        "no-dashes",
        elements.path()
    )
    .code(2)
    .stderr(contains("Invalid table prefix"));
}

#[test]
fn summarize_missing_snapshot() {
    let env = TestEnv::new();
    osm_matcher_failure!("planet", "summarize", "--planet", env.planet.path())
        .code(2)
        .stderr(contains("Failed to open planet snapshot"));
    assert!(!env.planet.exists());
}
