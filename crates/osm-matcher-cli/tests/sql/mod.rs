//! Tests for `osm-matcher sql`

use super::*;

#[test]
fn narrow_query() {
    let env = TestEnv::new();
    let item = env.input_file_with_contents("red_lion.json", RED_LION);
    osm_matcher_success!("sql", item.path())
        .stdout(contains("-- Q1\n"))
        .stdout(contains("from planet_point"))
        .stdout(contains("from planet_line"))
        .stdout(contains("from planet_polygon"))
        .stdout(contains("(tags->'amenity' = 'pub')"))
        .stdout(contains("limit 50;"))
        .stderr(is_empty());
}

#[test]
fn all_queries_with_options() {
    let env = TestEnv::new();
    let item = env.input_file_with_contents("red_lion.json", RED_LION);
    osm_matcher_success!(
        "sql",
        "--all",
        "--prefix",
        "london",
        "--broad-radius",
        "250",
        "--limit",
        "7",
        item.path()
    )
    .stdout(contains("-- Q1 (narrow)"))
    .stdout(contains("-- Q1 (broad)"))
    .stdout(contains("from london_polygon"))
    .stdout(contains(", 250)"))
    .stdout(contains("limit 7;"));
}

#[test]
fn missing_location() {
    let env = TestEnv::new();
    let item = env.input_file_with_contents("nowhere.json", NOWHERE);
    osm_matcher_failure!("sql", item.path())
        .code(2)
        .stderr(contains("Q2 has no known location"));
}

#[test]
fn missing_item_file() {
    let env = TestEnv::new();
    osm_matcher_failure!("sql", env.root.child("absent.json").path())
        .code(2)
        .stderr(contains("Failed to open item file"));
}
