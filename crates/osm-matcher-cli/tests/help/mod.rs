//! Tests for `osm-matcher` help and version output

use super::*;

#[test]
fn no_args() {
    osm_matcher_failure!()
        .code(2)
        .stdout(is_empty())
        .stderr(contains("Usage: osm-matcher"));
}

#[test]
fn help() {
    osm_matcher_success!("--help")
        .stdout(contains("planet"))
        .stdout(contains("match"))
        .stdout(contains("rules"))
        .stderr(is_empty());
}

#[test]
fn help_match() {
    osm_matcher_success!("help", "match")
        .stdout(contains("--max-distance"))
        .stdout(contains("--broad-radius"))
        .stdout(contains("--units"))
        .stderr(is_empty());
}

#[test]
fn version() {
    osm_matcher_success!("--version")
        .stdout(is_match(r"^osm-matcher \d+\.\d+\.\d+"))
        .stderr(is_empty());
}
