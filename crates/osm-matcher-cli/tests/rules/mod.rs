//! Tests for `osm-matcher rules`

use super::*;

#[test]
fn rules_list() {
    osm_matcher_success!("rules", "list")
        .stdout(contains("Incompatible categories"))
        .stdout(contains("amenity=parking"))
        .stdout(is_match(r"(?m)^\s*Cross-reference keys\s+1\s+wikidata\s*$"))
        .stderr(is_empty());
}

#[test]
fn rules_list_json() {
    let output = osm_matcher!("rules", "list", "--format=json").output().unwrap();
    assert!(output.status.success());
    let rules: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rules["cross_reference_keys"], serde_json::json!(["wikidata"]));
    assert_eq!(rules["affixes"]["prefixes"], serde_json::json!(["the"]));
}

#[test]
fn rules_list_extra_rules_dir() {
    let env = TestEnv::new();
    env.input_file_with_contents("rules/extra.yml", "cross_reference_keys: [\"subject:wikidata\"]\n");
    osm_matcher_success!("rules", "list", "--rules", env.root.child("rules").path())
        .stdout(is_match(r"(?m)^\s*Cross-reference keys\s+2\s+wikidata, subject:wikidata\s*$"));
}

#[test]
fn rules_check_builtins() {
    osm_matcher_success!("rules", "check")
        .stdout(contains("no issues detected"))
        .stderr(is_empty());
}

#[test]
fn rules_check_errors() {
    let env = TestEnv::new();
    let rules = env.input_file_with_contents(
        "bad.yml",
        indoc::indoc! {r#"
            name_keys:
              primary: [name]
            affixes:
              suffixes: ["Inn"]
            incompatible_categories: ["=parking"]
            category_keys: [amenity]
            cross_reference_keys: [wikidata]
        "#},
    );
    osm_matcher_failure!("rules", "check", "--load-builtins=false", "--rules", rules.path())
        .code(2)
        .stdout(contains("2 errors and 0 warnings"))
        .stderr(contains("not normalized"))
        .stderr(contains("has an empty key"));
}

#[test]
fn rules_check_warnings_as_errors() {
    let env = TestEnv::new();
    let rules = env.input_file_with_contents(
        "warn.yml",
        "name_keys:\n  primary: [name]\n  secondary: [name]\ncategory_keys: [amenity]\ncross_reference_keys: [wikidata]\n",
    );
    osm_matcher_success!("rules", "check", "--load-builtins=false", "--rules", rules.path())
        .stdout(contains("0 errors and 1 warnings"));
    osm_matcher_failure!("rules", "check", "-W", "--load-builtins=false", "--rules", rules.path())
        .code(2)
        .stderr(contains("1 warning; warnings being treated as errors"));
}

#[test]
fn rules_check_missing_file() {
    let env = TestEnv::new();
    osm_matcher_failure!("rules", "check", "--rules", env.root.child("absent.yml").path())
        .code(2)
        .stderr(contains("Failed to load rules"));
}
