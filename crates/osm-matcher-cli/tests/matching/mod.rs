//! Tests for `osm-matcher match`

use super::*;
use pretty_assertions::assert_eq;

fn match_json(env: &TestEnv, extra_args: &[&str], items: &[&ChildPath]) -> serde_json::Value {
    let mut cmd = osm_matcher!("match", "--planet", env.planet.path(), "-f", "json");
    cmd.args(extra_args);
    for item in items {
        cmd.arg(item.path());
    }
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn only_the_pub_matches() {
    let env = TestEnv::with_planet();
    let item = env.input_file_with_contents("red_lion.json", RED_LION);

    let reports = match_json(&env, &[], &[&item]);
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["item"], "Q1");
    assert!(reports[0].get("error").is_none());

    let matches = reports[0]["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    let m = &matches[0];
    assert_eq!(m["osm_type"], "way");
    assert_eq!(m["osm_id"], 100);
    assert_eq!(m["planet_table"], "polygon");
    assert_eq!(m["src_id"], 100);
    assert_eq!(m["name"], "Red Lion");
    assert_eq!(m["identifier_match"], false);
    assert_eq!(m["address_match"], serde_json::Value::Null);
    assert_eq!(m["name_match"]["name"][0]["tier"], "good");
    assert_eq!(m["matching_tags"], serde_json::json!(["amenity"]));
    assert!(m.get("debug").is_none());

    let dist = m["dist"].as_f64().unwrap();
    assert!(dist > 5.0 && dist < 20.0, "{dist}");
}

#[test]
fn debug_detail() {
    let env = TestEnv::with_planet();
    let item = env.input_file_with_contents("red_lion.json", RED_LION);

    let reports = match_json(&env, &["--debug"], &[&item]);
    let m = &reports[0]["matches"][0];
    assert_eq!(m["osm_id"], 100);
    assert_eq!(m["debug"]["found_by"], serde_json::json!(["narrow", "broad"]));
    assert_eq!(m["debug"]["satisfied_predicates"], serde_json::json!(["amenity=pub"]));
    assert_eq!(m["debug"]["building_only"], false);
}

#[test]
fn max_distance_drops_candidates() {
    let env = TestEnv::with_planet();
    let item = env.input_file_with_contents("red_lion.json", RED_LION);

    let reports = match_json(&env, &["--max-distance", "5"], &[&item]);
    assert_eq!(reports[0]["matches"], serde_json::json!([]));
}

#[test]
fn human_format() {
    let env = TestEnv::with_planet();
    let item = env.input_file_with_contents("red_lion.json", RED_LION);

    osm_matcher_success!("match", "--planet", env.planet.path(), "--units", "metres", item.path())
        .stdout(contains("Q1 (1 candidate)"))
        .stdout(is_match(r"(?m)way/100 Red Lion at \d+ m$"))
        .stdout(contains("Evidence: name:good; tags amenity"))
        .stderr(is_empty());
}

#[test]
fn jsonl_items_and_output() {
    let env = TestEnv::with_planet();
    let items = env.input_file_with_contents(
        "items.jsonl",
        &format!("{}\n\n{}\n", RED_LION.replace('\n', " "), RED_LION.replace("Q1", "Q3").replace('\n', " ")),
    );

    let output = osm_matcher!("match", "--planet", env.planet.path(), "-f", "jsonl", items.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let ids: Vec<String> = stdout
        .lines()
        .map(|line| {
            let report: serde_json::Value = serde_json::from_str(line).unwrap();
            report["item"].as_str().unwrap().to_owned()
        })
        .collect();
    assert_eq!(ids, vec!["Q1", "Q3"]);
}

#[test]
fn failed_item_does_not_stop_others() {
    let env = TestEnv::with_planet();
    let nowhere = env.input_file_with_contents("nowhere.json", NOWHERE);
    let item = env.input_file_with_contents("red_lion.json", RED_LION);

    let output = osm_matcher!(
        "match",
        "--planet",
        env.planet.path(),
        "-f",
        "json",
        nowhere.path(),
        item.path()
    )
    .output()
    .unwrap();
    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Failed to match 1 item"), "{stderr}");

    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reports[0]["item"], "Q2");
    assert!(reports[0]["error"].as_str().unwrap().contains("no known location"));
    assert_eq!(reports[1]["item"], "Q1");
    assert_eq!(reports[1]["matches"].as_array().unwrap().len(), 1);
}

#[test]
fn unknown_prefix() {
    let env = TestEnv::with_planet();
    let item = env.input_file_with_contents("red_lion.json", RED_LION);
    osm_matcher_failure!("match", "--planet", env.planet.path(), "--prefix", "paris", item.path())
        .code(2)
        .stderr(contains("has no tables with prefix \"paris\""));
}

#[test]
fn missing_snapshot() {
    let env = TestEnv::new();
    let item = env.input_file_with_contents("red_lion.json", RED_LION);
    osm_matcher_failure!("match", "--planet", env.planet.path(), item.path())
        .code(2)
        .stderr(contains("Failed to open planet snapshot"));
}

#[test]
fn custom_rules_extend_builtins() {
    let env = TestEnv::with_planet();
    let item = env.input_file_with_contents("red_lion.json", RED_LION);
    // treating pubs as incompatible changes nothing: the pub is not building-only
    let rules = env.input_file_with_contents(
        "extra.yml",
        "incompatible_categories:\n  - amenity=pub\n",
    );

    let reports = match_json(&env, &["--rules", rules.path().to_str().unwrap()], &[&item]);
    assert_eq!(reports[0]["matches"].as_array().unwrap().len(), 1);
}
