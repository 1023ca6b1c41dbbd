//! Integration Test Utilities and Common Code

#![allow(dead_code)]

use indoc::indoc;

pub use assert_cmd::prelude::*;
pub use assert_fs::prelude::*;
pub use assert_fs::{fixture::ChildPath, TempDir};
pub use predicates::prelude::*;
pub use predicates::str::{contains, is_empty, RegexPredicate};
pub use std::path::Path;
pub use std::process::Command;

/// Build a `Command` for the `osm-matcher` crate binary with variadic command-line arguments.
///
/// The arguments can be anything that is allowed by `Command::arg`.
#[macro_export]
macro_rules! osm_matcher {
    ( $( $arg:expr ),* ) => {
        {
            let mut cmd = osm_matcher_cmd();
            $(
                cmd.arg($arg);
            )*
            cmd
        }
    }
}

/// Build an `assert_cmd::assert::Assert` by calling `osm_matcher!(args).assert().success()`.
#[macro_export]
macro_rules! osm_matcher_success {
    ( $( $arg:expr ),* ) => { osm_matcher!($( $arg ),*).assert().success() }
}

/// Build an `assert_cmd::assert::Assert` by calling `osm_matcher!(args).assert().failure()`.
#[macro_export]
macro_rules! osm_matcher_failure {
    ( $( $arg:expr ),* ) => { osm_matcher!($( $arg ),*).assert().failure() }
}

/// Get the command for the `osm-matcher` binary under test.
///
/// By default, this is the binary defined in this crate.
/// However, if the `OSM_MATCHER_TEST_PROGRAM` environment variable is set, its value is used
/// instead. Its value should be an absolute path to the desired `osm-matcher` program to test.
pub fn osm_matcher_cmd() -> Command {
    let mut cmd = if let Ok(program) = std::env::var("OSM_MATCHER_TEST_PROGRAM") {
        Command::new(program)
    } else {
        Command::cargo_bin("osm-matcher").expect("osm-matcher should be executable")
    };
    cmd.env_remove("OSM_MATCHER_PLANET").env_remove("OSM_MATCHER_LOG");
    cmd
}

/// Create a `RegexPredicate` from the given pattern.
pub fn is_match(pat: &str) -> RegexPredicate {
    predicates::str::is_match(pat).expect("pattern should compile")
}

/// OSM elements around a pub in London, one per line.
///
/// Only the pub itself should match the `red_lion` item: the car park conflicts with it, the
/// bakery has no evidence, and the other pub is too far away.
pub const ELEMENTS: &str = indoc! {r#"
    {"type": "way", "id": 100, "tags": {"amenity": "pub", "building": "yes", "name": "Red Lion", "way_area": "310"}, "lat": 51.5001, "lon": -0.1}
    {"type": "node", "id": 200, "tags": {"amenity": "parking", "name": "Car Park"}, "lat": 51.5002, "lon": -0.1}
    {"type": "node", "id": 300, "tags": {"shop": "bakery", "name": "Greggs"}, "lat": 51.5003, "lon": -0.1}

    {"type": "node", "id": 400, "tags": {"amenity": "pub", "name": "Red Lion"}, "lat": 51.6, "lon": -0.1}
"#};

pub const RED_LION: &str = indoc! {r#"
    {
        "entity": {
            "id": "Q1",
            "labels": {"en": {"language": "en", "value": "The Red Lion"}}
        },
        "tags": ["amenity=pub"],
        "location": {"lat": 51.5, "lon": -0.1}
    }
"#};

pub const NOWHERE: &str = indoc! {r#"
    {"entity": {"id": "Q2", "labels": {"en": {"value": "Nowhere"}}}, "tags": ["building"]}
"#};

/// A type to represent a mock working environment for testing `osm-matcher`.
///
/// It chooses a path for a planet snapshot within a temporary directory and provides
/// operations to create input files.
pub struct TestEnv {
    pub root: TempDir,
    pub planet: ChildPath,
}

impl TestEnv {
    /// Create a new mock environment.
    pub fn new() -> Self {
        let root = TempDir::new().expect("should be able to create tempdir");
        assert!(root.is_dir());
        let planet = root.child("planet.sqlite");
        assert!(!planet.exists());

        Self { root, planet }
    }

    /// Create a new mock environment with `ELEMENTS` imported under the `planet` prefix.
    pub fn with_planet() -> Self {
        let env = Self::new();
        let elements = env.input_file_with_contents("elements.jsonl", ELEMENTS);
        osm_matcher_success!("planet", "import", "--planet", env.planet.path(), elements.path());
        env
    }

    /// Create a file within this mock environment with the given name and contents.
    pub fn input_file_with_contents(&self, name: &str, contents: &str) -> ChildPath {
        let input = self.root.child(name);
        input
            .write_str(contents)
            .expect("should be able to write input file contents");
        assert!(input.is_file());
        input
    }
}
