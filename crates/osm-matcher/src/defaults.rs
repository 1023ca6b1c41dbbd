use anyhow::Result;
use include_dir::{include_dir, Dir};

use osm_matcher_rules::MatchRules;

// NOTE: `include_dir` does not always notice new files during incremental builds; touch this
// file after adding a rules file.
pub static DEFAULT_RULES_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/data/default/rules");

/// Load the built-in match rules.
///
/// The embedded YAML files are merged in path order.
pub fn get_default_rules() -> Result<MatchRules> {
    let mut files: Vec<_> = DEFAULT_RULES_DIR.find("**/*.yml")?.filter_map(|e| e.as_file()).collect();
    files.sort_by(|a, b| a.path().cmp(b.path()));
    MatchRules::from_paths_and_contents(files.iter().map(|f| (f.path(), f.contents())))
}
