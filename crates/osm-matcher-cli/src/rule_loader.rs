use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use osm_matcher::compiled_rules::CompiledRules;
use osm_matcher::defaults::get_default_rules;
use osm_matcher_rules::MatchRules;

use crate::args::RuleSpecifierArgs;

pub struct RuleLoader {
    load_builtin_rules: bool,
    additional_rule_paths: Vec<PathBuf>,
}

impl RuleLoader {
    /// Create a new loader that loads the builtin rules.
    pub fn new() -> Self {
        Self {
            load_builtin_rules: true,
            additional_rule_paths: Vec::new(),
        }
    }

    /// Configure whether or not to load the builtin rules.
    pub fn load_builtin_rules(mut self, load_builtin_rules: bool) -> Self {
        self.load_builtin_rules = load_builtin_rules;
        self
    }

    /// Add additional file or directory paths to load rules from.
    pub fn additional_rule_paths<P: AsRef<Path>, I: IntoIterator<Item = P>>(
        mut self,
        paths: I,
    ) -> Self {
        self.additional_rule_paths
            .extend(paths.into_iter().map(|p| p.as_ref().to_owned()));
        self
    }

    /// Load rules according to this loader's configuration.
    ///
    /// Additional rules extend the builtin tables.
    pub fn load(&self) -> Result<MatchRules> {
        let mut rules = MatchRules::new();

        if self.load_builtin_rules {
            let builtins = get_default_rules().context("Failed to load default rules")?;
            rules.update(builtins);
        }

        if !self.additional_rule_paths.is_empty() {
            let custom_rules = MatchRules::from_paths(&self.additional_rule_paths)
                .context("Failed to load specified rules files")?;
            rules.update(custom_rules);
        }

        Ok(rules)
    }

    /// Load and compile rules according to this loader's configuration.
    pub fn compile(&self) -> Result<CompiledRules> {
        let rules = self.load()?;
        CompiledRules::from_rules(rules).context("Failed to compile rules")
    }

    pub fn from_rule_specifiers(specs: &RuleSpecifierArgs) -> Self {
        Self::new()
            .load_builtin_rules(specs.load_builtins)
            .additional_rule_paths(specs.rules.as_slice())
    }
}
