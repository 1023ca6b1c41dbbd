use anyhow::{bail, Context, Result};
use ignore::types::TypesBuilder;
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, debug_span};

use crate::util::{self, extend_unique};
use crate::{Affixes, NameKeys};

/// The configuration tables that drive matching.
///
/// Every section is optional in YAML, so that a collection can be assembled from several
/// files; see `MatchRules::update`.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct MatchRules {
    /// Tag keys compared against item names
    #[serde(default)]
    pub name_keys: NameKeys,

    /// Descriptive words stripped from names for the weaker match tiers
    #[serde(default)]
    pub affixes: Affixes,

    /// Tag predicates (`key` or `key=value`) for categories that a building-only match can
    /// never be, e.g., `amenity=parking`
    #[serde(default)]
    pub incompatible_categories: Vec<String>,

    /// Tag keys that say what a feature is; disagreeing values on these keys are conflicts
    #[serde(default)]
    pub category_keys: Vec<String>,

    /// Tag keys that carry an item's external identifier, e.g., `wikidata`
    #[serde(default)]
    pub cross_reference_keys: Vec<String>,

    /// Prefixes removed from sitelink titles before they are used as names
    #[serde(default)]
    pub sitelink_prefixes: Vec<String>,

    /// Claim properties whose string values hold postal addresses
    #[serde(default)]
    pub address_properties: Vec<String>,
}

impl MatchRules {
    /// Create an empty collection of rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update this collection of rules by adding those from another collection.
    ///
    /// Lists are extended in order; entries already present are not repeated.
    pub fn update(&mut self, other: MatchRules) {
        self.name_keys.update(other.name_keys);
        self.affixes.update(other.affixes);
        extend_unique(&mut self.incompatible_categories, other.incompatible_categories);
        extend_unique(&mut self.category_keys, other.category_keys);
        extend_unique(&mut self.cross_reference_keys, other.cross_reference_keys);
        extend_unique(&mut self.sitelink_prefixes, other.sitelink_prefixes);
        extend_unique(&mut self.address_properties, other.address_properties);
    }

    // Load from an iterable of `(path, contents)`.
    pub fn from_paths_and_contents<'a, I: IntoIterator<Item = (&'a Path, &'a [u8])>>(
        iterable: I,
    ) -> Result<Self> {
        let mut rules = Self::new();
        for (path, contents) in iterable.into_iter() {
            let rs: Self = serde_yaml::from_reader(contents)
                .with_context(|| format!("Failed to load rules YAML from {}", path.display()))?;
            rules.update(rs);
        }

        Ok(rules)
    }

    /// Load rules from the given paths, which may refer either to YAML files or to directories.
    pub fn from_paths<P: AsRef<Path>, I: IntoIterator<Item = P>>(paths: I) -> Result<Self> {
        let mut num_paths = 0;
        let mut rules = MatchRules::new();
        for input in paths {
            num_paths += 1;
            let input = input.as_ref();
            if input.is_file() {
                rules.update(MatchRules::from_yaml_file(input)?);
            } else if input.is_dir() {
                rules.update(MatchRules::from_directory(input)?);
            } else {
                bail!("Unhandled input type: {} is neither a file nor directory", input.display());
            }
        }
        debug!("Loaded {} table entries from {num_paths} paths", rules.num_entries());
        Ok(rules)
    }

    /// Load rules from the given YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let _span = debug_span!("MatchRules::from_yaml_file", "{}", path.display()).entered();
        let rules: Self = util::load_yaml_file(path)
            .with_context(|| format!("Failed to load rules YAML from {}", path.display()))?;
        debug!("Loaded {} table entries from {}", rules.num_entries(), path.display());
        Ok(rules)
    }

    /// Load rules from YAML files found recursively within the given directory.
    ///
    /// Files are merged in sorted path order.
    pub fn from_directory<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let _span = debug_span!("MatchRules::from_directory", "{}", path.display()).entered();

        let yaml_types = TypesBuilder::new().add_defaults().select("yaml").build()?;

        let walker = WalkBuilder::new(path)
            .types(yaml_types)
            .follow_links(true)
            .standard_filters(false)
            .build();
        let mut yaml_files = Vec::new();
        for entry in walker {
            let entry = entry?;
            if entry.file_type().map_or(false, |t| !t.is_dir()) {
                yaml_files.push(entry.into_path());
            }
        }
        yaml_files.sort();
        debug!("Found {} rules files to load within {}", yaml_files.len(), path.display());

        let mut rules = MatchRules::new();
        for yaml_file in yaml_files {
            rules.update(MatchRules::from_yaml_file(yaml_file)?);
        }
        Ok(rules)
    }

    /// How many entries are there across all tables?
    pub fn num_entries(&self) -> usize {
        self.name_keys.primary.len()
            + self.name_keys.secondary.len()
            + self.name_keys.secondary_prefixes.len()
            + self.affixes.prefixes.len()
            + self.affixes.suffixes.len()
            + self.incompatible_categories.len()
            + self.category_keys.len()
            + self.cross_reference_keys.len()
            + self.sitelink_prefixes.len()
            + self.address_properties.len()
    }

    /// Is every table empty?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_entries() == 0
    }
}
