use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, debug_span};

use osm_matcher::distance::Coordinate;
use osm_matcher::item::{Entity, Item};

use crate::util::Counted;

/// An item as written in an input file.
#[derive(Debug, Deserialize)]
pub struct ItemInput {
    /// A Wikidata entity document
    pub entity: Entity,

    /// Tag predicates describing what kind of OSM feature to expect
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub extract: Option<String>,

    #[serde(default)]
    pub location: Option<Coordinate>,
}

impl ItemInput {
    pub fn into_item(self) -> Result<Item> {
        let mut item = Item::from_entity(self.entity, &self.tags)?;
        if let Some(extract) = self.extract {
            item = item.with_extract(extract);
        }
        if let Some(location) = self.location {
            item = item.with_location(location);
        }
        Ok(item)
    }
}

/// Read the items from the given files, in order.
///
/// A `.jsonl` file holds one item per non-blank line; any other file holds one JSON item.
pub fn read_items<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Item>> {
    let mut items = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let _span = debug_span!("read_items", "{}", path.display()).entered();
        let file = File::open(path)
            .with_context(|| format!("Failed to open item file {}", path.display()))?;
        let reader = BufReader::new(file);

        let before = items.len();
        if path.extension().map_or(false, |e| e == "jsonl") {
            for (lineno, line) in reader.lines().enumerate() {
                let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
                if line.trim().is_empty() {
                    continue;
                }
                let input: ItemInput = serde_json::from_str(&line).with_context(|| {
                    format!("Failed to parse item at {}:{}", path.display(), lineno + 1)
                })?;
                let item = input.into_item().with_context(|| {
                    format!("Invalid item at {}:{}", path.display(), lineno + 1)
                })?;
                items.push(item);
            }
        } else {
            let input: ItemInput = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse item from {}", path.display()))?;
            let item = input
                .into_item()
                .with_context(|| format!("Invalid item in {}", path.display()))?;
            items.push(item);
        }
        debug!("Read {}", Counted::regular(items.len() - before, "item"));
    }
    Ok(items)
}
