use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::distance::Coordinate;
use crate::error::MatcherError;
use crate::name_match::{ItemName, NameSource};
use crate::tag_filter::TagFilter;

/// The claim property holding an item's coordinate location.
pub const COORDINATE_PROPERTY: &str = "P625";

// -------------------------------------------------------------------------------------------------
// Wikidata entity JSON
// -------------------------------------------------------------------------------------------------
/// The subset of a Wikidata entity document used for matching.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub claims: BTreeMap<String, Vec<Statement>>,

    #[serde(default)]
    pub labels: BTreeMap<String, LanguageValue>,

    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<LanguageValue>>,

    #[serde(default)]
    pub descriptions: BTreeMap<String, LanguageValue>,

    #[serde(default)]
    pub sitelinks: BTreeMap<String, Sitelink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LanguageValue {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sitelink {
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Statement {
    pub mainsnak: Snak,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Snak {
    /// Absent for `novalue` and `somevalue` snaks
    #[serde(default)]
    pub datavalue: Option<DataValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataValue {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: serde_json::Value,
}

// -------------------------------------------------------------------------------------------------
// ClaimValue
// -------------------------------------------------------------------------------------------------
/// A typed statement value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ClaimValue {
    /// A string or monolingual text
    Text(String),

    /// A reference to another entity, e.g., `Q30`
    Entity(String),

    Coordinate(Coordinate),

    /// Any other kind of value, kept as given
    Other(serde_json::Value),
}

impl From<DataValue> for ClaimValue {
    fn from(dv: DataValue) -> Self {
        let converted = match dv.kind.as_str() {
            "string" => dv.value.as_str().map(|s| ClaimValue::Text(s.to_owned())),
            "monolingualtext" => dv.value["text"].as_str().map(|s| ClaimValue::Text(s.to_owned())),
            "wikibase-entityid" => dv.value["id"].as_str().map(|s| ClaimValue::Entity(s.to_owned())),
            "globecoordinate" => match (dv.value["latitude"].as_f64(), dv.value["longitude"].as_f64()) {
                (Some(lat), Some(lon)) => Some(ClaimValue::Coordinate(Coordinate::new(lat, lon))),
                _ => None,
            },
            _ => None,
        };
        converted.unwrap_or(ClaimValue::Other(dv.value))
    }
}

// -------------------------------------------------------------------------------------------------
// Item
// -------------------------------------------------------------------------------------------------
/// A knowledge-base entity to be matched against planet features.
#[derive(Debug, Clone, Default)]
pub struct Item {
    /// The entity id, e.g., `Q4866042`; synthetic items may have none
    pub qid: Option<String>,

    pub claims: BTreeMap<String, Vec<ClaimValue>>,
    pub labels: BTreeMap<String, String>,
    pub aliases: BTreeMap<String, Vec<String>>,
    pub descriptions: BTreeMap<String, String>,
    pub sitelinks: BTreeMap<String, String>,

    /// What kind of OSM feature is expected
    pub tags: TagFilter,

    /// Free-text description, possibly HTML
    pub extract: Option<String>,

    /// Explicit coordinate; takes precedence over the coordinate claim
    pub location: Option<Coordinate>,
}

impl Item {
    /// Build an item from a Wikidata entity and the item's expected tags.
    pub fn from_entity<S: AsRef<str>>(entity: Entity, tags: &[S]) -> Result<Self, MatcherError> {
        let claims = entity
            .claims
            .into_iter()
            .map(|(property, statements)| {
                let values = statements
                    .into_iter()
                    .filter_map(|s| s.mainsnak.datavalue)
                    .map(ClaimValue::from)
                    .collect();
                (property, values)
            })
            .collect();

        Ok(Item {
            qid: entity.id,
            claims,
            labels: entity.labels.into_iter().map(|(k, v)| (k, v.value)).collect(),
            aliases: entity
                .aliases
                .into_iter()
                .map(|(k, vs)| (k, vs.into_iter().map(|v| v.value).collect()))
                .collect(),
            descriptions: entity.descriptions.into_iter().map(|(k, v)| (k, v.value)).collect(),
            sitelinks: entity.sitelinks.into_iter().map(|(k, v)| (k, v.title)).collect(),
            tags: TagFilter::new(tags)?,
            extract: None,
            location: None,
        })
    }

    pub fn with_extract<S: Into<String>>(mut self, extract: S) -> Self {
        self.extract = Some(extract.into());
        self
    }

    pub fn with_location(mut self, location: Coordinate) -> Self {
        self.location = Some(location);
        self
    }

    /// A label for diagnostics: the entity id when known.
    pub fn display_id(&self) -> &str {
        self.qid.as_deref().unwrap_or("<no id>")
    }

    /// The item's coordinate: the explicit location, else the first coordinate claim.
    pub fn coordinate(&self) -> Option<Coordinate> {
        self.location.or_else(|| {
            self.claims
                .get(COORDINATE_PROPERTY)?
                .iter()
                .find_map(|v| match v {
                    ClaimValue::Coordinate(c) => Some(*c),
                    _ => None,
                })
        })
    }

    /// The string values of the given claim property.
    pub fn claim_texts<'a>(&'a self, property: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.claims
            .get(property)
            .into_iter()
            .flatten()
            .filter_map(|v| match v {
                ClaimValue::Text(s) => Some(s.as_str()),
                _ => None,
            })
    }

    /// Every distinct name of the item, from labels, aliases and sitelink titles.
    ///
    /// Sitelink titles lose any of `sitelink_prefixes` and a trailing parenthetical, so
    /// `Category:Foo (building)` becomes `Foo`. Identical names are merged, keeping all
    /// their sources in order of first appearance.
    pub fn names(&self, sitelink_prefixes: &[String]) -> Vec<ItemName> {
        let labels = self
            .labels
            .iter()
            .map(|(lang, text)| (text.as_str(), NameSource::Label(lang.clone())));
        let aliases = self.aliases.iter().flat_map(|(lang, texts)| {
            texts
                .iter()
                .map(move |text| (text.as_str(), NameSource::Alias(lang.clone())))
        });
        let sitelinks = self.sitelinks.iter().map(|(site, title)| {
            (sitelink_name(title, sitelink_prefixes), NameSource::Sitelink(site.clone()))
        });

        let mut names: Vec<ItemName> = Vec::new();
        for (text, source) in labels.chain(aliases).chain(sitelinks) {
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            match names.iter_mut().find(|n| n.text == text) {
                Some(existing) => {
                    if !existing.sources.contains(&source) {
                        existing.sources.push(source);
                    }
                }
                None => names.push(ItemName {
                    text: text.to_owned(),
                    sources: vec![source],
                }),
            }
        }
        names
    }

    /// Text that may contain the item's postal address: the extract with markup removed,
    /// followed by the string values of `address_properties`.
    pub fn address_texts(&self, address_properties: &[String]) -> Vec<String> {
        let mut texts = Vec::new();
        if let Some(extract) = &self.extract {
            let text = strip_html(extract);
            if !text.trim().is_empty() {
                texts.push(text);
            }
        }
        for property in address_properties {
            texts.extend(self.claim_texts(property).map(|s| s.to_owned()));
        }
        texts
    }
}

fn sitelink_name<'a>(title: &'a str, prefixes: &[String]) -> &'a str {
    lazy_static! {
        static ref TRAILING_PARENTHETICAL: Regex = Regex::new(r"\s*\([^()]*\)\s*$")
            .expect("trailing parenthetical regex should compile");
    }

    let title = prefixes
        .iter()
        .find_map(|p| title.strip_prefix(p.as_str()))
        .unwrap_or(title);
    match TRAILING_PARENTHETICAL.find(title) {
        Some(m) if m.start() > 0 => &title[..m.start()],
        _ => title,
    }
}

/// Remove markup from an HTML fragment, decoding the handful of entities that appear in
/// article extracts.
pub fn strip_html(html: &str) -> String {
    lazy_static! {
        static ref TAG: Regex = Regex::new(r"<[^>]*>").expect("HTML tag regex should compile");
    }

    TAG.replace_all(html, " ")
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
