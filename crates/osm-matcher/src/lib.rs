pub mod address;
pub mod bad_match;
pub mod compiled_rules;
pub mod defaults;
pub mod distance;
pub mod error;
pub mod executor;
pub mod item;
pub mod matcher;
pub mod matcher_stats;
pub mod name_match;
pub mod pattern_cache;
pub mod planet;
pub mod planet_store;
pub mod query;
pub mod tag_filter;

pub use osm_matcher_rules;
