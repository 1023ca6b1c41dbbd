mod rules;
mod tables;
mod util;

pub use rules::MatchRules;
pub use tables::{Affixes, NameKeys};
