use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::{error, error_span, warn};

use osm_matcher::compiled_rules::CompiledRules;
use osm_matcher::name_match::normalize;
use osm_matcher::tag_filter::TagPredicate;
use osm_matcher_rules::MatchRules;

use crate::args::{GlobalArgs, RulesCheckArgs};
use crate::rule_loader::RuleLoader;
use crate::util::Counted;

pub fn run(_global_args: &GlobalArgs, args: &RulesCheckArgs) -> Result<()> {
    let _span = error_span!("cmd_rules_check").entered();

    let rules = RuleLoader::from_rule_specifiers(&args.rules)
        .load()
        .context("Failed to load rules")?;

    let stats = check_rules(&rules);
    let CheckStats { num_errors, num_warnings } = stats;

    // check that the tables can be prepared for matching
    if num_errors == 0 {
        CompiledRules::from_rules(rules.clone()).context("Failed to compile rules")?;
    }

    if num_warnings == 0 && num_errors == 0 {
        println!(
            "{}: no issues detected",
            Counted::regular(rules.num_entries(), "table entry")
        );
    } else {
        println!(
            "{}: {num_errors} errors and {num_warnings} warnings",
            Counted::regular(rules.num_entries(), "table entry")
        );
    }

    if num_errors != 0 {
        bail!("{}", Counted::regular(num_errors, "error"));
    }

    if num_warnings != 0 && args.warnings_as_errors {
        bail!(
            "{}; warnings being treated as errors",
            Counted::regular(num_warnings, "warning")
        );
    }

    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
struct CheckStats {
    num_warnings: usize,
    num_errors: usize,
}

fn check_rules(rules: &MatchRules) -> CheckStats {
    lazy_static! {
        static ref PROPERTY_ID: Regex =
            Regex::new(r"^P[1-9][0-9]*$").expect("property id pattern should compile");
    }

    let mut stats = CheckStats::default();

    // name keys
    {
        let _span = error_span!("name_keys").entered();
        if rules.name_keys.primary.is_empty() {
            error!("No primary name keys are configured");
            stats.num_errors += 1;
        }
        let primary: HashSet<&str> = rules.name_keys.primary.iter().map(String::as_str).collect();
        for key in rules.name_keys.secondary.iter() {
            if primary.contains(key.as_str()) {
                warn!("Name key {key:?} is both primary and secondary");
                stats.num_warnings += 1;
            }
        }
    }

    // affixes
    {
        let _span = error_span!("affixes").entered();
        let prefixes: HashSet<&str> = rules.affixes.prefixes.iter().map(String::as_str).collect();
        for affix in rules.affixes.prefixes.iter().chain(rules.affixes.suffixes.iter()) {
            if affix.trim().is_empty() {
                error!("Affix is empty");
                stats.num_errors += 1;
            } else if *affix != normalize(affix) {
                error!("Affix {affix:?} is not normalized: should be {:?}", normalize(affix));
                stats.num_errors += 1;
            }
        }
        for suffix in rules.affixes.suffixes.iter() {
            if prefixes.contains(suffix.as_str()) {
                warn!("Affix {suffix:?} is both a prefix and a suffix");
                stats.num_warnings += 1;
            }
        }
    }

    // incompatible categories
    {
        let _span = error_span!("incompatible_categories").entered();
        for predicate in rules.incompatible_categories.iter() {
            if let Err(e) = predicate.parse::<TagPredicate>() {
                error!("Failed to parse predicate: {e}");
                stats.num_errors += 1;
            }
        }
    }

    // plain key lists
    for (table, keys) in [
        ("category_keys", &rules.category_keys),
        ("cross_reference_keys", &rules.cross_reference_keys),
    ] {
        let _span = error_span!("table", "{table}").entered();
        if keys.is_empty() {
            warn!("No keys are configured");
            stats.num_warnings += 1;
        }
        for key in keys.iter() {
            if key.is_empty() || key.contains('=') {
                error!("Key {key:?} is not a plain tag key");
                stats.num_errors += 1;
            }
        }
    }

    // address properties
    {
        let _span = error_span!("address_properties").entered();
        for property in rules.address_properties.iter() {
            if !PROPERTY_ID.is_match(property) {
                error!("Address property {property:?} is not a property id like P969");
                stats.num_errors += 1;
            }
        }
    }

    stats
}

#[cfg(test)]
mod test {
    use super::*;
    use osm_matcher::defaults::get_default_rules;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_rules_have_no_issues() -> Result<()> {
        let rules = get_default_rules()?;
        assert_eq!(check_rules(&rules), CheckStats::default());
        Ok(())
    }

    #[test]
    fn problems_are_counted() -> Result<()> {
        let mut rules = get_default_rules()?;
        rules.affixes.suffixes.push("Inn ".into());
        rules.incompatible_categories.push("=parking".into());
        rules.address_properties.push("street".into());
        rules.name_keys.secondary.push("name".into());
        assert_eq!(check_rules(&rules), CheckStats { num_errors: 3, num_warnings: 1 });
        Ok(())
    }

    #[test]
    fn empty_rules() {
        let stats = check_rules(&MatchRules::new());
        assert_eq!(stats, CheckStats { num_errors: 1, num_warnings: 2 });
    }
}
