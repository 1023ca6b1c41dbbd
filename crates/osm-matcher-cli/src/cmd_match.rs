use anyhow::{anyhow, bail, Context, Result};
use console::{Style, StyledObject};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};
use tracing::{debug_span, error, info};

use osm_matcher::distance::{display_distance, DistanceUnits};
use osm_matcher::matcher::{ItemMatch, Matcher};
use osm_matcher::matcher_stats::MatcherStats;
use osm_matcher::name_match::best_tier;
use osm_matcher::planet_store::PlanetStore;

use crate::args::{GlobalArgs, MatchArgs, MatchOutputFormat};
use crate::item_input::read_items;
use crate::reportable::{report_to, Reportable};
use crate::rule_loader::RuleLoader;
use crate::util::Counted;

pub fn run(global_args: &GlobalArgs, args: &MatchArgs) -> Result<()> {
    let _span = debug_span!("cmd_match").entered();

    let rules = RuleLoader::from_rule_specifiers(&args.rules)
        .compile()
        .context("Failed to load rules")?;
    let config = args.config_args.to_config();

    let planet_path = &args.planet_args.planet;
    {
        let store = PlanetStore::open(planet_path).with_context(|| {
            format!("Failed to open planet snapshot at {}", planet_path.display())
        })?;
        let prefixes = store.prefixes()?;
        if !prefixes.contains(&args.prefix) {
            bail!(
                "Planet snapshot at {} has no tables with prefix {:?}",
                planet_path.display(),
                args.prefix
            );
        }
    }

    let items = read_items(&args.item_args.inputs).context("Failed to read items")?;
    info!("Matching {}", Counted::regular(items.len(), "item"));

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.num_jobs)
        .thread_name(|idx| format!("Matcher {idx}"))
        .build_global()
        .context("Failed to configure Rayon")?;

    // -------------------------------------------------------------------------
    // match each item, with one snapshot connection and `Matcher` per worker
    // -------------------------------------------------------------------------
    let global_stats = Mutex::new(MatcherStats::default());
    let reports: Vec<ItemReport> = items
        .par_iter()
        .map_init(
            || {
                let store = PlanetStore::open(planet_path);
                let matcher = Matcher::new(&rules, &config, Some(&global_stats));
                (store, matcher)
            },
            |(store, matcher), item| {
                let id = item.display_id().to_owned();
                let result = match store {
                    Ok(store) => matcher
                        .find_item_matches(store, item, &args.prefix, args.debug)
                        .map_err(anyhow::Error::from),
                    Err(e) => Err(anyhow!("Failed to open planet snapshot: {e:#}")),
                };
                match result {
                    Ok(matches) => ItemReport { item: id, matches, error: None },
                    Err(e) => {
                        error!("Failed to match {id}: {e:#}");
                        ItemReport { item: id, matches: Vec::new(), error: Some(format!("{e:#}")) }
                    }
                }
            },
        )
        .collect();

    let stats = global_stats
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    info!(
        "Matched {}: {} queries, {}, {} scored, {} rejected, {} found",
        Counted::regular(stats.items_seen as usize, "item"),
        stats.queries_run,
        Counted::regular(stats.rows_seen as usize, "row"),
        stats.candidates_scored,
        stats.candidates_rejected,
        stats.matches_found,
    );

    // -------------------------------------------------------------------------
    // report
    // -------------------------------------------------------------------------
    let num_failed = reports.iter().filter(|r| r.error.is_some()).count();

    let styles_enabled =
        args.output_args.output.is_none() && global_args.use_color(std::io::stdout());
    let reporter = MatchReporter {
        reports,
        units: args.units.into(),
        styles: Styles::new(styles_enabled),
    };
    let output = args
        .output_args
        .get_writer()
        .context("Failed to get output writer")?;
    report_to(&reporter, args.output_args.format, output)?;

    if num_failed > 0 {
        bail!("Failed to match {}", Counted::regular(num_failed, "item"));
    }
    Ok(())
}

// -----------------------------------------------------------------------------
// reporting
// -----------------------------------------------------------------------------
/// The outcome of matching one item.
#[derive(Serialize)]
struct ItemReport {
    item: String,
    matches: Vec<ItemMatch>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

struct Styles {
    style_item: Style,
    style_heading: Style,
    style_name: Style,
    style_metadata: Style,
    style_error: Style,
}

impl Styles {
    fn new(styles_enabled: bool) -> Self {
        Self {
            style_item: Style::new().bold().bright().white().force_styling(styles_enabled),
            style_heading: Style::new().bold().force_styling(styles_enabled),
            style_name: Style::new().yellow().force_styling(styles_enabled),
            style_metadata: Style::new().bright().blue().force_styling(styles_enabled),
            style_error: Style::new().bold().red().force_styling(styles_enabled),
        }
    }
}

struct MatchReporter {
    reports: Vec<ItemReport>,
    units: DistanceUnits,
    styles: Styles,
}

impl Reportable for MatchReporter {
    type Format = MatchOutputFormat;

    fn report<W: std::io::Write>(&self, format: Self::Format, writer: W) -> Result<()> {
        match format {
            MatchOutputFormat::Human => self.human_format(writer),
            MatchOutputFormat::Json => self.json_format(writer),
            MatchOutputFormat::Jsonl => self.jsonl_format(writer),
        }
    }
}

impl MatchReporter {
    fn style_item<D>(&self, val: D) -> StyledObject<D> {
        self.styles.style_item.apply_to(val)
    }

    fn style_heading<D>(&self, val: D) -> StyledObject<D> {
        self.styles.style_heading.apply_to(val)
    }

    fn style_name<D>(&self, val: D) -> StyledObject<D> {
        self.styles.style_name.apply_to(val)
    }

    fn style_metadata<D>(&self, val: D) -> StyledObject<D> {
        self.styles.style_metadata.apply_to(val)
    }

    fn style_error<D>(&self, val: D) -> StyledObject<D> {
        self.styles.style_error.apply_to(val)
    }

    fn human_format<W: std::io::Write>(&self, mut writer: W) -> Result<()> {
        for (i, report) in self.reports.iter().enumerate() {
            if i > 0 {
                writeln!(writer)?;
            }
            if let Some(e) = &report.error {
                writeln!(writer, "{} {}", self.style_item(&report.item), self.style_error(e))?;
                continue;
            }
            writeln!(
                writer,
                "{} ({})",
                self.style_item(&report.item),
                Counted::regular(report.matches.len(), "candidate")
            )?;
            for m in report.matches.iter() {
                self.write_match(&mut writer, m)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    fn write_match<W: std::io::Write>(&self, mut writer: W, m: &ItemMatch) -> Result<()> {
        writeln!(
            writer,
            "    {} {} {} {}",
            self.style_metadata(format!("{}/{}", m.osm_type, m.osm_id)),
            self.style_name(m.name.as_deref().unwrap_or("<unnamed>")),
            self.style_heading("at"),
            display_distance(self.units, m.dist),
        )?;

        let mut evidence = Vec::new();
        if m.identifier_match {
            evidence.push("identifier".to_owned());
        }
        match m.address_match {
            Some(true) => evidence.push("address".to_owned()),
            Some(false) => evidence.push("address mismatch".to_owned()),
            None => {}
        }
        for (key, matches) in m.name_match.iter() {
            if let Some(tier) = best_tier(matches) {
                evidence.push(format!("{key}:{}", tier.as_str()));
            }
        }
        if !m.matching_tags.is_empty() {
            let keys: Vec<&str> = m.matching_tags.iter().map(String::as_str).collect();
            evidence.push(format!("tags {}", keys.join(",")));
        }
        writeln!(writer, "        {} {}", self.style_heading("Evidence:"), evidence.join("; "))?;

        if let Some(debug) = &m.debug {
            let found_by: Vec<&str> = debug.found_by.iter().map(|k| k.label()).collect();
            writeln!(
                writer,
                "        {} found by {}; satisfied [{}]; conflicts [{}]; building only: {}",
                self.style_heading("Debug:"),
                found_by.join(","),
                debug.satisfied_predicates.join(", "),
                debug.category_conflicts.join(", "),
                debug.building_only,
            )?;
        }
        Ok(())
    }

    fn json_format<W: std::io::Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, &self.reports)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    fn jsonl_format<W: std::io::Write>(&self, mut writer: W) -> Result<()> {
        for report in self.reports.iter() {
            serde_json::to_writer(&mut writer, report)?;
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }
}
