use anyhow::{Context, Result};
use tracing::debug_span;

use osm_matcher_rules::MatchRules;

use crate::args::{GlobalArgs, RulesListArgs, RulesListOutputFormat};
use crate::reportable::{report_to, Reportable};
use crate::rule_loader::RuleLoader;

pub fn run(_global_args: &GlobalArgs, args: &RulesListArgs) -> Result<()> {
    let _span = debug_span!("cmd_rules_list").entered();

    let output = args
        .output_args
        .get_writer()
        .context("Failed to get output writer")?;

    let rules = RuleLoader::from_rule_specifiers(&args.rules)
        .load()
        .context("Failed to load rules")?;

    report_to(&RulesReporter { rules }, args.output_args.format, output)
}

struct RulesReporter {
    rules: MatchRules,
}

impl Reportable for RulesReporter {
    type Format = RulesListOutputFormat;

    fn report<W: std::io::Write>(&self, format: Self::Format, writer: W) -> Result<()> {
        match format {
            RulesListOutputFormat::Human => self.human_format(writer),
            RulesListOutputFormat::Json => self.json_format(writer),
        }
    }
}

impl RulesReporter {
    /// Each table's name and entries, in a fixed order.
    fn get_entries(&self) -> Vec<(&'static str, &[String])> {
        let r = &self.rules;
        vec![
            ("Primary name keys", r.name_keys.primary.as_slice()),
            ("Secondary name keys", r.name_keys.secondary.as_slice()),
            ("Secondary name key prefixes", r.name_keys.secondary_prefixes.as_slice()),
            ("Affix prefixes", r.affixes.prefixes.as_slice()),
            ("Affix suffixes", r.affixes.suffixes.as_slice()),
            ("Incompatible categories", r.incompatible_categories.as_slice()),
            ("Category keys", r.category_keys.as_slice()),
            ("Cross-reference keys", r.cross_reference_keys.as_slice()),
            ("Sitelink prefixes", r.sitelink_prefixes.as_slice()),
            ("Address properties", r.address_properties.as_slice()),
        ]
    }

    fn human_format<W: std::io::Write>(&self, mut writer: W) -> Result<()> {
        let table = self.rules_table();
        writeln!(writer)?;
        table.print(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn json_format<W: std::io::Write>(&self, mut writer: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, &self.rules)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    fn rules_table(&self) -> prettytable::Table {
        use prettytable::format::{FormatBuilder, LinePosition, LineSeparator};
        use prettytable::row;

        let f = FormatBuilder::new()
            .column_separator(' ')
            .separators(&[LinePosition::Title], LineSeparator::new('─', '─', '─', '─'))
            .padding(1, 1)
            .build();

        let mut table: prettytable::Table = self
            .get_entries()
            .into_iter()
            .map(|(name, entries)| row![l -> name, r -> entries.len(), l -> entries.join(", ")])
            .collect();
        table.set_format(f);
        table.set_titles(row![lb -> "Table", rb -> "Entries", lb -> "Values"]);
        table
    }
}
