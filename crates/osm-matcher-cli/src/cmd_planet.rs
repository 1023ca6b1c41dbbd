use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::{debug_span, info};

use osm_matcher::planet::{OsmElement, PlanetTable};
use osm_matcher::planet_store::PlanetStore;

use crate::args::{
    GlobalArgs, PlanetArgs, PlanetImportArgs, PlanetSummarizeArgs, SummarizeOutputFormat,
};
use crate::reportable::{report_to, Reportable};
use crate::util::Counted;

pub fn run(global_args: &GlobalArgs, args: &PlanetArgs) -> Result<()> {
    use crate::args::PlanetCommand::*;
    match &args.command {
        Import(args) => cmd_planet_import(global_args, args),
        Summarize(args) => cmd_planet_summarize(global_args, args),
    }
}

fn cmd_planet_import(global_args: &GlobalArgs, args: &PlanetImportArgs) -> Result<()> {
    let _span = debug_span!("cmd_planet_import").entered();

    let path = &args.planet_args.planet;
    let mut store = PlanetStore::create_or_open(path)
        .with_context(|| format!("Failed to open planet snapshot at {}", path.display()))?;

    let mut num_imported = 0;
    for input in args.inputs.iter() {
        let file = File::open(input)
            .with_context(|| format!("Failed to open {}", input.display()))?;
        let mut elements = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read {}", input.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            let element: OsmElement = serde_json::from_str(&line).with_context(|| {
                format!("Failed to parse OSM element at {}:{}", input.display(), lineno + 1)
            })?;
            elements.push(element);
        }

        let n = store
            .import_elements(&args.prefix, elements)
            .with_context(|| format!("Failed to import elements from {}", input.display()))?;
        info!("Imported {} from {}", Counted::regular(n as usize, "element"), input.display());
        num_imported += n;
    }

    if !global_args.quiet {
        println!(
            "Imported {} into the {} tables of {}",
            Counted::regular(num_imported as usize, "element"),
            args.prefix,
            path.display()
        );
    }
    Ok(())
}

fn cmd_planet_summarize(_global_args: &GlobalArgs, args: &PlanetSummarizeArgs) -> Result<()> {
    let _span = debug_span!("cmd_planet_summarize").entered();

    let path = &args.planet_args.planet;
    let store = PlanetStore::open(path)
        .with_context(|| format!("Failed to open planet snapshot at {}", path.display()))?;

    let mut entries = Vec::new();
    for prefix in store.prefixes()? {
        for (table, rows) in store.table_counts(&prefix)? {
            entries.push(SummaryEntry { prefix: prefix.clone(), table, rows });
        }
    }

    let output = args
        .output_args
        .get_writer()
        .context("Failed to get output writer")?;
    report_to(&PlanetSummary { entries }, args.output_args.format, output)
}

#[derive(Serialize)]
struct SummaryEntry {
    prefix: String,
    table: PlanetTable,
    rows: u64,
}

struct PlanetSummary {
    entries: Vec<SummaryEntry>,
}

impl Reportable for PlanetSummary {
    type Format = SummarizeOutputFormat;

    fn report<W: std::io::Write>(&self, format: Self::Format, mut writer: W) -> Result<()> {
        match format {
            SummarizeOutputFormat::Human => {
                writeln!(writer)?;
                self.table().print(&mut writer)?;
            }
            SummarizeOutputFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, &self.entries)?;
                writeln!(writer)?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

impl PlanetSummary {
    fn table(&self) -> prettytable::Table {
        use prettytable::format::{FormatBuilder, LinePosition, LineSeparator};
        use prettytable::row;

        let f = FormatBuilder::new()
            .column_separator(' ')
            .separators(&[LinePosition::Title], LineSeparator::new('─', '─', '─', '─'))
            .padding(1, 1)
            .build();

        let mut table: prettytable::Table = self
            .entries
            .iter()
            .map(|e| row![l -> &e.prefix, l -> e.table.table_name(&e.prefix), r -> e.rows])
            .collect();
        table.set_format(f);
        table.set_titles(row![lb -> "Prefix", lb -> "Table", rb -> "Rows"]);
        table
    }
}
