use anyhow::{Context, Result};
use std::io::Write;
use tracing::debug_span;

use osm_matcher::query::{build_queries, item_match_sql};

use crate::args::{GlobalArgs, SqlArgs};
use crate::item_input::read_items;

pub fn run(_global_args: &GlobalArgs, args: &SqlArgs) -> Result<()> {
    let _span = debug_span!("cmd_sql").entered();

    let items = read_items(&args.item_args.inputs).context("Failed to read items")?;
    let config = args.config_args.to_config();

    let mut writer = std::io::BufWriter::new(std::io::stdout().lock());
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            writeln!(writer)?;
        }
        let id = item.display_id();
        if args.all {
            let location = item
                .coordinate()
                .with_context(|| format!("Item {id} has no location"))?;
            let queries = build_queries(&item.tags, location, &args.prefix, &config)
                .with_context(|| format!("Failed to build queries for {id}"))?;
            for query in queries {
                writeln!(writer, "-- {id} ({})", query.label())?;
                writeln!(writer, "{};", query.to_sql())?;
            }
        } else {
            let sql = item_match_sql(item, &args.prefix, &config)
                .with_context(|| format!("Failed to build query for {id}"))?;
            writeln!(writer, "-- {id}")?;
            writeln!(writer, "{sql};")?;
        }
    }
    writer.flush()?;
    Ok(())
}
