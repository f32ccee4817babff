use anyhow::{Context, Result};
use queue_migrate::report::render_queue_table;

use crate::cli::{BrokerArgs, ListArgs, OutputFormat};
use crate::open_source;

pub fn run_list(args: ListArgs, broker: &BrokerArgs) -> Result<()> {
    let source = open_source(args.input.as_deref(), broker)?;
    let mut rows = source
        .summaries(args.vhost.as_deref())
        .context("failed to list queues")?;

    if let Some(needle) = &args.name {
        rows.retain(|row| row.name.contains(needle.as_str()));
    }
    rows.sort_by(|a, b| a.vhost.cmp(&b.vhost).then_with(|| a.name.cmp(&b.name)));

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text if rows.is_empty() => println!("No queues found."),
        OutputFormat::Text => println!("{}", render_queue_table(&rows)),
    }
    Ok(())
}
