use anyhow::Result;
use queue_migrate::report::render_rule_table;

use crate::cli::{OutputFormat, RulesArgs};
use crate::resolve_rules;

pub fn run_rules(args: RulesArgs) -> Result<()> {
    let (table, source) = resolve_rules(args.rules_file.as_deref(), false)?;
    match args.format {
        OutputFormat::Text => println!("{}", render_rule_table(&table, &source)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&table)?),
    }
    Ok(())
}
