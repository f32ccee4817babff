use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use queue_migrate::report::{render_batch, render_plan};
use queue_plan_core::{
    analyze_batch, format_plan_json, format_plans_json, Analyzer, BatchSummary, MigrationPlan,
};
use tracing::info;

use crate::cli::{BrokerArgs, OutputFormat, PlanArgs};
use crate::{open_source, resolve_rules};

pub fn run_plan(args: PlanArgs, broker: &BrokerArgs) -> Result<()> {
    let (rules, rules_source) = resolve_rules(args.rules_file.as_deref(), args.strict)?;
    info!(rules = %rules_source, "loaded compatibility rules");
    let analyzer = Analyzer::new(rules);

    match &args.queue {
        Some(name) if !args.all => run_single(&args, name, &analyzer, broker),
        _ => run_all(&args, &analyzer, broker),
    }
}

fn run_single(
    args: &PlanArgs,
    name: &str,
    analyzer: &Analyzer,
    broker: &BrokerArgs,
) -> Result<()> {
    let vhost = args.vhost.as_deref().unwrap_or("/");
    let source = open_source(args.input.as_deref(), broker)?;
    let config = source
        .queue(vhost, name)
        .with_context(|| format!("failed to fetch queue '{name}' in vhost '{vhost}'"))?;
    let plan = analyzer
        .plan(&config)
        .with_context(|| format!("cannot analyse queue '{name}'"))?;

    match args.format {
        OutputFormat::Text => println!("{}", render_plan(&plan)),
        OutputFormat::Json => println!("{}", format_plan_json(&plan)),
    }

    if let Some(path) = &args.report {
        write_report(path, &[&plan])?;
    }

    if args.strict && plan.is_blocked() {
        bail!("strict mode failed: queue '{name}' has no viable migration target");
    }
    Ok(())
}

fn run_all(args: &PlanArgs, analyzer: &Analyzer, broker: &BrokerArgs) -> Result<()> {
    let source = open_source(args.input.as_deref(), broker)?;
    let configs = source
        .queues(args.vhost.as_deref())
        .context("failed to fetch queues")?;

    if configs.is_empty() {
        match args.format {
            OutputFormat::Text => println!("No queues found."),
            OutputFormat::Json => println!("[]"),
        }
        return Ok(());
    }

    let entries = analyze_batch(&configs, analyzer, args.workers);
    let summary = BatchSummary::from_entries(&entries);
    let plans: Vec<&MigrationPlan> = entries
        .iter()
        .filter_map(|entry| entry.result.as_ref().ok())
        .collect();

    match args.format {
        OutputFormat::Text => println!("{}", render_batch(&entries, &summary)),
        OutputFormat::Json => println!("{}", format_plans_json(&plans)),
    }

    if let Some(path) = &args.report {
        write_report(path, &plans)?;
    }

    if args.strict && (summary.blocked > 0 || summary.failed > 0) {
        bail!(
            "strict mode failed: {} blocked, {} not analysed",
            summary.blocked,
            summary.failed
        );
    }
    Ok(())
}

fn write_report(path: &Path, plans: &[&MigrationPlan]) -> Result<()> {
    fs::write(path, format_plans_json(plans))
        .with_context(|| format!("failed to write report file {}", path.display()))?;
    eprintln!("Report saved to {}", path.display());
    Ok(())
}
