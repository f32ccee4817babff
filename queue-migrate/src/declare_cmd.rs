use anyhow::{bail, Context, Result};
use queue_migrate::management::{normalize_vhost, ManagementClient};
use queue_plan_core::{build_declaration, Analyzer, TargetType};
use serde_json::json;

use crate::cli::{BrokerArgs, DeclareArgs, TargetArg};
use crate::{open_source, resolve_broker, resolve_rules};

pub fn run_declare(args: DeclareArgs, broker: &BrokerArgs) -> Result<()> {
    let target = target_type(args.to);
    let vhost = normalize_vhost(&args.vhost);
    let (rules, _) = resolve_rules(args.rules_file.as_deref(), false)?;
    let analyzer = Analyzer::new(rules);

    let source = open_source(args.input.as_deref(), broker)?;
    let config = source
        .queue(&vhost, &args.queue)
        .with_context(|| format!("failed to fetch queue '{}' in vhost '{vhost}'", args.queue))?;
    let plan = analyzer
        .plan(&config)
        .with_context(|| format!("cannot analyse queue '{}'", args.queue))?;

    if plan.current_type == target.queue_type() {
        bail!("queue '{}' is already a {target} queue", args.queue);
    }
    let blockers = plan.blockers.get(target);
    if !blockers.is_empty() && !args.force {
        bail!(
            "migration of '{}' to {target} is blocked: {} (use --force to declare anyway)",
            args.queue,
            blockers.join("; ")
        );
    }
    for warning in plan.warnings.get(target) {
        eprintln!("warning: {warning}");
    }

    let new_name = args
        .new_name
        .clone()
        .unwrap_or_else(|| format!("{}-{target}", args.queue));
    if new_name == args.queue {
        bail!("new queue name must differ from the source queue '{}'", args.queue);
    }

    let declaration = build_declaration(&config, target, analyzer.rules());

    if args.dry_run {
        let request = json!({
            "vhost": vhost,
            "name": new_name,
            "body": declaration,
        });
        println!("{}", serde_json::to_string_pretty(&request)?);
        return Ok(());
    }

    let settings = resolve_broker(broker)?;
    ManagementClient::new(&settings)
        .declare_queue(&vhost, &new_name, &declaration)
        .with_context(|| format!("failed to declare queue '{new_name}'"))?;
    println!("declared {target} queue '{new_name}' in vhost '{vhost}'");
    Ok(())
}

fn target_type(arg: TargetArg) -> TargetType {
    match arg {
        TargetArg::Quorum => TargetType::Quorum,
        TargetArg::Stream => TargetType::Stream,
    }
}
