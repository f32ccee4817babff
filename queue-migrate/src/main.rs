use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use queue_migrate::management::ManagementClient;
use queue_migrate::settings::{resolve_settings, BrokerSettings, SettingsOverrides};
use queue_migrate::snapshot::{SnapshotFile, SnapshotSource};
use queue_plan_core::{default_rule_table, load_rule_table, RuleTable};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod declare_cmd;
mod list_cmd;
mod plan_cmd;
mod rules_cmd;

use cli::{BrokerArgs, Cli, Command};

const LOG_ENV: &str = "QUEUE_MIGRATE_LOG";

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Command::List(args) => list_cmd::run_list(args, &cli.broker),
        Command::Plan(args) => plan_cmd::run_plan(args, &cli.broker),
        Command::Declare(args) => declare_cmd::run_declare(args, &cli.broker),
        Command::Rules(args) => rules_cmd::run_rules(args),
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).ok(),
        None => EnvFilter::try_from_env(LOG_ENV).ok(),
    }
    .unwrap_or_else(|| EnvFilter::new("warn"));

    // Tests may install a subscriber first.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Resolve broker settings. Only commands that contact the broker call this.
pub(crate) fn resolve_broker(args: &BrokerArgs) -> Result<BrokerSettings> {
    let overrides = SettingsOverrides {
        url: args.url.clone(),
        username: args.user.clone(),
        password: args.password.clone(),
    };
    let settings = resolve_settings(args.config.as_deref(), &overrides)
        .context("failed to resolve broker settings")?;
    debug!(?settings, "resolved broker settings");
    Ok(settings)
}

/// Snapshot file when `--input` is given, the live broker otherwise.
pub(crate) fn open_source(
    input: Option<&Path>,
    broker: &BrokerArgs,
) -> Result<Box<dyn SnapshotSource>> {
    match input {
        Some(path) => {
            let file = SnapshotFile::load(path)
                .with_context(|| format!("failed to load queue snapshot {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(ManagementClient::new(&resolve_broker(broker)?))),
    }
}

/// Load the rule table named by `--rules-file`, or the built-in one.
///
/// A rules file that cannot be loaded falls back to the built-in table with a
/// warning, or fails when `strict` is set. The returned string names the
/// table actually used.
pub(crate) fn resolve_rules(path: Option<&Path>, strict: bool) -> Result<(RuleTable, String)> {
    let Some(path) = path else {
        return Ok((default_rule_table(), "embedded".to_string()));
    };

    match load_rule_table(path) {
        Ok(table) => Ok((table, format!("file:{}", path.display()))),
        Err(err) if strict => {
            Err(anyhow::Error::new(err).context("strict mode failed: rules file not loaded"))
        }
        Err(err) => {
            debug!(path = %path.display(), error = %err, "using embedded rule table");
            eprintln!(
                "warning: failed to load rules from {} ({err}); using embedded defaults",
                path.display()
            );
            Ok((default_rule_table(), "embedded".to_string()))
        }
    }
}
