use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "queue-migrate")]
#[command(about = "Plan migrations of classic queues to quorum or stream queues")]
pub struct Cli {
    #[command(flatten)]
    pub broker: BrokerArgs,
    /// Log filter (for example `debug` or `queue_plan_core=debug`). Defaults to
    /// QUEUE_MIGRATE_LOG, then `warn`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct BrokerArgs {
    /// Broker settings TOML file (url or host/port, username, password, timeout_secs).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Management API base URL. Overrides RABBITMQ_HOST.
    #[arg(long, global = true)]
    pub url: Option<String>,
    /// Management API user. Overrides RABBITMQ_USER.
    #[arg(long, global = true)]
    pub user: Option<String>,
    /// Management API password. Overrides RABBITMQ_PASS.
    #[arg(long, global = true)]
    pub password: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// List queues with their type, depth and arguments.
    List(ListArgs),
    /// Analyse queues and print a migration plan.
    Plan(PlanArgs),
    /// Declare the replacement queue for a migration target.
    Declare(DeclareArgs),
    /// Show the active compatibility rule table.
    Rules(RulesArgs),
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only list queues in this vhost.
    #[arg(long)]
    pub vhost: Option<String>,
    /// Only list queues whose name contains this text.
    #[arg(long)]
    pub name: Option<String>,
    /// Read queue records from a JSON export instead of the broker.
    #[arg(long)]
    pub input: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct PlanArgs {
    /// Queue to analyse.
    #[arg(long, required_unless_present = "all", conflicts_with = "all")]
    pub queue: Option<String>,
    /// Analyse every queue (of --vhost, or of all vhosts).
    #[arg(long)]
    pub all: bool,
    /// Virtual host. Defaults to `/` for a single queue.
    #[arg(long)]
    pub vhost: Option<String>,
    /// Read queue records from a JSON export instead of the broker.
    #[arg(long)]
    pub input: Option<PathBuf>,
    /// Compatibility rule table TOML file. Defaults to the built-in table.
    #[arg(long)]
    pub rules_file: Option<PathBuf>,
    /// Worker threads for --all.
    #[arg(long, default_value_t = 4)]
    pub workers: usize,
    /// Also write the plans as a JSON array to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Fail on blocked or unanalysable queues and on an unreadable rules file.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Debug)]
pub struct DeclareArgs {
    /// Source queue to migrate.
    #[arg(long)]
    pub queue: String,
    /// Target queue type.
    #[arg(long, value_enum)]
    pub to: TargetArg,
    #[arg(long, default_value = "/")]
    pub vhost: String,
    /// Name of the new queue. Defaults to `<queue>-<target>`.
    #[arg(long = "as")]
    pub new_name: Option<String>,
    /// Read the source queue from a JSON export instead of the broker.
    #[arg(long)]
    pub input: Option<PathBuf>,
    /// Compatibility rule table TOML file. Defaults to the built-in table.
    #[arg(long)]
    pub rules_file: Option<PathBuf>,
    /// Declare even when the plan reports blockers for the target.
    #[arg(long)]
    pub force: bool,
    /// Print the declaration request instead of sending it.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Debug)]
pub struct RulesArgs {
    /// Compatibility rule table TOML file. Defaults to the built-in table.
    #[arg(long)]
    pub rules_file: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum TargetArg {
    Quorum,
    Stream,
}
