//! Feasibility analysis for queue type migrations.
//!
//! Given a snapshot of a queue's declared configuration, this crate decides
//! which replacement queue types (quorum, stream) are viable, what blocks a
//! migration outright and what would be lost on the way, and assembles a
//! ranked [`MigrationPlan`].
//!
//! All checks live in a declarative [`RuleTable`]; the [`Analyzer`] only
//! evaluates it. Nothing here performs I/O apart from loading a rule table
//! file on request.
//!
//! ```
//! use queue_plan_core::{plan_for, QueueConfig, TargetType};
//!
//! let config = QueueConfig::new("orders", "/").with_argument("x-max-priority", 10);
//! let plan = plan_for(&config).unwrap();
//! assert_eq!(plan.suggested_migrations, vec![TargetType::Quorum, TargetType::Stream]);
//! assert_eq!(plan.warnings.quorum.len(), 1);
//! ```

pub mod analyzer;
pub mod batch;
pub mod declaration;
pub mod format;
pub mod plan;
pub mod queue;
pub mod rules;

pub use analyzer::{analyze, candidate_targets, Analysis, Analyzer, TargetAssessment};
pub use batch::{analyze_batch, BatchEntry, BatchSummary};
pub use declaration::{build_declaration, QueueDeclaration};
pub use format::{format_batch_summary, format_plan_json, format_plan_text, format_plans_json};
pub use plan::{assemble_plan, plan_for, ByTarget, MigrationPlan};
pub use queue::{QueueConfig, QueueType, TargetType, ValidationError};
pub use rules::{
    default_rule_table, load_rule_table, parse_rule_table, CompatibilityRule, Finding, Predicate,
    QueueFlag, RuleTable, RuleTableError, Severity,
};
