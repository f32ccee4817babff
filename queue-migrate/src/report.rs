use colored::Colorize;
use queue_plan_core::{
    format_batch_summary, format_plan_text, BatchEntry, BatchSummary, MigrationPlan, Predicate,
    RuleTable, Severity,
};

use crate::management::QueueSummary;

/// Render one plan for terminal output.
pub fn render_plan(plan: &MigrationPlan) -> String {
    let raw = format_plan_text(plan);
    let mut out = Vec::new();

    for line in raw.lines() {
        let colored = if line.starts_with("- [BLOCKER]") {
            line.red().to_string()
        } else if line.starts_with("- [WARNING]") {
            line.yellow().to_string()
        } else if plan.is_blocked() {
            line.bold().to_string()
        } else {
            line.green().to_string()
        };
        out.push(colored);
    }

    out.join("\n")
}

/// Render every plan of a batch followed by the summary line.
///
/// Queues that failed validation are listed as `skip` lines.
pub fn render_batch(entries: &[BatchEntry], summary: &BatchSummary) -> String {
    let mut out = Vec::new();
    for entry in entries {
        match &entry.result {
            Ok(plan) => out.push(render_plan(plan)),
            Err(err) => out.push(
                format!(
                    "skip queue={} vhost={} error={err}",
                    entry.queue_name, entry.vhost
                )
                .magenta()
                .to_string(),
            ),
        }
    }
    out.push(format_batch_summary(summary).cyan().to_string());
    out.join("\n\n")
}

/// Render the queue listing table.
pub fn render_queue_table(rows: &[QueueSummary]) -> String {
    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(format!(
        "{:<20}{:<24}{:<10}{:<10}{:<12}{:<14}{:<12}{:<12}{}",
        "VHost", "Queue Name", "Type", "Messages", "State", "Policy", "Publish/s", "Deliver/s",
        "Arguments"
    ));
    out.push("=".repeat(130));
    for row in rows {
        let arguments = serde_json::to_string(&row.arguments).unwrap_or_else(|_| "{}".to_string());
        out.push(format!(
            "{:<20}{:<24}{:<10}{:<10}{:<12}{:<14}{:<12.2}{:<12.2}{}",
            row.vhost,
            row.name,
            row.queue_type,
            row.messages,
            row.state,
            row.policy.as_deref().unwrap_or("None"),
            row.message_stats.publish_details.rate,
            row.message_stats.deliver_details.rate,
            arguments
        ));
    }
    out.join("\n")
}

/// Render the active rule table, one line per rule in evaluation order.
pub fn render_rule_table(table: &RuleTable, source: &str) -> String {
    let mut out = vec![format!("rules source={source} count={}", table.rules.len())];
    for rule in &table.rules {
        let kind = match rule.outcome {
            Severity::Blocker => "BLOCKER",
            Severity::Warning => "WARNING",
        };
        let targets = rule
            .targets
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(",");
        out.push(format!(
            "- [{kind}] {} targets={targets} when={}",
            rule.id,
            describe_predicate(&rule.when)
        ));
    }
    out.join("\n")
}

fn describe_predicate(predicate: &Predicate) -> String {
    match predicate {
        Predicate::Flag { field, equals } => format!("{}={equals}", field.as_str()),
        Predicate::ArgumentPresent { keys } => format!("argument in [{}]", keys.join(", ")),
        Predicate::ArgumentValue { key, values } => {
            format!("{key} in [{}]", values.join(", "))
        }
        Predicate::UnknownArgument => "unknown argument".to_string(),
    }
}
