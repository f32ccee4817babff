use crate::batch::BatchSummary;
use crate::plan::MigrationPlan;

/// Format a plan as plain text, one line per blocker and warning.
pub fn format_plan_text(plan: &MigrationPlan) -> String {
    let suggested = if plan.suggested_migrations.is_empty() {
        "none".to_string()
    } else {
        plan.suggested_migrations
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(",")
    };

    let mut lines = vec![format!(
        "plan queue={} vhost={} current_type={} suggested={suggested}",
        plan.queue_name, plan.vhost, plan.current_type
    )];
    for (target, reasons) in plan.blockers.iter() {
        for reason in reasons {
            lines.push(format!("- [BLOCKER] {target}: {reason}"));
        }
    }
    for (target, reasons) in plan.warnings.iter() {
        for reason in reasons {
            lines.push(format!("- [WARNING] {target}: {reason}"));
        }
    }
    lines.join("\n")
}

/// Format batch counts as a single line.
pub fn format_batch_summary(summary: &BatchSummary) -> String {
    format!(
        "summary analysed={} failed={} migratable={} blocked={} warnings={}",
        summary.analysed, summary.failed, summary.migratable, summary.blocked, summary.warnings
    )
}
