use crate::plan::MigrationPlan;

/// Format one plan as pretty JSON.
pub fn format_plan_json(plan: &MigrationPlan) -> String {
    serde_json::to_string_pretty(plan).unwrap_or_else(|_| "{}".to_string())
}

/// Format several plans as a pretty JSON array.
pub fn format_plans_json(plans: &[&MigrationPlan]) -> String {
    serde_json::to_string_pretty(plans).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::plan_for;
    use crate::queue::QueueConfig;

    #[test]
    fn keys_appear_in_contract_order() {
        let plan = plan_for(&QueueConfig::new("q", "/")).expect("plan");
        let json = format_plan_json(&plan);
        let order = [
            "\"queue_name\"",
            "\"vhost\"",
            "\"current_type\"",
            "\"suggested_migrations\"",
            "\"blockers\"",
            "\"warnings\"",
            "\"original_settings\"",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|key| json.find(key).expect("key present"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
    }
}
