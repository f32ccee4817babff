use serde::{Deserialize, Serialize};

use crate::analyzer::{Analysis, Analyzer};
use crate::queue::{QueueConfig, QueueType, TargetType, ValidationError};

/// Reasons keyed by target type. Both keys are always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByTarget {
    pub quorum: Vec<String>,
    pub stream: Vec<String>,
}

impl ByTarget {
    pub fn get(&self, target: TargetType) -> &[String] {
        match target {
            TargetType::Quorum => &self.quorum,
            TargetType::Stream => &self.stream,
        }
    }

    fn set(&mut self, target: TargetType, reasons: Vec<String>) {
        match target {
            TargetType::Quorum => self.quorum = reasons,
            TargetType::Stream => self.stream = reasons,
        }
    }

    /// Iterate targets and their reasons in preference order.
    pub fn iter(&self) -> impl Iterator<Item = (TargetType, &[String])> {
        TargetType::ALL.into_iter().map(move |t| (t, self.get(t)))
    }

    pub fn total(&self) -> usize {
        self.quorum.len() + self.stream.len()
    }
}

/// Migration plan for one queue. Field order is the JSON contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub queue_name: String,
    pub vhost: String,
    pub current_type: QueueType,
    pub suggested_migrations: Vec<TargetType>,
    pub blockers: ByTarget,
    pub warnings: ByTarget,
    pub original_settings: QueueConfig,
}

impl MigrationPlan {
    /// No candidate target is viable.
    pub fn is_blocked(&self) -> bool {
        self.suggested_migrations.is_empty()
    }

    pub fn has_blockers(&self) -> bool {
        self.blockers.total() > 0
    }

    pub fn blocker_count(&self) -> usize {
        self.blockers.total()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.total()
    }

    pub fn is_suggested(&self, target: TargetType) -> bool {
        self.suggested_migrations.contains(&target)
    }
}

/// Wrap an analysis and its untouched input into a [`MigrationPlan`].
pub fn assemble_plan(config: &QueueConfig, analysis: Analysis) -> MigrationPlan {
    let mut blockers = ByTarget::default();
    let mut warnings = ByTarget::default();
    for assessment in analysis.assessments {
        blockers.set(assessment.target, assessment.blockers);
        warnings.set(assessment.target, assessment.warnings);
    }

    MigrationPlan {
        queue_name: config.name.clone(),
        vhost: config.vhost.clone(),
        current_type: analysis.current_type,
        suggested_migrations: analysis.suggested,
        blockers,
        warnings,
        original_settings: config.clone(),
    }
}

impl Analyzer {
    /// Analyse `config` and assemble its plan.
    pub fn plan(&self, config: &QueueConfig) -> Result<MigrationPlan, ValidationError> {
        let analysis = self.analyze(config)?;
        Ok(assemble_plan(config, analysis))
    }
}

/// Analyse with the built-in rule table and assemble the plan.
pub fn plan_for(config: &QueueConfig) -> Result<MigrationPlan, ValidationError> {
    Analyzer::default().plan(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_candidate_target_has_empty_entries() {
        let config = QueueConfig::new("ledger", "/").with_type("stream");
        let plan = plan_for(&config).expect("plan");
        assert_eq!(plan.suggested_migrations, vec![TargetType::Quorum]);
        assert!(plan.blockers.stream.is_empty());
        assert!(plan.warnings.stream.is_empty());
        assert!(!plan.is_suggested(TargetType::Stream));
    }

    #[test]
    fn counts_span_both_targets() {
        let mut config = QueueConfig::new("q", "/").with_argument("x-max-priority", 5);
        config.durable = false;
        let plan = plan_for(&config).expect("plan");
        assert!(plan.is_blocked());
        assert!(plan.has_blockers());
        assert_eq!(plan.blocker_count(), 2);
        assert_eq!(plan.warning_count(), 2);
    }

    #[test]
    fn original_settings_are_verbatim() {
        let config = QueueConfig::new("q", "sales")
            .with_argument("x-message-ttl", 60000)
            .with_argument("x-dead-letter-exchange", "dlx");
        let plan = plan_for(&config).expect("plan");
        assert_eq!(plan.original_settings, config);
        assert_eq!(plan.vhost, "sales");
    }
}
