//! Migration feasibility analysis.
//!
//! The analyzer is a pure function of a [`QueueConfig`]: it validates the
//! snapshot, picks the candidate targets (every target except the current
//! type), runs the rule table against each and ranks the targets that came
//! out without blockers.

use tracing::debug;

use crate::queue::{QueueConfig, QueueType, TargetType, ValidationError};
use crate::rules::{default_rule_table, Finding, RuleTable, Severity};

/// Blockers and warnings collected for one candidate target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAssessment {
    pub target: TargetType,
    pub blockers: Vec<String>,
    pub warnings: Vec<String>,
}

impl TargetAssessment {
    fn from_findings(target: TargetType, findings: Vec<Finding>) -> Self {
        let (blockers, warnings): (Vec<Finding>, Vec<Finding>) = findings
            .into_iter()
            .partition(|f| f.severity == Severity::Blocker);
        Self {
            target,
            blockers: blockers.into_iter().map(|f| f.reason).collect(),
            warnings: warnings.into_iter().map(|f| f.reason).collect(),
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.blockers.is_empty()
    }
}

/// Result of analysing one queue, before plan assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub current_type: QueueType,
    /// One entry per candidate, in preference order.
    pub assessments: Vec<TargetAssessment>,
    /// Feasible candidates, in preference order.
    pub suggested: Vec<TargetType>,
}

impl Analysis {
    pub fn assessment(&self, target: TargetType) -> Option<&TargetAssessment> {
        self.assessments.iter().find(|a| a.target == target)
    }
}

/// Runs a rule table against queue snapshots.
#[derive(Debug, Clone)]
pub struct Analyzer {
    rules: RuleTable,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(default_rule_table())
    }
}

impl Analyzer {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Analyse one queue snapshot.
    ///
    /// Fails only when the snapshot is malformed: empty name or vhost, or a
    /// current type that is not classic, quorum or stream.
    pub fn analyze(&self, config: &QueueConfig) -> Result<Analysis, ValidationError> {
        let current_type = config.validate()?;

        let assessments: Vec<TargetAssessment> = candidate_targets(current_type)
            .map(|target| {
                let findings = self.rules.evaluate(config, target);
                for finding in &findings {
                    debug!(
                        queue = %config.name,
                        vhost = %config.vhost,
                        target = %target,
                        rule = %finding.rule,
                        severity = ?finding.severity,
                        "rule matched"
                    );
                }
                TargetAssessment::from_findings(target, findings)
            })
            .collect();

        let suggested = assessments
            .iter()
            .filter(|a| a.is_feasible())
            .map(|a| a.target)
            .collect();

        Ok(Analysis {
            current_type,
            assessments,
            suggested,
        })
    }
}

/// Analyse with the built-in rule table.
pub fn analyze(config: &QueueConfig) -> Result<Analysis, ValidationError> {
    Analyzer::default().analyze(config)
}

/// Migration targets worth evaluating for a queue of `current` type.
pub fn candidate_targets(current: QueueType) -> impl Iterator<Item = TargetType> {
    TargetType::ALL
        .into_iter()
        .filter(move |target| target.queue_type() != current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_exclude_current_type() {
        let classic: Vec<_> = candidate_targets(QueueType::Classic).collect();
        assert_eq!(classic, vec![TargetType::Quorum, TargetType::Stream]);
        let quorum: Vec<_> = candidate_targets(QueueType::Quorum).collect();
        assert_eq!(quorum, vec![TargetType::Stream]);
        let stream: Vec<_> = candidate_targets(QueueType::Stream).collect();
        assert_eq!(stream, vec![TargetType::Quorum]);
    }

    #[test]
    fn auto_delete_blocks_stream_but_only_warns_for_quorum() {
        let mut config = QueueConfig::new("events", "/");
        config.auto_delete = true;

        let analysis = analyze(&config).expect("analyze");
        assert_eq!(analysis.suggested, vec![TargetType::Quorum]);
        let quorum = analysis.assessment(TargetType::Quorum).expect("quorum");
        assert!(quorum.blockers.is_empty());
        assert_eq!(quorum.warnings.len(), 1);
        let stream = analysis.assessment(TargetType::Stream).expect("stream");
        assert!(stream.blockers[0].contains("Auto-delete"));
    }

    #[test]
    fn blockers_follow_rule_table_order() {
        let mut config = QueueConfig::new("tmp", "/");
        config.exclusive = true;
        config.auto_delete = true;
        config.durable = false;

        let analysis = analyze(&config).expect("analyze");
        let stream = analysis.assessment(TargetType::Stream).expect("stream");
        assert_eq!(stream.blockers.len(), 3);
        assert!(stream.blockers[0].starts_with("Exclusive"));
        assert!(stream.blockers[1].starts_with("Auto-delete"));
        assert!(stream.blockers[2].starts_with("Non-durable"));
    }

    #[test]
    fn warnings_never_block() {
        let config = QueueConfig::new("jobs", "/")
            .with_argument("x-max-priority", 10)
            .with_argument("x-queue-mode", "lazy")
            .with_argument("ha-mode", "all");

        let analysis = analyze(&config).expect("analyze");
        assert_eq!(analysis.suggested, TargetType::ALL.to_vec());
        for assessment in &analysis.assessments {
            assert_eq!(assessment.warnings.len(), 3, "{:?}", assessment.warnings);
        }
    }

    #[test]
    fn custom_table_drives_evaluation() {
        let analyzer = Analyzer::new(RuleTable {
            ignored_arguments: Vec::new(),
            targets: Vec::new(),
            rules: Vec::new(),
        });
        let mut config = QueueConfig::new("q", "/");
        config.durable = false;
        let analysis = analyzer.analyze(&config).expect("analyze");
        assert_eq!(analysis.suggested.len(), 2);
    }
}
