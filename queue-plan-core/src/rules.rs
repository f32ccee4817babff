//! Declarative compatibility rules.
//!
//! Every check the analyzer performs is a [`CompatibilityRule`] entry in a
//! [`RuleTable`]: a predicate over the queue snapshot, the targets it applies
//! to, the outcome kind and a reason template. The evaluation loop never
//! changes when a broker feature is added; only the table does.
//!
//! The default table is embedded from `rules/compatibility.toml`. Operators
//! can supply their own file with the same layout.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::{value_text, QueueConfig, TargetType};

/// Whether a matching rule disqualifies the target or only loses behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Blocker,
    Warning,
}

/// Boolean queue properties a rule can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueFlag {
    Durable,
    Exclusive,
    AutoDelete,
}

impl QueueFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            QueueFlag::Durable => "durable",
            QueueFlag::Exclusive => "exclusive",
            QueueFlag::AutoDelete => "auto_delete",
        }
    }

    fn read(self, config: &QueueConfig) -> bool {
        match self {
            QueueFlag::Durable => config.durable,
            QueueFlag::Exclusive => config.exclusive,
            QueueFlag::AutoDelete => config.auto_delete,
        }
    }
}

/// Condition under which a rule fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// A queue flag has the given value.
    Flag { field: QueueFlag, equals: bool },
    /// Any of the listed argument keys is declared. Fires once per key.
    ArgumentPresent { keys: Vec<String> },
    /// The argument is declared with one of the listed values.
    ArgumentValue { key: String, values: Vec<String> },
    /// The argument key is not known for the target. Fires once per key.
    UnknownArgument,
}

impl Predicate {
    fn named_keys(&self) -> Vec<&str> {
        match self {
            Predicate::ArgumentPresent { keys } => keys.iter().map(String::as_str).collect(),
            Predicate::ArgumentValue { key, .. } => vec![key.as_str()],
            Predicate::Flag { .. } | Predicate::UnknownArgument => Vec::new(),
        }
    }
}

/// A named predicate over a queue snapshot and a candidate target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityRule {
    pub id: String,
    pub targets: Vec<TargetType>,
    pub outcome: Severity,
    pub when: Predicate,
    /// Reason template; `{target}`, `{key}` and `{value}` are substituted.
    pub reason: String,
}

/// One rule outcome for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub rule: String,
    pub severity: Severity,
    pub reason: String,
}

impl CompatibilityRule {
    pub fn applies_to(&self, target: TargetType) -> bool {
        self.targets.contains(&target)
    }

    /// Evaluate the rule. An empty result means "ok".
    pub fn evaluate(
        &self,
        config: &QueueConfig,
        target: TargetType,
        known: &BTreeSet<String>,
    ) -> Vec<Finding> {
        if !self.applies_to(target) {
            return Vec::new();
        }

        match &self.when {
            Predicate::Flag { field, equals } => {
                if field.read(config) == *equals {
                    vec![self.finding(target, "", "")]
                } else {
                    Vec::new()
                }
            }
            Predicate::ArgumentPresent { keys } => keys
                .iter()
                .filter_map(|key| {
                    config
                        .arguments
                        .get(key)
                        .map(|value| self.finding(target, key, &value_text(value)))
                })
                .collect(),
            Predicate::ArgumentValue { key, values } => match config.argument_text(key) {
                Some(value) if values.iter().any(|v| v.eq_ignore_ascii_case(&value)) => {
                    vec![self.finding(target, key, &value)]
                }
                _ => Vec::new(),
            },
            Predicate::UnknownArgument => config
                .arguments
                .iter()
                .filter(|(key, _)| !known.contains(key.as_str()))
                .map(|(key, value)| self.finding(target, key, &value_text(value)))
                .collect(),
        }
    }

    fn finding(&self, target: TargetType, key: &str, value: &str) -> Finding {
        Finding {
            rule: self.id.clone(),
            severity: self.outcome,
            reason: self
                .reason
                .replace("{target}", target.as_str())
                .replace("{key}", key)
                .replace("{value}", value),
        }
    }
}

/// Arguments a target type honours natively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetProfile {
    pub name: TargetType,
    #[serde(default)]
    pub supported_arguments: Vec<String>,
}

/// Ordered set of compatibility rules plus the argument vocabulary per target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    /// Keys every target tolerates silently (for example `x-queue-type`).
    #[serde(default)]
    pub ignored_arguments: Vec<String>,
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetProfile>,
    #[serde(rename = "rule")]
    pub rules: Vec<CompatibilityRule>,
}

/// Errors returned when loading a rule table.
#[derive(Debug, Error)]
pub enum RuleTableError {
    #[error("failed to read rule table {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse rule table {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid rule table {path}: {reason}")]
    Invalid { path: String, reason: String },
}

impl RuleTable {
    /// Rules applicable to `target`, in evaluation order.
    pub fn rules_for(&self, target: TargetType) -> impl Iterator<Item = &CompatibilityRule> {
        self.rules.iter().filter(move |rule| rule.applies_to(target))
    }

    pub fn find_rule(&self, id: &str) -> Option<&CompatibilityRule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    /// Argument keys that do not count as unknown for `target`.
    pub fn known_arguments(&self, target: TargetType) -> BTreeSet<String> {
        let mut known: BTreeSet<String> = self.ignored_arguments.iter().cloned().collect();
        for profile in self.targets.iter().filter(|p| p.name == target) {
            known.extend(profile.supported_arguments.iter().cloned());
        }
        for rule in self.rules_for(target) {
            known.extend(rule.when.named_keys().into_iter().map(ToOwned::to_owned));
        }
        known
    }

    /// Run every applicable rule against `config` in table order.
    pub fn evaluate(&self, config: &QueueConfig, target: TargetType) -> Vec<Finding> {
        let known = self.known_arguments(target);
        self.rules_for(target)
            .flat_map(|rule| rule.evaluate(config, target, &known))
            .collect()
    }

    /// Argument keys of `config` that an argument rule flags for `target`.
    ///
    /// Unknown keys are not included; they are carried over as declared.
    pub fn flagged_arguments(&self, config: &QueueConfig, target: TargetType) -> BTreeSet<String> {
        let known = self.known_arguments(target);
        self.rules_for(target)
            .filter(|rule| !rule.when.named_keys().is_empty())
            .filter(|rule| !rule.evaluate(config, target, &known).is_empty())
            .flat_map(|rule| rule.when.named_keys())
            .filter(|key| config.arguments.contains_key(*key))
            .map(ToOwned::to_owned)
            .collect()
    }

    fn check(self, path: &str) -> Result<Self, RuleTableError> {
        let invalid = |reason: String| RuleTableError::Invalid {
            path: path.to_string(),
            reason,
        };
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                return Err(invalid("rule with empty id".to_string()));
            }
            if rule.targets.is_empty() {
                return Err(invalid(format!("rule '{}' has no targets", rule.id)));
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(invalid(format!("duplicate rule id '{}'", rule.id)));
            }
        }
        Ok(self)
    }
}

/// Load a rule table from a TOML file.
pub fn load_rule_table(path: &Path) -> Result<RuleTable, RuleTableError> {
    let raw = fs::read_to_string(path).map_err(|source| RuleTableError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_rule_table(&raw, path.display().to_string())
}

/// Parse a rule table from TOML text. `path` names the source in errors.
pub fn parse_rule_table(raw: &str, path: String) -> Result<RuleTable, RuleTableError> {
    let table: RuleTable = toml::from_str(raw).map_err(|source| RuleTableError::Parse {
        path: path.clone(),
        source,
    })?;
    table.check(&path)
}

/// Built-in rule table.
pub fn default_rule_table() -> RuleTable {
    let embedded = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/rules/compatibility.toml"
    ));
    match parse_rule_table(embedded, "embedded rule table".to_string()) {
        Ok(table) if !table.rules.is_empty() => table,
        _ => fallback_rule_table(),
    }
}

fn fallback_rule_table() -> RuleTable {
    const BOTH: &[TargetType] = &[TargetType::Quorum, TargetType::Stream];

    RuleTable {
        ignored_arguments: strings(&["x-queue-type"]),
        targets: vec![
            TargetProfile {
                name: TargetType::Quorum,
                supported_arguments: strings(&[
                    "x-expires",
                    "x-message-ttl",
                    "x-max-length",
                    "x-max-length-bytes",
                    "x-overflow",
                    "x-dead-letter-exchange",
                    "x-dead-letter-routing-key",
                    "x-dead-letter-strategy",
                    "x-delivery-limit",
                    "x-single-active-consumer",
                    "x-quorum-initial-group-size",
                    "x-quorum-target-group-size",
                    "x-queue-leader-locator",
                    "x-consumer-timeout",
                    "delivery-limit",
                    "dead-letter-strategy",
                    "queue-initial-cluster-size",
                    "leader-locator",
                ]),
            },
            TargetProfile {
                name: TargetType::Stream,
                supported_arguments: strings(&[
                    "x-max-length-bytes",
                    "x-max-age",
                    "x-stream-max-segment-size-bytes",
                    "x-stream-filter-size-bytes",
                    "x-initial-cluster-size",
                    "x-queue-leader-locator",
                    "queue-initial-cluster-size",
                    "leader-locator",
                    "max-time-retention",
                ]),
            },
        ],
        rules: vec![
            rule(
                "exclusive-queue",
                BOTH,
                Severity::Blocker,
                Predicate::Flag {
                    field: QueueFlag::Exclusive,
                    equals: true,
                },
                "Exclusive queues are tied to their owning connection and cannot be migrated to {target}.",
            ),
            rule(
                "auto-delete-stream",
                &[TargetType::Stream],
                Severity::Blocker,
                Predicate::Flag {
                    field: QueueFlag::AutoDelete,
                    equals: true,
                },
                "Auto-delete queues cannot be migrated to stream; streams are append-only logs.",
            ),
            rule(
                "auto-delete-quorum",
                &[TargetType::Quorum],
                Severity::Warning,
                Predicate::Flag {
                    field: QueueFlag::AutoDelete,
                    equals: true,
                },
                "Auto-delete behaviour will be lost after migration to quorum; the queue must be deleted explicitly.",
            ),
            rule(
                "non-durable",
                BOTH,
                Severity::Blocker,
                Predicate::Flag {
                    field: QueueFlag::Durable,
                    equals: false,
                },
                "Non-durable queues cannot be migrated to {target}; {target} queues are always durable.",
            ),
            rule(
                "priority",
                BOTH,
                Severity::Warning,
                present(&["x-max-priority"]),
                "Setting '{key}' will be lost after migration to {target}; message priorities are not supported.",
            ),
            rule(
                "lazy-mode",
                BOTH,
                Severity::Warning,
                value("x-queue-mode", &["lazy"]),
                "Argument '{key}={value}' is not compatible with {target} queues and will be dropped.",
            ),
            rule(
                "ha-policy",
                BOTH,
                Severity::Warning,
                present(&[
                    "ha-mode",
                    "ha-params",
                    "ha-sync-mode",
                    "ha-promote-on-shutdown",
                    "ha-promote-on-failure",
                    "master-locator",
                    "x-queue-master-locator",
                ]),
                "Mirroring setting '{key}' has no effect on {target} queues; replication is built in.",
            ),
            rule(
                "classic-version",
                BOTH,
                Severity::Warning,
                present(&["x-queue-version"]),
                "Queues with '{key}' are not supported for {target} queues; the setting will be dropped.",
            ),
            rule(
                "reject-publish-dlx",
                &[TargetType::Quorum],
                Severity::Warning,
                value("x-overflow", &["reject-publish-dlx"]),
                "Argument '{key}={value}' is not compatible with quorum queues; overflow falls back to drop-head.",
            ),
            rule(
                "stream-message-knobs",
                &[TargetType::Stream],
                Severity::Warning,
                present(&[
                    "x-message-ttl",
                    "x-expires",
                    "x-dead-letter-exchange",
                    "x-dead-letter-routing-key",
                    "x-dead-letter-strategy",
                    "x-max-length",
                    "x-overflow",
                    "x-single-active-consumer",
                    "x-delivery-limit",
                ]),
                "Setting '{key}' will be lost after migration to stream; streams do not expire, dead-letter or cap individual messages.",
            ),
            rule(
                "unknown-argument",
                BOTH,
                Severity::Warning,
                Predicate::UnknownArgument,
                "Argument '{key}' is not recognized for {target} queues; verify its behaviour manually.",
            ),
        ],
    }
}

fn rule(
    id: &str,
    targets: &[TargetType],
    outcome: Severity,
    when: Predicate,
    reason: &str,
) -> CompatibilityRule {
    CompatibilityRule {
        id: id.to_string(),
        targets: targets.to_vec(),
        outcome,
        when,
        reason: reason.to_string(),
    }
}

fn present(keys: &[&str]) -> Predicate {
    Predicate::ArgumentPresent {
        keys: strings(keys),
    }
}

fn value(key: &str, values: &[&str]) -> Predicate {
    Predicate::ArgumentValue {
        key: key.to_string(),
        values: strings(values),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
