//! Request bodies for declaring the replacement queue.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

use crate::queue::{QueueConfig, TargetType};
use crate::rules::RuleTable;

/// Argument carrying the queue type in a declaration.
pub const QUEUE_TYPE_ARGUMENT: &str = "x-queue-type";

/// Body of a management API queue declaration (`PUT /api/queues/{vhost}/{name}`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueDeclaration {
    pub durable: bool,
    pub auto_delete: bool,
    pub arguments: BTreeMap<String, Value>,
}

/// Build the declaration for migrating `config` to `target`.
///
/// Arguments flagged by the rule table for `target` are dropped, the queue
/// type argument is set and target defaults are filled in where the source
/// did not declare them.
pub fn build_declaration(
    config: &QueueConfig,
    target: TargetType,
    rules: &RuleTable,
) -> QueueDeclaration {
    let flagged = rules.flagged_arguments(config, target);
    let mut arguments: BTreeMap<String, Value> = config
        .arguments
        .iter()
        .filter(|(key, _)| !flagged.contains(key.as_str()) && key.as_str() != QUEUE_TYPE_ARGUMENT)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    arguments.insert(QUEUE_TYPE_ARGUMENT.to_string(), json!(target.as_str()));
    for (key, value) in target_defaults(target) {
        arguments.entry(key.to_string()).or_insert(value);
    }

    QueueDeclaration {
        durable: true,
        auto_delete: false,
        arguments,
    }
}

fn target_defaults(target: TargetType) -> Vec<(&'static str, Value)> {
    match target {
        TargetType::Quorum => vec![
            ("x-quorum-initial-group-size", json!(3)),
            ("x-queue-leader-locator", json!("client-local")),
        ],
        TargetType::Stream => vec![
            ("x-stream-max-segment-size-bytes", json!(10_485_760)),
            ("x-max-age", json!("1D")),
        ],
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::rules::default_rule_table;

    #[test]
    fn quorum_declaration_drops_flagged_arguments() {
        let config = QueueConfig::new("orders", "/")
            .with_argument("x-queue-type", "classic")
            .with_argument("x-max-priority", 10)
            .with_argument("x-message-ttl", 60000)
            .with_argument("x-quorum-initial-group-size", 5);

        let decl = build_declaration(&config, TargetType::Quorum, &default_rule_table());
        let keys: Vec<&str> = decl.arguments.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "x-message-ttl",
                "x-queue-leader-locator",
                "x-queue-type",
                "x-quorum-initial-group-size",
            ]
        );
        assert_eq!(decl.arguments["x-quorum-initial-group-size"], json!(5));
        assert_eq!(decl.arguments["x-queue-type"], json!("quorum"));
        assert!(decl.durable);
    }

    #[test]
    fn stream_declaration_sets_retention_defaults() {
        let config = QueueConfig::new("audit", "/")
            .with_argument("x-message-ttl", 60000)
            .with_argument("x-max-length-bytes", 1_000_000);

        let decl = build_declaration(&config, TargetType::Stream, &default_rule_table());
        assert!(!decl.arguments.contains_key("x-message-ttl"));
        assert_eq!(decl.arguments["x-max-length-bytes"], json!(1_000_000));
        assert_eq!(decl.arguments["x-max-age"], json!("1D"));
        assert_eq!(decl.arguments["x-queue-type"], json!("stream"));
    }
}
