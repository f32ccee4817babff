use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised when a queue snapshot cannot be analysed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Queue name is empty or whitespace.
    #[error("queue name must not be empty")]
    EmptyName,
    /// Virtual host is empty.
    #[error("vhost of queue '{queue}' must not be empty")]
    EmptyVhost { queue: String },
    /// Reported queue type is not classic, quorum or stream.
    #[error("queue '{queue}' has unrecognized type '{value}'")]
    UnknownQueueType { queue: String, value: String },
}

/// Queue implementation types known to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueType {
    Classic,
    Quorum,
    Stream,
}

impl QueueType {
    pub fn as_str(self) -> &'static str {
        match self {
            QueueType::Classic => "classic",
            QueueType::Quorum => "quorum",
            QueueType::Stream => "stream",
        }
    }
}

impl Display for QueueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a queue type string that is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized queue type '{0}'")]
pub struct UnknownQueueType(pub String);

impl FromStr for QueueType {
    type Err = UnknownQueueType;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(QueueType::Classic),
            "quorum" => Ok(QueueType::Quorum),
            "stream" => Ok(QueueType::Stream),
            _ => Err(UnknownQueueType(raw.to_string())),
        }
    }
}

/// Queue types a classic (or other) queue can be migrated to.
///
/// Variant order is the operational preference order used when ranking
/// suggestions: quorum queues are the safer default replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Quorum,
    Stream,
}

impl TargetType {
    /// All targets in preference order.
    pub const ALL: [TargetType; 2] = [TargetType::Quorum, TargetType::Stream];

    pub fn as_str(self) -> &'static str {
        self.queue_type().as_str()
    }

    pub fn queue_type(self) -> QueueType {
        match self {
            TargetType::Quorum => QueueType::Quorum,
            TargetType::Stream => QueueType::Stream,
        }
    }
}

impl Display for TargetType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = UnknownQueueType;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.parse::<QueueType>()? {
            QueueType::Quorum => Ok(TargetType::Quorum),
            QueueType::Stream => Ok(TargetType::Stream),
            QueueType::Classic => Err(UnknownQueueType(raw.to_string())),
        }
    }
}

/// Snapshot of one queue's declared configuration at analysis time.
///
/// Deserialises straight from a management API queue record: unknown fields
/// are ignored and missing flags fall back to the broker's declaration
/// defaults. A missing name or vhost deserialises as empty and is rejected by
/// [`QueueConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default, alias = "queue_name")]
    pub name: String,
    #[serde(default)]
    pub vhost: String,
    /// Reported queue type, kept verbatim so unknown values surface as
    /// validation errors instead of failing deserialisation.
    #[serde(rename = "type", default = "default_queue_type")]
    pub queue_type: String,
    #[serde(default = "default_true")]
    pub durable: bool,
    #[serde(default)]
    pub exclusive: bool,
    #[serde(default)]
    pub auto_delete: bool,
    #[serde(default)]
    pub arguments: BTreeMap<String, Value>,
}

fn default_queue_type() -> String {
    QueueType::Classic.as_str().to_string()
}

fn default_true() -> bool {
    true
}

impl QueueConfig {
    /// Durable, non-exclusive classic queue with no arguments.
    pub fn new(name: impl Into<String>, vhost: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vhost: vhost.into(),
            queue_type: default_queue_type(),
            durable: true,
            exclusive: false,
            auto_delete: false,
            arguments: BTreeMap::new(),
        }
    }

    pub fn with_type(mut self, queue_type: impl Into<String>) -> Self {
        self.queue_type = queue_type.into();
        self
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Check structural validity and return the parsed current type.
    pub fn validate(&self) -> Result<QueueType, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.vhost.is_empty() {
            return Err(ValidationError::EmptyVhost {
                queue: self.name.clone(),
            });
        }
        self.queue_type
            .parse()
            .map_err(|_| ValidationError::UnknownQueueType {
                queue: self.name.clone(),
                value: self.queue_type.clone(),
            })
    }

    /// Render an argument value the way operators write it in policies.
    pub fn argument_text(&self, key: &str) -> Option<String> {
        self.arguments.get(key).map(value_text)
    }
}

pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
