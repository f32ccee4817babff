//! Where queue snapshots come from: a live broker or a JSON export.

use std::fs;
use std::path::{Path, PathBuf};

use queue_plan_core::QueueConfig;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::management::{normalize_vhost, ManagementClient, ManagementError, QueueSummary};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Management(#[from] ManagementError),
    #[error("failed to read snapshot file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to decode snapshot file {path}: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },
    #[error("queue '{name}' not found in vhost '{vhost}'")]
    NotFound { vhost: String, name: String },
}

/// Provider of queue configuration snapshots.
pub trait SnapshotSource {
    /// Rows for the `list` command.
    fn summaries(&self, vhost: Option<&str>) -> Result<Vec<QueueSummary>, SnapshotError>;

    /// Every queue, optionally restricted to one vhost.
    fn queues(&self, vhost: Option<&str>) -> Result<Vec<QueueConfig>, SnapshotError>;

    /// One queue by vhost and name.
    fn queue(&self, vhost: &str, name: &str) -> Result<QueueConfig, SnapshotError>;
}

impl SnapshotSource for ManagementClient {
    fn summaries(&self, vhost: Option<&str>) -> Result<Vec<QueueSummary>, SnapshotError> {
        Ok(self.list_queues(vhost)?)
    }

    fn queues(&self, vhost: Option<&str>) -> Result<Vec<QueueConfig>, SnapshotError> {
        Ok(self.queue_configs(vhost)?)
    }

    fn queue(&self, vhost: &str, name: &str) -> Result<QueueConfig, SnapshotError> {
        match self.queue_config(vhost, name) {
            Err(ManagementError::Status { status: 404, .. }) => Err(SnapshotError::NotFound {
                vhost: normalize_vhost(vhost),
                name: name.to_string(),
            }),
            other => Ok(other?),
        }
    }
}

/// Queue records exported from the management API (`GET /api/queues`) and
/// saved to disk. Holds either one record or an array of them.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
    records: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Value>),
    One(Value),
}

impl SnapshotFile {
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let raw = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let parsed =
            serde_json::from_str::<OneOrMany>(&raw).map_err(|source| SnapshotError::Decode {
                path: path.display().to_string(),
                source,
            })?;
        let records = match parsed {
            OneOrMany::Many(records) => records,
            OneOrMany::One(record) => vec![record],
        };
        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    fn decode<T: DeserializeOwned>(&self, vhost: Option<&str>) -> Result<Vec<T>, SnapshotError> {
        let wanted = vhost.map(normalize_vhost);
        self.records
            .iter()
            .filter(|record| match &wanted {
                Some(wanted) => record_vhost(record).as_deref() == Some(wanted.as_str()),
                None => true,
            })
            .map(|record| {
                T::deserialize(record).map_err(|source| SnapshotError::Decode {
                    path: self.path.display().to_string(),
                    source,
                })
            })
            .collect()
    }
}

fn record_vhost(record: &Value) -> Option<String> {
    record.get("vhost").and_then(Value::as_str).map(normalize_vhost)
}

impl SnapshotSource for SnapshotFile {
    fn summaries(&self, vhost: Option<&str>) -> Result<Vec<QueueSummary>, SnapshotError> {
        self.decode(vhost)
    }

    fn queues(&self, vhost: Option<&str>) -> Result<Vec<QueueConfig>, SnapshotError> {
        self.decode(vhost)
    }

    fn queue(&self, vhost: &str, name: &str) -> Result<QueueConfig, SnapshotError> {
        self.decode::<QueueConfig>(Some(vhost))?
            .into_iter()
            .find(|config| config.name == name)
            .ok_or_else(|| SnapshotError::NotFound {
                vhost: normalize_vhost(vhost),
                name: name.to_string(),
            })
    }
}
