//! HTTP client for the broker management API.
//!
//! Provides [`ManagementClient`], the snapshot provider used when no input
//! file is given. All requests are blocking, share one agent with a global
//! timeout, and authenticate with HTTP basic auth.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use queue_plan_core::{QueueConfig, QueueDeclaration};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::settings::BrokerSettings;

// ─── Response types ───────────────────────────────────────────────────────────

/// Rate block inside `message_stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateDetails {
    #[serde(default)]
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageStats {
    #[serde(default)]
    pub publish_details: RateDetails,
    #[serde(default)]
    pub deliver_details: RateDetails,
}

/// Queue row as listed by `GET /api/queues`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSummary {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vhost: String,
    #[serde(rename = "type", default = "default_type")]
    pub queue_type: String,
    #[serde(default)]
    pub messages: u64,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default)]
    pub policy: Option<String>,
    #[serde(default)]
    pub arguments: BTreeMap<String, Value>,
    #[serde(default)]
    pub message_stats: MessageStats,
}

fn default_type() -> String {
    "classic".to_string()
}

fn default_state() -> String {
    "unknown".to_string()
}

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ManagementError {
    #[error("could not reach management API at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: ureq::Error,
    },
    #[error("management API returned {status} for {url}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },
    #[error("could not decode management API response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: ureq::Error,
    },
}

// ─── ManagementClient ─────────────────────────────────────────────────────────

pub struct ManagementClient {
    base_url: String,
    authorization: String,
    agent: ureq::Agent,
}

impl ManagementClient {
    pub fn new(settings: &BrokerSettings) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .http_status_as_error(false)
            .build();
        let credentials = format!("{}:{}", settings.username, settings.password);

        Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            authorization: format!("Basic {}", STANDARD.encode(credentials)),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    /// List queues, optionally restricted to one vhost.
    ///
    /// GET `/api/queues` or `/api/queues/{vhost}`
    pub fn list_queues(&self, vhost: Option<&str>) -> Result<Vec<QueueSummary>, ManagementError> {
        self.get_json(&self.queues_url(vhost))
    }

    /// Snapshot every queue, optionally restricted to one vhost.
    pub fn queue_configs(&self, vhost: Option<&str>) -> Result<Vec<QueueConfig>, ManagementError> {
        self.get_json(&self.queues_url(vhost))
    }

    /// Snapshot one queue.
    ///
    /// GET `/api/queues/{vhost}/{name}`
    pub fn queue_config(&self, vhost: &str, name: &str) -> Result<QueueConfig, ManagementError> {
        self.get_json(&self.queue_url(vhost, name))
    }

    /// Declare a queue.
    ///
    /// PUT `/api/queues/{vhost}/{name}`; the broker answers 201 on creation
    /// and 204 when an identical queue already exists.
    pub fn declare_queue(
        &self,
        vhost: &str,
        name: &str,
        declaration: &QueueDeclaration,
    ) -> Result<(), ManagementError> {
        let url = self.queue_url(vhost, name);
        info!(%url, "declaring queue");
        let response = self
            .agent
            .put(&url)
            .header("Authorization", &self.authorization)
            .send_json(declaration)
            .map_err(|source| ManagementError::Connect {
                url: url.clone(),
                source,
            })?;

        let status = response.status().as_u16();
        if status == 201 || status == 204 {
            return Ok(());
        }
        let body = response.into_body().read_to_string().unwrap_or_default();
        Err(status_error(url, status, body))
    }

    fn queues_url(&self, vhost: Option<&str>) -> String {
        match vhost {
            Some(vhost) => format!(
                "{}/api/queues/{}",
                self.base_url,
                encode_segment(&normalize_vhost(vhost))
            ),
            None => format!("{}/api/queues", self.base_url),
        }
    }

    fn queue_url(&self, vhost: &str, name: &str) -> String {
        format!(
            "{}/api/queues/{}/{}",
            self.base_url,
            encode_segment(&normalize_vhost(vhost)),
            encode_segment(name)
        )
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ManagementError> {
        debug!(%url, "GET");
        let response = self
            .agent
            .get(url)
            .header("Authorization", &self.authorization)
            .call()
            .map_err(|source| ManagementError::Connect {
                url: url.to_string(),
                source,
            })?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.into_body().read_to_string().unwrap_or_default();
            return Err(status_error(url.to_string(), status, body));
        }

        response
            .into_body()
            .read_json::<T>()
            .map_err(|source| ManagementError::Decode {
                url: url.to_string(),
                source,
            })
    }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn status_error(url: String, status: u16, body: String) -> ManagementError {
    let message = match status {
        401 => "unauthorized, check RABBITMQ_USER/RABBITMQ_PASS".to_string(),
        403 => "forbidden, the user lacks management permissions".to_string(),
        404 => "not found, check the vhost and queue name".to_string(),
        _ => reason_from_body(&body).unwrap_or(body),
    };
    ManagementError::Status {
        url,
        status,
        message,
    }
}

/// The management API reports failures as `{"error": .., "reason": ..}`.
fn reason_from_body(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("reason")
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

/// Map the URL-encoded default vhost operators often type back to `/`.
pub fn normalize_vhost(vhost: &str) -> String {
    if vhost.eq_ignore_ascii_case("%2f") {
        "/".to_string()
    } else {
        vhost.to_string()
    }
}

/// Percent-encode a single URL path segment.
pub fn encode_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ManagementClient {
        ManagementClient::new(&BrokerSettings {
            url: "http://mq:15672/".to_string(),
            ..BrokerSettings::default()
        })
    }

    #[test]
    fn default_vhost_is_encoded_once() {
        assert_eq!(
            client().queue_url("%2f", "orders"),
            "http://mq:15672/api/queues/%2F/orders"
        );
        assert_eq!(
            client().queues_url(Some("/")),
            "http://mq:15672/api/queues/%2F"
        );
        assert_eq!(client().queues_url(None), "http://mq:15672/api/queues");
    }

    #[test]
    fn encodes_reserved_characters_in_names() {
        assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
        assert_eq!(encode_segment("émoji"), "%C3%A9moji");
    }

    #[test]
    fn basic_auth_header_uses_credentials() {
        assert_eq!(client().authorization, "Basic Z3Vlc3Q6Z3Vlc3Q=");
    }

    #[test]
    fn status_errors_prefer_broker_reason() {
        let err = status_error(
            "u".to_string(),
            400,
            r#"{"error":"bad_request","reason":"inequivalent arg 'x-queue-type'"}"#.to_string(),
        );
        assert!(err.to_string().contains("inequivalent arg"));
        let err = status_error("u".to_string(), 404, String::new());
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn summaries_tolerate_sparse_records() {
        let raw = r#"[{"name":"q","vhost":"/","message_stats":{"publish_details":{"rate":1.5}}}]"#;
        let rows: Vec<QueueSummary> = serde_json::from_str(raw).expect("decode");
        assert_eq!(rows[0].state, "unknown");
        assert_eq!(rows[0].message_stats.publish_details.rate, 1.5);
        assert_eq!(rows[0].message_stats.deliver_details.rate, 0.0);
    }
}
