//! Broker connection settings.
//!
//! Settings are resolved once at startup from, in increasing priority:
//! built-in defaults, an optional TOML file, `RABBITMQ_*` environment
//! variables and command-line flags. The resolved value is handed to the
//! management client explicitly.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_URL: &str = "http://localhost:15672";
pub const DEFAULT_USERNAME: &str = "guest";
pub const DEFAULT_PASSWORD: &str = "guest";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

pub const ENV_HOST: &str = "RABBITMQ_HOST";
pub const ENV_USER: &str = "RABBITMQ_USER";
pub const ENV_PASS: &str = "RABBITMQ_PASS";
pub const ENV_TIMEOUT: &str = "RABBITMQ_TIMEOUT_SECS";

#[derive(Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    /// Management API base URL, without a trailing slash.
    pub url: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

impl fmt::Debug for BrokerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Values given on the command line; `None` leaves lower layers in place.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    url: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    timeout_secs: Option<u64>,
}

/// Errors returned while resolving broker settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid management URL '{0}': expected http:// or https://")]
    InvalidUrl(String),
    #[error("invalid timeout '{0}': expected a positive number of seconds")]
    InvalidTimeout(String),
}

/// Resolve settings from the process environment.
pub fn resolve_settings(
    file: Option<&Path>,
    overrides: &SettingsOverrides,
) -> Result<BrokerSettings, SettingsError> {
    resolve_settings_with_env(file, overrides, |key| std::env::var(key).ok())
}

/// Resolve settings with an explicit environment lookup.
pub fn resolve_settings_with_env<F>(
    file: Option<&Path>,
    overrides: &SettingsOverrides,
    env: F,
) -> Result<BrokerSettings, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = BrokerSettings::default();

    if let Some(path) = file {
        apply_file(&mut settings, load_settings_file(path)?);
    }

    if let Some(url) = env(ENV_HOST).filter(|v| !v.is_empty()) {
        settings.url = url;
    }
    if let Some(user) = env(ENV_USER) {
        settings.username = user;
    }
    if let Some(pass) = env(ENV_PASS) {
        settings.password = pass;
    }
    if let Some(raw) = env(ENV_TIMEOUT) {
        settings.timeout_secs = parse_timeout(&raw)?;
    }

    if let Some(url) = &overrides.url {
        settings.url = url.clone();
    }
    if let Some(user) = &overrides.username {
        settings.username = user.clone();
    }
    if let Some(pass) = &overrides.password {
        settings.password = pass.clone();
    }

    settings.url = normalize_url(&settings.url)?;
    if settings.timeout_secs == 0 {
        return Err(SettingsError::InvalidTimeout("0".to_string()));
    }
    Ok(settings)
}

fn load_settings_file(path: &Path) -> Result<SettingsFile, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| SettingsError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn apply_file(settings: &mut BrokerSettings, file: SettingsFile) {
    if let Some(url) = file.url {
        settings.url = url;
    } else if let Some(host) = file.host {
        let port = file.port.unwrap_or(15672);
        settings.url = if host.contains("://") {
            format!("{host}:{port}")
        } else {
            format!("http://{host}:{port}")
        };
    }
    if let Some(user) = file.username {
        settings.username = user;
    }
    if let Some(pass) = file.password {
        settings.password = pass;
    }
    if let Some(timeout) = file.timeout_secs {
        settings.timeout_secs = timeout;
    }
}

fn parse_timeout(raw: &str) -> Result<u64, SettingsError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(SettingsError::InvalidTimeout(raw.to_string())),
    }
}

fn normalize_url(raw: &str) -> Result<String, SettingsError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(SettingsError::InvalidUrl(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_any_source() {
        let settings =
            resolve_settings_with_env(None, &SettingsOverrides::default(), env_from(&[]))
                .expect("resolve");
        assert_eq!(settings, BrokerSettings::default());
    }

    #[test]
    fn layers_override_in_order() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broker.toml");
        fs::write(
            &path,
            "host = \"rabbit.internal\"\nport = 15671\nusername = \"ops\"\npassword = \"file\"\ntimeout_secs = 9\n",
        )
        .expect("write");

        let overrides = SettingsOverrides {
            password: Some("flag".to_string()),
            ..SettingsOverrides::default()
        };
        let settings = resolve_settings_with_env(
            Some(&path),
            &overrides,
            env_from(&[(ENV_USER, "env-user"), (ENV_PASS, "env-pass")]),
        )
        .expect("resolve");

        assert_eq!(settings.url, "http://rabbit.internal:15671");
        assert_eq!(settings.username, "env-user");
        assert_eq!(settings.password, "flag");
        assert_eq!(settings.timeout_secs, 9);
    }

    #[test]
    fn rejects_non_http_urls_and_bad_timeouts() {
        let overrides = SettingsOverrides {
            url: Some("amqp://localhost:5672".to_string()),
            ..SettingsOverrides::default()
        };
        assert!(matches!(
            resolve_settings_with_env(None, &overrides, env_from(&[])),
            Err(SettingsError::InvalidUrl(_))
        ));
        assert!(matches!(
            resolve_settings_with_env(
                None,
                &SettingsOverrides::default(),
                env_from(&[(ENV_TIMEOUT, "soon")])
            ),
            Err(SettingsError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let settings = resolve_settings_with_env(
            None,
            &SettingsOverrides::default(),
            env_from(&[(ENV_HOST, "https://mq.example.com/")]),
        )
        .expect("resolve");
        assert_eq!(settings.url, "https://mq.example.com");
    }

    #[test]
    fn debug_output_hides_password() {
        let rendered = format!("{:?}", BrokerSettings::default());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("password: \"guest\""));
    }
}
