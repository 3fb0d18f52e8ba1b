//! queueplan.toml configuration parser.
//!
//! ```toml
//! [remote]
//! url = "http://planner.local:8080/"
//! timeout = "10s"
//!
//! [host]
//! state_file = "/etc/queueplan/host.toml"
//!
//! [log]
//! filter = "info,queueplan_remote=debug"
//! json = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use queueplan_remote::DEFAULT_TIMEOUT;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub remote: RemoteConfig,
    pub host: HostConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base address of the planner. No planner is started when unset.
    pub url: Option<String>,
    /// Bound on a single network call, e.g. "10s" or "500ms".
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// TOML description of the queue and nodes. An empty host when unset.
    pub state_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub filter: Option<String>,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: DaemonConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.remote.timeout()?;
        Ok(config)
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> anyhow::Result<Duration> {
        match self.timeout.as_deref() {
            None => Ok(DEFAULT_TIMEOUT),
            Some(s) => parse_duration(s),
        }
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let parsed = if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    };

    match parsed {
        Some(d) if !d.is_zero() => Ok(d),
        Some(_) => bail!("duration must be positive: {s:?}"),
        None => bail!("invalid duration {s:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full() {
        let toml_str = r#"
[remote]
url = "http://planner:8080/app/"
timeout = "500ms"

[host]
state_file = "host.toml"

[log]
filter = "debug"
json = true
"#;
        let config: DaemonConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.remote.url.as_deref(), Some("http://planner:8080/app/"));
        assert_eq!(config.remote.timeout().unwrap(), Duration::from_millis(500));
        assert_eq!(config.host.state_file, Some(PathBuf::from("host.toml")));
        assert_eq!(config.log.filter.as_deref(), Some("debug"));
        assert!(config.log.json);
    }

    #[test]
    fn parse_empty_uses_defaults() {
        let config: DaemonConfig = toml::from_str("").unwrap();
        assert!(config.remote.url.is_none());
        assert_eq!(config.remote.timeout().unwrap(), DEFAULT_TIMEOUT);
        assert!(config.host.state_file.is_none());
        assert!(!config.log.json);
    }

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration(" 3 ").unwrap(), Duration::from_secs(3));
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn parse_duration_rejects_overflowing_minutes() {
        let err = parse_duration(&format!("{}m", u64::MAX)).unwrap_err();
        assert!(err.to_string().contains("invalid duration"));
    }

    #[test]
    fn from_file_rejects_bad_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queueplan.toml");
        std::fs::write(&path, "[remote]\ntimeout = \"fast\"\n").unwrap();

        let err = DaemonConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("invalid duration"));
    }

    #[test]
    fn from_file_reads_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queueplan.toml");
        std::fs::write(&path, "[remote]\nurl = \"http://planner/\"\ntimeout = \"2s\"\n").unwrap();

        let config = DaemonConfig::from_file(&path).unwrap();
        assert_eq!(config.remote.url.as_deref(), Some("http://planner/"));
        assert_eq!(config.remote.timeout().unwrap(), Duration::from_secs(2));
    }
}
