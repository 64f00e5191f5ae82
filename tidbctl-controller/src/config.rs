//! Configuration management for tidbctl
//!
//! Settings are resolved from:
//! 1. Environment variables (highest priority)
//! 2. Configuration file (TOML format)
//! 3. Default values (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tidbctl_common::MemberRole;
use tokio::sync::Semaphore;

/// Main configuration struct for tidbctl
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ControllerConfig {
    /// Member health probe configuration
    pub probe: ProbeConfig,
    /// PD client configuration
    pub pd: PdConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Member health probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// URL scheme used for status requests
    pub scheme: String,
    /// Per-probe client timeout in seconds
    pub timeout_secs: u64,
    /// Upper bound on probes in flight for one report
    pub max_concurrent: usize,
    /// Status endpoint of TiDB members
    pub tidb: StatusEndpoint,
    /// Status endpoint of TiKV members
    pub tikv: StatusEndpoint,
    /// Health endpoint of PD members
    pub pd: StatusEndpoint,
}

/// Port and path of a member's status endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusEndpoint {
    pub port: u16,
    pub path: String,
}

/// PD client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdConfig {
    /// URL scheme used for the PD API
    pub scheme: String,
    /// PD client port
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Directory for rolling log files; console only when unset
    pub log_dir: Option<PathBuf>,
    /// Emit JSON on the console
    pub json: bool,
}

impl StatusEndpoint {
    /// Well-known status endpoint of each role
    pub fn default_for(role: MemberRole) -> Self {
        let (port, path) = match role {
            MemberRole::Pd => (2379, "pd/api/v1/health"),
            MemberRole::Tikv => (20180, "status"),
            MemberRole::Tidb => (10080, "status"),
        };
        Self {
            port,
            path: path.to_string(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            timeout_secs: 5,
            max_concurrent: 16,
            tidb: StatusEndpoint::default_for(MemberRole::Tidb),
            tikv: StatusEndpoint::default_for(MemberRole::Tikv),
            pd: StatusEndpoint::default_for(MemberRole::Pd),
        }
    }
}

impl Default for PdConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            port: 2379,
            timeout_secs: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            json: false,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Status endpoint for a member role
    pub fn endpoint(&self, role: MemberRole) -> &StatusEndpoint {
        match role {
            MemberRole::Pd => &self.pd,
            MemberRole::Tikv => &self.tikv,
            MemberRole::Tidb => &self.tidb,
        }
    }
}

impl PdConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.clone(), e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            std::env::var("TIDBCTL_CONFIG").ok().map(PathBuf::from),
            Some(PathBuf::from("/etc/tidbctl/config.toml")),
            Some(PathBuf::from("./tidbctl.toml")),
        ];

        paths.into_iter().flatten().find(|p| p.exists())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Probe
        if let Some(secs) = var("TIDBCTL_PROBE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.probe.timeout_secs = secs;
        }
        if let Some(max) = var("TIDBCTL_PROBE_MAX_CONCURRENT").and_then(|v| v.parse().ok()) {
            self.probe.max_concurrent = max;
        }

        // PD
        if let Some(secs) = var("TIDBCTL_PD_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.pd.timeout_secs = secs;
        }

        // Logging
        if let Some(level) = var("TIDBCTL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(dir) = var("TIDBCTL_LOG_DIR") {
            self.logging.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(json) = var("TIDBCTL_LOG_JSON") {
            self.logging.json = json.parse().unwrap_or(false);
        }
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "probe timeout must be at least one second".to_string(),
            ));
        }
        if self.probe.max_concurrent == 0 {
            return Err(ConfigError::Validation(
                "probe max_concurrent cannot be 0".to_string(),
            ));
        }
        if self.probe.max_concurrent > Semaphore::MAX_PERMITS {
            return Err(ConfigError::Validation(format!(
                "probe max_concurrent cannot exceed {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if self.pd.port == 0 {
            return Err(ConfigError::Validation("PD port cannot be 0".to_string()));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file {0:?}: {1}")]
    FileRead(PathBuf, String),
    /// Failed to parse configuration
    #[error("Failed to parse config: {0}")]
    Parse(String),
    /// Configuration validation failed
    #[error("Config validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.probe.timeout(), Duration::from_secs(5));
        assert_eq!(config.probe.endpoint(MemberRole::Tidb).port, 10080);
        assert_eq!(config.probe.endpoint(MemberRole::Tidb).path, "status");
        assert_eq!(config.pd.port, 2379);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ControllerConfig::default();
        config.probe.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.probe.max_concurrent = 0;
        assert!(config.validate().is_err());

        let mut config = ControllerConfig::default();
        config.probe.max_concurrent = usize::MAX;
        assert!(config.validate().is_err());

        config.probe.max_concurrent = Semaphore::MAX_PERMITS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[probe]\ntimeout_secs = 2\n\n[probe.tidb]\nport = 4000\npath = \"status\"").unwrap();

        let config = ControllerConfig::load_from_file(&file.path().to_path_buf()).unwrap();
        assert_eq!(config.probe.timeout_secs, 2);
        assert_eq!(config.probe.tidb.port, 4000);
        assert_eq!(config.probe.max_concurrent, 16);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[probe\ntimeout_secs = ").unwrap();

        let err = ControllerConfig::load_from_file(&file.path().to_path_buf()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TIDBCTL_PROBE_TIMEOUT_SECS", "9"),
            ("TIDBCTL_PROBE_MAX_CONCURRENT", "not-a-number"),
            ("TIDBCTL_LOG_DIR", "/var/log/tidbctl"),
        ]
        .into_iter()
        .collect();

        let mut config = ControllerConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.probe.timeout_secs, 9);
        assert_eq!(config.probe.max_concurrent, 16);
        assert_eq!(config.logging.log_dir, Some(PathBuf::from("/var/log/tidbctl")));
    }

    #[test]
    fn test_generate_sample_config() {
        let sample = ControllerConfig::generate_sample();
        assert!(sample.contains("[probe]"));
        assert!(sample.contains("[probe.tidb]"));
        assert!(sample.contains("[pd]"));
        assert!(sample.contains("[logging]"));
    }
}
