//! Configuration resolution for drill-music
//!
//! **Priority:** command line > environment > TOML file > built-in defaults.
//!
//! Command-line flags and their environment variables are handled by clap in
//! `main.rs` and arrive here as [`CliOverrides`]; the TOML file is located
//! with [`drill_common::config::resolve_config_path`].

use drill_common::config::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bootstrap file name looked up in the config directories
pub const CONFIG_FILE_NAME: &str = "drill-music.toml";

/// Environment variable pointing at the bootstrap file
pub const CONFIG_ENV_VAR: &str = "DRILL_CONFIG";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Largest accepted upload (100 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Contents of `drill-music.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub analysis: AnalysisSettings,
}

/// `[analysis]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Allow the signal backend; `false` answers every request from file size
    #[serde(default = "default_backend_enabled")]
    pub backend_enabled: bool,

    /// Upper bound on one pipeline run
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Request body limit for uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            backend_enabled: default_backend_enabled(),
            timeout_seconds: default_timeout_seconds(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_backend_enabled() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

/// Values given on the command line or through their environment variables
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub disable_backend: bool,
    pub timeout_seconds: Option<u64>,
    pub max_upload_bytes: Option<usize>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub backend_enabled: bool,
    pub analysis_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::resolve(&CliOverrides::default(), TomlConfig::default())
    }
}

impl ServiceConfig {
    /// Merge command-line overrides over the TOML file over defaults
    pub fn resolve(cli: &CliOverrides, toml: TomlConfig) -> Self {
        let timeout_seconds = cli
            .timeout_seconds
            .unwrap_or(toml.analysis.timeout_seconds)
            .max(1);

        Self {
            host: cli
                .host
                .clone()
                .or(toml.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            log_level: cli.log_level.clone().unwrap_or(toml.logging.level),
            backend_enabled: !cli.disable_backend && toml.analysis.backend_enabled,
            analysis_timeout: Duration::from_secs(timeout_seconds),
            max_upload_bytes: cli
                .max_upload_bytes
                .unwrap_or(toml.analysis.max_upload_bytes),
        }
    }

    /// `host:port` for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8000);
        assert_eq!(config.log_level, "info");
        assert!(config.backend_enabled);
        assert_eq!(config.analysis_timeout, Duration::from_secs(120));
        assert_eq!(config.max_upload_bytes, 100 * 1024 * 1024);
        assert_eq!(config.bind_address(), "127.0.0.1:8000");
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let toml: TomlConfig = toml::from_str(
            r#"
port = 9100

[analysis]
backend_enabled = false
timeout_seconds = 30
"#,
        )
        .unwrap();

        let config = ServiceConfig::resolve(&CliOverrides::default(), toml);
        assert_eq!(config.port, 9100);
        assert_eq!(config.host, DEFAULT_HOST);
        assert!(!config.backend_enabled);
        assert_eq!(config.analysis_timeout, Duration::from_secs(30));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_cli_overrides_toml() {
        let toml = TomlConfig {
            host: Some("0.0.0.0".into()),
            port: Some(9100),
            ..Default::default()
        };
        let cli = CliOverrides {
            port: Some(9200),
            log_level: Some("debug".into()),
            disable_backend: true,
            timeout_seconds: Some(0),
            ..Default::default()
        };

        let config = ServiceConfig::resolve(&cli, toml);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9200);
        assert_eq!(config.log_level, "debug");
        assert!(!config.backend_enabled);
        // Zero timeout is clamped
        assert_eq!(config.analysis_timeout, Duration::from_secs(1));
    }
}
