//! Configuration file resolution and TOML bootstrap loading
//!
//! Services resolve their bootstrap file in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config directory (`~/.config/drill/<file>` on Linux)
//! 4. System config directory (`/etc/drill/<file>`, Linux only)
//!
//! A missing file is never fatal: loading yields built-in defaults and the
//! service reports it once logging is up. A file that exists but cannot be
//! read or parsed is a configuration error.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name used under the platform config directory
pub const CONFIG_DIR_NAME: &str = "drill";

/// Logging configuration shared by all services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter directive (trace, debug, info, warn, error)
    ///
    /// `RUST_LOG` overrides this when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Locate the bootstrap TOML file for a service
///
/// Returns `None` when no candidate exists; callers then fall back to
/// defaults. A path given explicitly on the command line or through the
/// environment is returned even if it does not exist, so that the loader can
/// report it.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config directory
    if let Some(user_config) = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(file_name)) {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    // Priority 4: System config directory
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load a TOML bootstrap file, falling back to `T::default()` when absent
pub fn load_toml_config<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path.filter(|p| p.exists()) else {
        return Ok(T::default());
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;

    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    Ok(config)
}
