use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::dataset::Tools;
use crate::error::{EngineError, ErrorCode, Result};

#[cfg(test)]
mod tests;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_CREATE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(600);

/// Get the per-user configuration directory for scitrace
pub fn get_config_dir() -> Result<PathBuf> {
    ProjectDirs::from("org", "scitrace", "scitrace")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| EngineError::config("Could not determine home directory"))
}

/// Engine settings shared by every component.
///
/// Values come from, in increasing precedence: built-in defaults, a TOML file
/// (explicit path or `<config dir>/config.toml`), and `SCITRACE_*` variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub git_binary: String,
    pub datalad_binary: String,
    #[serde(with = "humantime_serde")]
    pub command_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub create_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
    /// Limit for provenance-tracked `datalad run` executions
    #[serde(with = "humantime_serde")]
    pub run_timeout: Duration,
    pub log_level: Option<String>,
    /// Directory names treated as stages in addition to the built-in catalog
    pub extra_stages: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            git_binary: "git".to_string(),
            datalad_binary: "datalad".to_string(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            create_timeout: DEFAULT_CREATE_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            run_timeout: DEFAULT_RUN_TIMEOUT,
            log_level: None,
            extra_stages: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Resolve the configuration for a run.
    ///
    /// An explicit path must exist. The default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(EngineError::config_with_code(
                        ErrorCode::CONFIG_NOT_FOUND,
                        format!("Configuration file not found: {}", path.display()),
                    ));
                }
                Self::from_file(path)?
            }
            None => match get_config_dir() {
                Ok(dir) if dir.join("config.toml").exists() => {
                    Self::from_file(&dir.join("config.toml"))?
                }
                _ => Self::default(),
            },
        };

        config.merge_env_vars()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| match e {
            EngineError::Config { code, message } => EngineError::Config {
                code,
                message: format!("{}: {message}", path.display()),
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| EngineError::config_with_code(ErrorCode::CONFIG_PARSE_ERROR, e.to_string()))
    }

    pub fn merge_env_vars(&mut self) -> Result<()> {
        self.merge_from(|key| std::env::var(key).ok())
    }

    /// Apply `SCITRACE_*` overrides read through `lookup`
    pub fn merge_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("SCITRACE_LOG_LEVEL") {
            self.log_level = Some(level);
        }

        if let Some(git) = lookup("SCITRACE_GIT") {
            self.git_binary = git;
        }

        if let Some(datalad) = lookup("SCITRACE_DATALAD") {
            self.datalad_binary = datalad;
        }

        if let Some(raw) = lookup("SCITRACE_COMMAND_TIMEOUT") {
            let seconds = raw.trim().parse::<u64>().map_err(|_| {
                EngineError::config_with_code(
                    ErrorCode::CONFIG_PARSE_ERROR,
                    format!("SCITRACE_COMMAND_TIMEOUT must be a number of seconds, got '{raw}'"),
                )
            })?;
            if seconds == 0 {
                return Err(EngineError::config(
                    "SCITRACE_COMMAND_TIMEOUT must be greater than zero",
                ));
            }
            self.command_timeout = Duration::from_secs(seconds);
        }

        Ok(())
    }

    pub fn tools(&self) -> Tools {
        Tools::new(&self.git_binary, &self.datalad_binary)
    }
}
