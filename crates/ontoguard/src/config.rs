use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{RootError, RootResult};

/// Environment variable naming an alternate config file location.
pub const CONFIG_ENV_VAR: &str = "ONTOGUARD_CONFIG";

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Top-level configuration for the OntoGuard binary.
///
/// Loaded from a TOML file (typically `~/.ontoguard/config.toml`, or
/// wherever `ONTOGUARD_CONFIG` points).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OntoGuardConfig {
    /// Path to the policy ontology file.
    #[serde(default = "default_ontology_path")]
    pub ontology_path: PathBuf,

    /// Log level for the tracing subscriber.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_ontology_path() -> PathBuf {
    dirs_or_default(".ontoguard/policies.ttl")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Returns `$HOME/<suffix>` if HOME is available, otherwise `./<suffix>`.
fn dirs_or_default(suffix: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(suffix))
        .unwrap_or_else(|_| PathBuf::from(suffix))
}

impl Default for OntoGuardConfig {
    fn default() -> Self {
        Self {
            ontology_path: default_ontology_path(),
            log_level: default_log_level(),
        }
    }
}

impl OntoGuardConfig {
    /// Load configuration from a TOML file. If the file does not exist,
    /// returns a default configuration.
    pub fn load(path: &Path) -> RootResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(RootError::Io)?;
        let config: OntoGuardConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the path named by `ONTOGUARD_CONFIG`, or
    /// from the default location when the variable is unset.
    pub fn load_from_env() -> RootResult<Self> {
        let path = std::env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_config_path());
        Self::load(&path)
    }

    /// Write the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> RootResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RootError::Config(format!("TOML serialize error: {}", e)))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(RootError::Io)?;
        }
        std::fs::write(path, contents).map_err(RootError::Io)?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> RootResult<()> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(RootError::Config(format!(
                "log_level must be one of {:?}, got '{}'",
                LOG_LEVELS, self.log_level
            )));
        }
        if self.ontology_path.as_os_str().is_empty() {
            return Err(RootError::Config("ontology_path must not be empty".into()));
        }
        Ok(())
    }

    /// Return the path to the default config file location.
    pub fn default_config_path() -> PathBuf {
        dirs_or_default(".ontoguard/config.toml")
    }
}
