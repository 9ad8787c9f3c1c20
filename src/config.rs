//! Application-level configuration loading: selector catalogues, collection
//! names and the validation policy of the dialogs.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use validator::{Validate, ValidationErrors};

use crate::{dto::reference::ReferenceOption, validation::ValidationTrigger};

/// Default location on disk where the application looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SWEEPSTAKE_ADMIN_CONFIG_PATH";

/// Reasons a configuration document is rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid JSON or does not have the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A catalogue entry failed validation.
    #[error("invalid config: {0}")]
    Invalid(#[from] ValidationErrors),
}

/// Names of the backend collections each dialog works on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Collections {
    /// Players table.
    pub players: String,
    /// Maps table.
    pub maps: String,
    /// Ranking lines table.
    pub rankings: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            players: "players".into(),
            maps: "maps".into(),
            rankings: "rankings".into(),
        }
    }
}

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Competitive ranks offered by the player dialog.
    pub patents: Vec<ReferenceOption>,
    /// Game modes offered by the map dialog.
    pub map_types: Vec<ReferenceOption>,
    /// Backend collection names.
    pub collections: Collections,
    /// When dialogs re-validate their drafts.
    pub validation_trigger: ValidationTrigger,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        Self::load_from(resolve_config_path())
    }

    /// Load the configuration stored at `path`, falling back to built-in defaults.
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        patents = config.patents.len(),
                        map_types = config.map_types.len(),
                        "loaded config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "rejected config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// Omitted or empty catalogues keep their built-in defaults.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(contents)?;
        raw.validate()?;
        Ok(raw.into())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            patents: default_patents(),
            map_types: default_map_types(),
            collections: Collections::default(),
            validation_trigger: ValidationTrigger::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[validate(nested)]
    patents: Vec<RawOption>,
    #[validate(nested)]
    map_types: Vec<RawOption>,
    collections: Collections,
    validation_trigger: ValidationTrigger,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            patents: options_or(value.patents, default_patents),
            map_types: options_or(value.map_types, default_map_types),
            collections: value.collections,
            validation_trigger: value.validation_trigger,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
/// JSON representation of a single selector entry.
struct RawOption {
    #[validate(length(min = 1))]
    id: String,
    #[validate(length(min = 1))]
    name: String,
}

fn options_or(raw: Vec<RawOption>, fallback: fn() -> Vec<ReferenceOption>) -> Vec<ReferenceOption> {
    if raw.is_empty() {
        return fallback();
    }
    raw.into_iter()
        .map(|option| ReferenceOption::new(option.id, option.name))
        .collect()
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in competitive ranks.
fn default_patents() -> Vec<ReferenceOption> {
    [
        ("silver", "Silver"),
        ("silver-elite", "Silver Elite"),
        ("gold-nova", "Gold Nova"),
        ("gold-nova-master", "Gold Nova Master"),
        ("master-guardian", "Master Guardian"),
        ("master-guardian-elite", "Master Guardian Elite"),
        ("distinguished-master-guardian", "Distinguished Master Guardian"),
        ("legendary-eagle", "Legendary Eagle"),
        ("legendary-eagle-master", "Legendary Eagle Master"),
        ("supreme", "Supreme Master First Class"),
        ("global-elite", "Global Elite"),
    ]
    .into_iter()
    .map(|(id, name)| ReferenceOption::new(id, name))
    .collect()
}

/// Built-in game modes.
fn default_map_types() -> Vec<ReferenceOption> {
    vec![
        ReferenceOption::new("bomb", "Bomb defusal"),
        ReferenceOption::new("rescue", "Hostage rescue"),
    ]
}
