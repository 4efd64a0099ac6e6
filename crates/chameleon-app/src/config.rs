//! Settings from the configuration file and the command line.

use crate::cli::CliArgs;
use chameleon_core::DEFAULT_TEMPLATE;
use chameleon_x11::SwatchLayout;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("Invalid config file {}: {source}", path.display())]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Contents of the JSON configuration file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub count: Option<u32>,
    pub format: Option<String>,
    pub conversion: Option<String>,
    pub margin: Option<u16>,
    pub separator: Option<u16>,
    pub size: Option<u16>,
    pub border: Option<u16>,
}

impl ConfigFile {
    /// Default location: `<config dir>/chameleon/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("chameleon").join("config.json"))
    }

    /// Load an explicitly given file, or the default one if it exists.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        match explicit {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => {
                    log::debug!("No config file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn read(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub count: usize,
    pub format: String,
    pub conversion: Option<String>,
    pub layout: SwatchLayout,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            count: 1,
            format: DEFAULT_TEMPLATE.to_string(),
            conversion: None,
            layout: SwatchLayout::default(),
        }
    }
}

impl Settings {
    /// Merge command line arguments over the file over the defaults.
    pub fn resolve(args: &CliArgs, file: ConfigFile) -> ConfigResult<Self> {
        let defaults = Self::default();
        let count = args.count.or(file.count).map_or(defaults.count, |n| n as usize);
        if count == 0 {
            return Err(ConfigError::Invalid("count must be at least 1".to_string()));
        }
        let layout = SwatchLayout {
            margin: args.margin.or(file.margin).unwrap_or(defaults.layout.margin),
            separator: args.separator.or(file.separator).unwrap_or(defaults.layout.separator),
            size: args.size.or(file.size).unwrap_or(defaults.layout.size),
            border: args.border.or(file.border).unwrap_or(defaults.layout.border),
        };
        if layout.size == 0 {
            return Err(ConfigError::Invalid("size must be at least 1".to_string()));
        }
        if i16::try_from(layout.size).is_err() {
            return Err(ConfigError::Invalid(format!("size must be at most {}", i16::MAX)));
        }

        Ok(Self {
            count,
            format: args.format.clone().or(file.format).unwrap_or(defaults.format),
            conversion: args
                .conversion
                .clone()
                .or(file.conversion)
                .filter(|expr| !expr.trim().is_empty()),
            layout,
        })
    }
}
