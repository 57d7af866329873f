use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use simplelog::LevelFilter;
use thiserror::Error;

/// Read when `--config` is not given, if present.
pub const DEFAULT_CONFIG_FILE: &str = "anno_layout.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unknown log level [{0}]")]
    InvalidLogLevel(String),
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DesignerConfiguration {
    /// Registry files loaded in order, after the built-in types.
    #[serde(default)]
    catalogs: Vec<PathBuf>,
    /// Side of a tile in path data output.
    #[serde(default = "default_tile_side")]
    tile_side: u32,
    /// Logging goes here when set, even without `--debug`.
    #[serde(default)]
    log_file: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    log_level: String,
}

fn default_tile_side() -> u32 {
    30
}

fn default_log_level() -> String {
    String::from("debug")
}

impl Default for DesignerConfiguration {
    fn default() -> Self {
        DesignerConfiguration {
            catalogs: Vec::new(),
            tile_side: default_tile_side(),
            log_file: None,
            log_level: default_log_level(),
        }
    }
}

impl DesignerConfiguration {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let configuration: DesignerConfiguration = toml::from_str(source)?;
        configuration.log_level()?;
        Ok(configuration)
    }

    /// Loads `path`, or the default file when it exists, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Path::new(DEFAULT_CONFIG_FILE),
            None => return Ok(DesignerConfiguration::default()),
        };
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn catalogs(&self) -> &[PathBuf] {
        &self.catalogs
    }

    pub fn tile_side(&self) -> u32 {
        self.tile_side
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    pub fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }
}
