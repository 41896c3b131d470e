//! Optional settings file.
//!
//! The dashboard runs with built-in defaults; `config.toml` under the
//! platform config directory may override any of them:
//!
//! ```toml
//! port = "/dev/ttyUSB1"
//! baud_rate = 115200
//! read_timeout_ms = 1000
//! max_points = 48
//! output_dir = "/home/lab/Datos_radon"
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1_000;
pub const DEFAULT_MAX_POINTS: usize = 48;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("max_points must be at least 1")]
    EmptyWindow,

    #[error("read_timeout_ms must be at least 1")]
    ZeroTimeout,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial device; auto-detected when unset.
    pub port: Option<String>,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    /// Samples kept on the live chart.
    pub max_points: usize,
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            max_points: DEFAULT_MAX_POINTS,
            output_dir: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("radon-dashboard").join("config.toml"))
    }

    /// Load the default config file, falling back to defaults when absent.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::from_toml(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        if config.max_points == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        if config.read_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(config)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// `~/Desktop/Datos_radon` unless overridden.
    pub fn output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join("Desktop").join("Datos_radon")
    }
}
