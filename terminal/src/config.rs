use std::{
  path::{Path, PathBuf},
  str::FromStr,
};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("failed to read config file {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("failed to parse config file {}: {source}", .path.display())]
  Parse {
    path: PathBuf,
    source: toml::de::Error,
  },
  #[error("unknown log level \"{0}\"")]
  LogLevel(String),
  #[error("turn rate must be between 1 and 4, got {0}")]
  TurnRate(i32),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
  pub game: Option<GameConfig>,
  pub log: Option<LogConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GameConfig {
  pub seed: Option<u64>,
  /// Overrides the map's baseline ticks between spawns.
  pub spawn_rate: Option<u64>,
  pub turn_rate: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogConfig {
  pub level: Option<String>,
  pub path: Option<PathBuf>,
}

pub fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", "atc")
}

impl Config {
  pub fn from_path<T>(path: T) -> Result<Self, ConfigError>
  where
    T: AsRef<Path>,
  {
    let path = path.as_ref();
    let config =
      std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
      })?;

    Self::from_toml(&config).map_err(|source| ConfigError::Parse {
      path: path.to_owned(),
      source,
    })
  }

  pub fn from_toml(config: &str) -> Result<Self, toml::de::Error> {
    toml::from_str(config)
  }

  /// Loads `path` if given. Otherwise loads the per-user config file when it
  /// exists, falling back to defaults.
  pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
    let config = match path {
      Some(path) => Self::from_path(path)?,
      None => match Self::default_path().filter(|p| p.is_file()) {
        Some(path) => Self::from_path(path)?,
        None => Self::default(),
      },
    };

    config.validate()?;
    Ok(config)
  }

  pub fn default_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if let Some(turn_rate) = self.game.unwrap_or_default().turn_rate {
      if !(1..=4).contains(&turn_rate) {
        return Err(ConfigError::TurnRate(turn_rate));
      }
    }

    self.log_level()?;
    Ok(())
  }

  pub fn log_level(&self) -> Result<Option<LevelFilter>, ConfigError> {
    self
      .log
      .as_ref()
      .and_then(|log| log.level.as_deref())
      .map(|level| {
        LevelFilter::from_str(level)
          .map_err(|_| ConfigError::LogLevel(level.to_owned()))
      })
      .transpose()
  }
}
