use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use engine::map::{Map, MapError, MapInfo};
use thiserror::Error;

pub const MAPS_DIR: &str = "maps";
pub const DEFAULT_MAP_NAME: &str = "default";
pub const DEFAULT_MAP: &str = include_str!("../../maps/default.json");

#[derive(Error, Debug)]
pub enum LoadMapError {
  #[error("failed to read map {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("failed to parse map {}: {source}", .path.display())]
  Parse {
    path: PathBuf,
    source: serde_json::Error,
  },
  #[error("invalid map: {0}")]
  Invalid(#[from] MapError),
}

/// Treats `name` as a path if a file exists there, otherwise as the name of
/// a map under [`MAPS_DIR`].
pub fn resolve(name: &str) -> PathBuf {
  let path = Path::new(name);
  if path.is_file() {
    path.to_owned()
  } else {
    Path::new(MAPS_DIR).join(format!("{name}.json"))
  }
}

pub fn read_info(name: &str) -> Result<MapInfo, LoadMapError> {
  let path = resolve(name);
  let text = match std::fs::read_to_string(&path) {
    Ok(text) => text,
    Err(e) if e.kind() == ErrorKind::NotFound && name == DEFAULT_MAP_NAME => {
      tracing::debug!("No {} on disk, using built-in map", path.display());
      DEFAULT_MAP.to_owned()
    }
    Err(source) => return Err(LoadMapError::Read { path, source }),
  };

  serde_json::from_str(&text).map_err(|source| LoadMapError::Parse { path, source })
}

pub fn load(name: &str, spawn_rate: Option<u64>) -> Result<Map, LoadMapError> {
  let mut info = read_info(name)?;
  if let Some(spawn_rate) = spawn_rate {
    info.spawn_rate = spawn_rate;
  }

  let map = Map::new(info)?;
  tracing::info!(
    "Loaded map \"{name}\" ({}x{}, {} exits, {} airports)",
    map.width(),
    map.height(),
    map.exits().len(),
    map.airports().len()
  );

  Ok(map)
}
