use glam::IVec2;
use itertools::iproduct;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::heading::{Direction, Heading};

/// Longest allowed tick, in seconds.
pub const MAX_TICK_RATE: f32 = 3600.0;

/// Map metadata as it appears in a map file. Exit, airport and beacon ids are
/// their indices in these lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapInfo {
  pub width: i32,
  pub height: i32,
  /// Seconds per simulation tick.
  pub tick_rate: f32,
  /// Baseline number of ticks between spawns.
  pub spawn_rate: u64,
  pub exits: Vec<ExitInfo>,
  #[serde(default)]
  pub airports: Vec<AirportInfo>,
  #[serde(default)]
  pub beacons: Vec<BeaconInfo>,
  #[serde(default)]
  pub paths: Vec<PathInfo>,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(i32, i32, Heading)", into = "(i32, i32, Heading)")]
pub struct ExitInfo {
  pub pos: IVec2,
  /// Heading a spawned aircraft departs this exit on.
  pub heading: Heading,
}

impl From<(i32, i32, Heading)> for ExitInfo {
  fn from((x, y, heading): (i32, i32, Heading)) -> Self {
    Self {
      pos: IVec2::new(x, y),
      heading,
    }
  }
}

impl From<ExitInfo> for (i32, i32, Heading) {
  fn from(value: ExitInfo) -> Self {
    (value.pos.x, value.pos.y, value.heading)
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(i32, i32, Direction)", into = "(i32, i32, Direction)")]
pub struct AirportInfo {
  pub pos: IVec2,
  pub direction: Direction,
}

impl From<(i32, i32, Direction)> for AirportInfo {
  fn from((x, y, direction): (i32, i32, Direction)) -> Self {
    Self {
      pos: IVec2::new(x, y),
      direction,
    }
  }
}

impl From<AirportInfo> for (i32, i32, Direction) {
  fn from(value: AirportInfo) -> Self {
    (value.pos.x, value.pos.y, value.direction)
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct BeaconInfo {
  pub pos: IVec2,
}

impl From<(i32, i32)> for BeaconInfo {
  fn from((x, y): (i32, i32)) -> Self {
    Self {
      pos: IVec2::new(x, y),
    }
  }
}

impl From<BeaconInfo> for (i32, i32) {
  fn from(value: BeaconInfo) -> Self {
    (value.pos.x, value.pos.y)
  }
}

/// A straight or 45° path drawn between two cells, inclusive.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
  from = "((i32, i32), (i32, i32))",
  into = "((i32, i32), (i32, i32))"
)]
pub struct PathInfo {
  pub from: IVec2,
  pub to: IVec2,
}

impl From<((i32, i32), (i32, i32))> for PathInfo {
  fn from(((x1, y1), (x2, y2)): ((i32, i32), (i32, i32))) -> Self {
    Self {
      from: IVec2::new(x1, y1),
      to: IVec2::new(x2, y2),
    }
  }
}

impl From<PathInfo> for ((i32, i32), (i32, i32)) {
  fn from(value: PathInfo) -> Self {
    ((value.from.x, value.from.y), (value.to.x, value.to.y))
  }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AirportMarker {
  pub id: usize,
  pub direction: Direction,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Cell {
  pub exit: Option<usize>,
  pub airport: Option<AirportMarker>,
  pub beacon: Option<usize>,
  pub path: bool,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
  #[error("map must be at least 3x3, got {0}x{1}")]
  Dimensions(i32, i32),
  #[error(
    "tick rate must be above 0 and at most {}s, got {}",
    MAX_TICK_RATE,
    .0
  )]
  TickRate(f32),
  #[error("map has no exits")]
  NoExits,
  #[error("{what} [{}, {}] out of bounds of Map[{width}, {height}]", .pos.x, .pos.y)]
  OutOfBounds {
    what: &'static str,
    pos: IVec2,
    width: i32,
    height: i32,
  },
  #[error("airport and exit cannot exist on the same cell [{}, {}]", .0.x, .0.y)]
  ExitAirportConflict(IVec2),
}

/// The static grid the engine plays on. Built once from a [`MapInfo`] and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
  info: MapInfo,
  grid: Vec<Vec<Cell>>,
}

impl Map {
  pub fn new(info: MapInfo) -> Result<Self, MapError> {
    if info.width < 3 || info.height < 3 {
      return Err(MapError::Dimensions(info.width, info.height));
    }
    if !(info.tick_rate > 0.0 && info.tick_rate <= MAX_TICK_RATE) {
      return Err(MapError::TickRate(info.tick_rate));
    }
    if info.exits.is_empty() {
      return Err(MapError::NoExits);
    }

    let mut map = Self {
      grid: vec![vec![Cell::default(); info.width as usize]; info.height as usize],
      info,
    };

    for path in map.info.paths.clone() {
      let mut pos = path.from;
      loop {
        map.cell_mut("path", pos)?.path = true;
        if pos == path.to {
          break;
        }

        pos += (path.to - pos).signum();
      }
    }

    for (id, exit) in map.info.exits.clone().into_iter().enumerate() {
      map.cell_mut("exit", exit.pos)?.exit = Some(id);
    }

    for (id, airport) in map.info.airports.clone().into_iter().enumerate() {
      let cell = map.cell_mut("airport", airport.pos)?;
      if cell.exit.is_some() {
        return Err(MapError::ExitAirportConflict(airport.pos));
      }

      cell.airport = Some(AirportMarker {
        id,
        direction: airport.direction,
      });
    }

    for (id, beacon) in map.info.beacons.clone().into_iter().enumerate() {
      map.cell_mut("beacon", beacon.pos)?.beacon = Some(id);
    }

    Ok(map)
  }

  fn cell_mut(
    &mut self,
    what: &'static str,
    pos: IVec2,
  ) -> Result<&mut Cell, MapError> {
    let (width, height) = (self.width(), self.height());
    if !self.contains(pos) {
      return Err(MapError::OutOfBounds {
        what,
        pos,
        width,
        height,
      });
    }

    Ok(&mut self.grid[pos.y as usize][pos.x as usize])
  }

  pub fn info(&self) -> &MapInfo {
    &self.info
  }

  pub fn width(&self) -> i32 {
    self.info.width
  }

  pub fn height(&self) -> i32 {
    self.info.height
  }

  pub fn contains(&self, pos: IVec2) -> bool {
    pos.x >= 0 && pos.y >= 0 && pos.x < self.width() && pos.y < self.height()
  }

  /// Whether `pos` is on the outer ring of the map or past it.
  pub fn is_edge(&self, pos: IVec2) -> bool {
    pos.x <= 0
      || pos.y <= 0
      || pos.x >= self.width() - 1
      || pos.y >= self.height() - 1
  }

  pub fn cell(&self, pos: IVec2) -> Option<&Cell> {
    self
      .contains(pos)
      .then(|| &self.grid[pos.y as usize][pos.x as usize])
  }

  /// Iterates every cell in row-major order along with its position.
  pub fn cells(&self) -> impl Iterator<Item = (IVec2, &Cell)> {
    iproduct!(0..self.height(), 0..self.width())
      .map(move |(y, x)| (IVec2::new(x, y), &self.grid[y as usize][x as usize]))
  }

  pub fn exits(&self) -> &[ExitInfo] {
    &self.info.exits
  }

  pub fn airports(&self) -> &[AirportInfo] {
    &self.info.airports
  }

  pub fn beacon(&self, id: usize) -> Option<&BeaconInfo> {
    self.info.beacons.get(id)
  }
}

/// Largest per-axis distance between two cells.
pub fn chebyshev_distance(a: IVec2, b: IVec2) -> i32 {
  (a - b).abs().max_element()
}
