pub mod aircraft;
pub mod command;
pub mod engine;
pub mod heading;
pub mod map;
pub mod ui;

pub const CALLSIGNS: [char; 26] = [
  'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o',
  'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

// Altitudes are in thousands of feet.
pub const SPAWN_ALTITUDE: u8 = 7;
pub const EXIT_ALTITUDE: u8 = 9;
pub const MAX_ALTITUDE: u8 = 9;
/// Aircraft sharing a cell collide unless more than this far apart vertically.
pub const MIN_VERTICAL_SEPARATION: u8 = 3;

pub const DEFAULT_TURN_RATE: i32 = 2;

/// No aircraft spawns at an exit with traffic closer than this (Chebyshev).
pub const SPAWN_CLEARANCE: i32 = 3;
pub const SAFE_PER_SPAWN_STEP: u64 = 5;

#[cfg(test)]
pub(crate) mod testing {
  use crate::map::{Map, MapInfo};

  /// A 12x10 map with an exit on every side, two airports and two beacons.
  pub const TEST_MAP: &str = r#"{
    "width": 12,
    "height": 10,
    "tickRate": 1.0,
    "spawnRate": 5,
    "exits": [[0, 4, "d"], [11, 4, "a"], [6, 0, "x"], [6, 9, "w"]],
    "airports": [[4, 6, "^"], [8, 3, ">"]],
    "beacons": [[3, 3], [8, 7]],
    "paths": [[[1, 4], [10, 4]], [[6, 1], [6, 8]]]
  }"#;

  pub fn test_map_info() -> MapInfo {
    serde_json::from_str(TEST_MAP).unwrap()
  }

  pub fn test_map() -> Map {
    Map::new(test_map_info()).unwrap()
  }
}
