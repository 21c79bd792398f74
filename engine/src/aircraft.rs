use core::fmt;

use glam::IVec2;
use serde::{Deserialize, Serialize};
use turborand::{TurboRand, rng::Rng};

use crate::{
  CALLSIGNS, EXIT_ALTITUDE, SPAWN_ALTITUDE, SPAWN_CLEARANCE,
  heading::Heading,
  map::{Map, chebyshev_distance},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AircraftKind {
  Jet,
  /// Propeller aircraft move at half speed: only on odd ticks.
  Prop,
}

impl AircraftKind {
  pub fn should_update(self, tick: u64) -> bool {
    match self {
      AircraftKind::Jet => true,
      AircraftKind::Prop => tick % 2 == 1,
    }
  }

  pub fn callsign(self, id: char) -> char {
    match self {
      AircraftKind::Jet => id.to_ascii_lowercase(),
      AircraftKind::Prop => id.to_ascii_uppercase(),
    }
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type", content = "id")]
pub enum Destination {
  Airport(usize),
  Exit(usize),
}

impl Destination {
  /// Picks a destination for an aircraft entering at `exit_id`: a coin flip
  /// between any airport and any other exit, falling back to whichever pool
  /// is non-empty.
  pub fn random(map: &Map, exit_id: usize, rng: &Rng) -> Option<Self> {
    let airport = rng
      .sample_iter(0..map.airports().len())
      .map(Destination::Airport);
    let exit = rng
      .sample_iter((0..map.exits().len()).filter(|i| *i != exit_id))
      .map(Destination::Exit);

    if rng.bool() {
      airport.or(exit)
    } else {
      exit.or(airport)
    }
  }
}

impl fmt::Display for Destination {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Destination::Airport(id) => write!(f, "A{id}"),
      Destination::Exit(id) => write!(f, "E{id}"),
    }
  }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnTarget {
  pub heading: Heading,
  /// Beacon the controller referenced. Only shown, never flown to.
  pub beacon: Option<u8>,
}

/// Instructions an aircraft is still working towards. Each field is cleared
/// once the aircraft reaches it.
#[derive(
  Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub struct AircraftCommand {
  pub turn: Option<TurnTarget>,
  pub altitude: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aircraft {
  pub id: char,
  pub kind: AircraftKind,

  pub pos: IVec2,
  /// Thousands of feet, 0 to 9.
  pub altitude: u8,
  pub heading: Heading,

  pub destination: Destination,
  pub command: AircraftCommand,
}

impl Aircraft {
  /// Creates an aircraft at a random free exit, or `None` if every callsign is
  /// taken or every exit has traffic within [`SPAWN_CLEARANCE`].
  pub fn random_at_exit(
    map: &Map,
    aircraft: &[Aircraft],
    rng: &Rng,
  ) -> Option<Self> {
    let id = CALLSIGNS.into_iter().find(|c| aircraft.iter().all(|a| a.id != *c))?;

    let (exit_id, exit) =
      rng.sample_iter(map.exits().iter().enumerate().filter(|(_, exit)| {
        aircraft
          .iter()
          .all(|a| chebyshev_distance(a.pos, exit.pos) >= SPAWN_CLEARANCE)
      }))?;

    let kind = if rng.bool() {
      AircraftKind::Jet
    } else {
      AircraftKind::Prop
    };

    Some(Self {
      id,
      kind,
      pos: exit.pos,
      altitude: SPAWN_ALTITUDE,
      heading: exit.heading,
      destination: Destination::random(map, exit_id, rng)?,
      command: AircraftCommand::default(),
    })
  }

  pub fn label(&self) -> String {
    format!("{}{}", self.kind.callsign(self.id), self.altitude)
  }

  pub fn should_update(&self, tick: u64) -> bool {
    self.kind.should_update(tick)
  }

  pub fn is_at_exit_altitude(&self) -> bool {
    self.altitude == EXIT_ALTITUDE
  }

  /// Works one tick towards the pending altitude and turn targets.
  pub fn perform_command(&mut self, turn_rate: i32) {
    if let Some(target) = self.command.altitude {
      if self.altitude < target {
        self.altitude += 1;
      } else if self.altitude > target {
        self.altitude -= 1;
      }

      if self.altitude == target {
        self.command.altitude = None;
      }
    }

    if let Some(target) = self.command.turn {
      let step = turn_step(self.heading, target.heading, turn_rate);
      self.heading = self.heading.rotate(step);

      if self.heading == target.heading {
        self.command.turn = None;
      }
    }
  }

  pub fn move_forward(&mut self) {
    self.pos += self.heading.offset();
  }
}

/// Signed number of eighths to turn this tick: the shorter way round, ties
/// clockwise, at most `max_step` in magnitude.
pub fn turn_step(from: Heading, to: Heading, max_step: i32) -> i32 {
  let cw = from.clockwise_distance(to);
  let ccw = from.counter_clockwise_distance(to);

  if ccw < cw {
    (-max_step).max(-ccw)
  } else {
    max_step.min(cw)
  }
}
