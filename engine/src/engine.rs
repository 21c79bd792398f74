use core::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use turborand::rng::Rng;

use crate::{
  DEFAULT_TURN_RATE, MIN_VERTICAL_SEPARATION, SAFE_PER_SPAWN_STEP,
  aircraft::{Aircraft, Destination, TurnTarget},
  command::{CommandBuilder, GameEvent, Task},
  map::Map,
  ui::{Input, Renderer},
};

/// Why a session ended. Every variant except [`Failure::Exited`] is a safety
/// rule violation by the aircraft named in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[serde(tag = "type")]
pub enum Failure {
  WrongLocation { label: String },
  ExitedInsteadOfLanding { label: String, exit: usize, airport: usize },
  WrongExit { label: String, exit: usize, expected: usize },
  WrongExitAltitude { label: String, altitude: u8 },
  GroundCrash { label: String },
  WrongAirportDirection { label: String },
  WrongAirport { label: String },
  Collision { label: String, other: String },
  Exited,
}

impl fmt::Display for Failure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Failure::WrongLocation { label } => {
        write!(f, "{label} exited at the wrong location")
      }
      Failure::ExitedInsteadOfLanding {
        label,
        exit,
        airport,
      } => {
        write!(f, "{label} exited at E{exit} instead of landing at A{airport}")
      }
      Failure::WrongExit {
        label,
        exit,
        expected,
      } => {
        write!(f, "{label} exited at E{exit} instead of E{expected}")
      }
      Failure::WrongExitAltitude { label, altitude } => {
        write!(
          f,
          "{label} exited at {}ft rather than {}ft",
          *altitude as u32 * 1000,
          crate::EXIT_ALTITUDE as u32 * 1000
        )
      }
      Failure::GroundCrash { label } => {
        write!(f, "{label} crashed into the ground")
      }
      Failure::WrongAirportDirection { label } => {
        write!(f, "{label} crashed into airport (wrong direction)")
      }
      Failure::WrongAirport { label } => {
        write!(f, "{label} landed at the wrong airport")
      }
      Failure::Collision { label, other } => {
        write!(f, "{label} collided with {other}")
      }
      Failure::Exited => write!(f, "exited"),
    }
  }
}

#[derive(Error, Debug)]
pub enum Error {
  #[error("unexpected partial game command: {0:?}")]
  PartialCommand(CommandBuilder),
  #[error("renderer failed: {0}")]
  Io(#[from] std::io::Error),
  #[error("input stream closed")]
  InputClosed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Options {
  /// Largest heading change per tick, in eighths of a turn.
  pub turn_rate: i32,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      turn_rate: DEFAULT_TURN_RATE,
    }
  }
}

/// Everything a renderer needs to draw a frame.
#[derive(Debug)]
pub struct GameState {
  pub tick: u64,
  pub safe: u64,
  pub command: CommandBuilder,
  pub last_tick: Instant,
  pub map: Map,
  /// Live aircraft in spawn order.
  pub aircraft: Vec<Aircraft>,
  pub failure: Option<Failure>,
}

impl GameState {
  pub fn new(map: Map) -> Self {
    Self {
      tick: 0,
      safe: 0,
      command: CommandBuilder::default(),
      last_tick: Instant::now(),
      map,
      aircraft: Vec::new(),
      failure: None,
    }
  }

  pub fn tick_rate(&self) -> Duration {
    Duration::from_secs_f32(self.map.info().tick_rate)
  }

  /// When the next tick is due. Measured from the last tick boundary so slow
  /// frames do not push the schedule back.
  pub fn next_tick_at(&self) -> Instant {
    self.last_tick + self.tick_rate()
  }

  /// Ticks between spawn attempts. Shrinks by one for every
  /// [`SAFE_PER_SPAWN_STEP`] aircraft brought home, down to every tick.
  pub fn spawn_interval(&self) -> u64 {
    self
      .map
      .info()
      .spawn_rate
      .saturating_sub(self.safe / SAFE_PER_SPAWN_STEP)
      .max(1)
  }

  pub fn find_aircraft(&self, id: char) -> Option<&Aircraft> {
    self.aircraft.iter().find(|a| a.id == id)
  }
}

#[derive(Debug)]
pub struct Engine {
  pub state: GameState,
  pub options: Options,
  rng: Rng,
}

impl Engine {
  pub fn new(map: Map, options: Options, rng: Rng) -> Self {
    Self {
      state: GameState::new(map),
      options,
      rng,
    }
  }

  /// Drives the session until it fails or the player quits.
  pub async fn run<R>(&mut self, renderer: &mut R) -> Result<(), Error>
  where
    R: Renderer,
  {
    tracing::info!(
      "Starting session on a {}x{} map",
      self.state.map.width(),
      self.state.map.height()
    );

    loop {
      renderer.draw(&self.state)?;
      if self.state.failure.is_some() {
        break;
      }

      let event = match renderer.next_input(self.state.next_tick_at()).await? {
        Input::Timer => GameEvent::Tick,
        Input::Key(key) => self.state.command.press(key),
      };

      self.handle_event(event)?;
    }

    Ok(())
  }

  pub fn handle_event(&mut self, event: GameEvent) -> Result<(), Error> {
    match event {
      GameEvent::Draw => {}
      GameEvent::Exit => self.state.failure = Some(Failure::Exited),
      GameEvent::Send => self.send()?,
      GameEvent::Tick => self.tick(),
    }

    Ok(())
  }

  /// Hands the assembled command to its aircraft. Commands for aircraft that
  /// are not (or no longer) in the air are dropped.
  pub fn send(&mut self) -> Result<(), Error> {
    let builder = self.state.command;
    let command = self
      .state
      .command
      .take()
      .ok_or(Error::PartialCommand(builder))?;

    let Some(aircraft) =
      self.state.aircraft.iter_mut().find(|a| a.id == command.id)
    else {
      tracing::warn!("Dropped command for unknown aircraft {}", command.id);
      return Ok(());
    };

    match command.task {
      Task::Turn { heading, beacon } => {
        aircraft.command.turn = Some(TurnTarget { heading, beacon });
      }
      Task::Altitude(altitude) => aircraft.command.altitude = Some(altitude),
    }

    tracing::debug!("Sent {:?} to {}", command.task, aircraft.label());
    Ok(())
  }

  pub fn tick(&mut self) {
    if self.state.failure.is_some() {
      return;
    }

    let tick = self.state.tick;
    for aircraft in self
      .state
      .aircraft
      .iter_mut()
      .filter(|a| a.should_update(tick))
    {
      aircraft.perform_command(self.options.turn_rate);
    }

    if let Err(failure) = self.update_positions() {
      tracing::info!("Game over at tick {tick}: {failure}");
      self.state.failure = Some(failure);
      return;
    }

    self.spawn_aircraft();

    self.state.tick += 1;
    self.state.last_tick = Instant::now();
  }

  /// Moves every aircraft due this tick and applies the safety rules to its
  /// new cell. Iterates from the back so retired aircraft can be removed in
  /// place. Stops at the first violation.
  fn update_positions(&mut self) -> Result<(), Failure> {
    let tick = self.state.tick;
    for index in (0..self.state.aircraft.len()).rev() {
      if !self.state.aircraft[index].should_update(tick) {
        continue;
      }

      self.state.aircraft[index].move_forward();

      if self.check_aircraft(index)? {
        let aircraft = self.state.aircraft.remove(index);
        self.state.safe += 1;
        tracing::debug!(
          "{} reached {} ({} safe)",
          aircraft.label(),
          aircraft.destination,
          self.state.safe
        );
      }
    }

    Ok(())
  }

  /// Returns `Ok(true)` if the aircraft at `index` has safely left the map.
  fn check_aircraft(&self, index: usize) -> Result<bool, Failure> {
    let map = &self.state.map;
    let aircraft = &self.state.aircraft[index];
    let cell = map.cell(aircraft.pos);
    let label = aircraft.label();

    if map.is_edge(aircraft.pos) {
      let Some(exit) = cell.and_then(|c| c.exit) else {
        return Err(Failure::WrongLocation { label });
      };

      return match aircraft.destination {
        Destination::Airport(airport) => Err(Failure::ExitedInsteadOfLanding {
          label,
          exit,
          airport,
        }),
        Destination::Exit(expected) if expected != exit => {
          Err(Failure::WrongExit {
            label,
            exit,
            expected,
          })
        }
        Destination::Exit(_) if !aircraft.is_at_exit_altitude() => {
          Err(Failure::WrongExitAltitude {
            label,
            altitude: aircraft.altitude,
          })
        }
        Destination::Exit(_) => Ok(true),
      };
    }

    if aircraft.altitude == 0 {
      let Some(airport) = cell.and_then(|c| c.airport) else {
        return Err(Failure::GroundCrash { label });
      };

      if !aircraft.heading.matches_direction(airport.direction) {
        return Err(Failure::WrongAirportDirection { label });
      }

      if aircraft.destination != Destination::Airport(airport.id) {
        return Err(Failure::WrongAirport { label });
      }

      return Ok(true);
    }

    let collision = self.state.aircraft.iter().enumerate().find(|(i, other)| {
      *i != index
        && other.pos == aircraft.pos
        && other.altitude.abs_diff(aircraft.altitude) <= MIN_VERTICAL_SEPARATION
    });

    if let Some((_, other)) = collision {
      return Err(Failure::Collision {
        label,
        other: other.label(),
      });
    }

    Ok(false)
  }

  fn spawn_aircraft(&mut self) {
    if self.state.tick % self.state.spawn_interval() != 0 {
      return;
    }

    match Aircraft::random_at_exit(
      &self.state.map,
      &self.state.aircraft,
      &self.rng,
    ) {
      Some(aircraft) => {
        tracing::info!(
          "Spawned {} at [{}, {}] bound for {}",
          aircraft.label(),
          aircraft.pos.x,
          aircraft.pos.y,
          aircraft.destination
        );
        self.state.aircraft.push(aircraft);
      }
      None => tracing::debug!("No free exit or callsign to spawn at"),
    }
  }
}
