use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{CALLSIGNS, MAX_ALTITUDE, heading::Heading};

/// A discrete key symbol, already decoded from whatever terminal produced it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Key {
  Char(char),
  Enter,
  Backspace,
  /// Any of the quit keystrokes (Ctrl-C, Ctrl-D, Escape).
  Cancel,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameEvent {
  /// Advance the simulation now.
  Tick,
  /// End the session.
  Exit,
  /// Commit the assembled command.
  Send,
  /// Only redraw.
  Draw,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PartialInstruction {
  Turn {
    heading: Option<Heading>,
    beacon: Option<u8>,
  },
  Altitude {
    value: Option<u8>,
  },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[serde(tag = "type", content = "value")]
pub enum Task {
  Turn { heading: Heading, beacon: Option<u8> },
  Altitude(u8),
}

/// A complete instruction for one aircraft.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
  pub id: char,
  pub task: Task,
}

/// The command line the controller is typing. Keys are fed in one at a time
/// and each produces the [`GameEvent`] the session loop should act on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct CommandBuilder {
  pub aircraft: Option<char>,
  pub instruction: Option<PartialInstruction>,
}

impl CommandBuilder {
  pub fn is_empty(&self) -> bool {
    self.aircraft.is_none()
  }

  pub fn is_complete(&self) -> bool {
    self.aircraft.is_some()
      && matches!(
        self.instruction,
        Some(PartialInstruction::Turn {
          heading: Some(_),
          ..
        }) | Some(PartialInstruction::Altitude { value: Some(_) })
      )
  }

  pub fn press(&mut self, key: Key) -> GameEvent {
    match key {
      Key::Cancel => return GameEvent::Exit,
      Key::Enter if self.is_complete() => return GameEvent::Send,
      Key::Enter => return GameEvent::Tick,
      Key::Backspace => self.undo(),
      Key::Char(c) => self.push(c),
    }

    GameEvent::Draw
  }

  fn push(&mut self, c: char) {
    match (self.aircraft, &mut self.instruction) {
      (None, _) => {
        if CALLSIGNS.contains(&c) {
          self.aircraft = Some(c);
        }
      }
      (Some(_), None) => match c {
        't' => {
          self.instruction = Some(PartialInstruction::Turn {
            heading: None,
            beacon: None,
          })
        }
        'a' => {
          self.instruction = Some(PartialInstruction::Altitude { value: None })
        }
        _ => {}
      },
      (Some(_), Some(PartialInstruction::Turn { heading, beacon })) => {
        if let Some(h) = Heading::from_key(c) {
          *heading = Some(h);
        } else if let Some(digit) = c.to_digit(10) {
          *beacon = Some(digit as u8);
        }
      }
      (Some(_), Some(PartialInstruction::Altitude { value })) => {
        if let Some(digit) =
          c.to_digit(10).filter(|d| *d <= MAX_ALTITUDE as u32)
        {
          *value = Some(digit as u8);
        }
      }
    }
  }

  /// Removes the most specific field that is set.
  fn undo(&mut self) {
    match &mut self.instruction {
      Some(PartialInstruction::Turn { beacon, .. }) if beacon.is_some() => {
        *beacon = None
      }
      Some(PartialInstruction::Turn { heading, .. }) if heading.is_some() => {
        *heading = None
      }
      Some(PartialInstruction::Altitude { value }) if value.is_some() => {
        *value = None
      }
      Some(_) => self.instruction = None,
      None => self.aircraft = None,
    }
  }

  /// Takes the assembled command and resets the builder. Returns `None`, and
  /// still resets, if the builder was not complete.
  pub fn take(&mut self) -> Option<Command> {
    let builder = core::mem::take(self);
    let id = builder.aircraft?;
    let task = match builder.instruction? {
      PartialInstruction::Turn {
        heading: Some(heading),
        beacon,
      } => Task::Turn { heading, beacon },
      PartialInstruction::Altitude { value: Some(value) } => {
        Task::Altitude(value)
      }
      _ => return None,
    };

    Some(Command { id, task })
  }
}

impl fmt::Display for CommandBuilder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(id) = self.aircraft {
      write!(f, "{id}: ")?;
    }

    match self.instruction {
      Some(PartialInstruction::Turn { heading, beacon }) => {
        write!(f, "turn: ")?;
        if let Some(heading) = heading {
          write!(f, "{heading}")?;
        }
        if let Some(beacon) = beacon {
          write!(f, " @ *{beacon}")?;
        }
      }
      Some(PartialInstruction::Altitude { value }) => {
        write!(f, "altitude: ")?;
        if let Some(value) = value {
          write!(f, "{}", value as u32 * 1000)?;
        }
      }
      None => {}
    }

    Ok(())
  }
}
