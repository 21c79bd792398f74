use std::io::{self, Stdout, Write};

use async_channel::{Receiver, Sender};
use crossterm::{
  cursor,
  event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
  execute, queue,
  style::{
    Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor,
    SetForegroundColor,
  },
  terminal::{self, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use engine::{
  command::{Key, PartialInstruction},
  engine::{Error, GameState},
  ui::{Input, Renderer},
};
use tokio::time::Instant;

/// Terminal columns per map cell.
pub const X_SCALE: u16 = 3;
pub const SIDEBAR_WIDTH: u16 = 32;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Style {
  Plain,
  Bold,
  /// Aircraft on the map.
  Label,
  Good,
  Bad,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
  pub x: u16,
  pub y: u16,
  pub text: String,
  pub style: Style,
}

/// Accumulates spans left to right along one row.
struct Line<'a> {
  spans: &'a mut Vec<Span>,
  x: u16,
  y: u16,
}

impl Line<'_> {
  fn push(&mut self, text: impl Into<String>, style: Style) -> &mut Self {
    let text = text.into();
    let width = text.chars().count() as u16;
    self.spans.push(Span {
      x: self.x,
      y: self.y,
      text,
      style,
    });
    self.x += width;
    self
  }
}

fn line(spans: &mut Vec<Span>, x: u16, y: u16) -> Line<'_> {
  Line { spans, x, y }
}

/// Smallest terminal that fits the map, the sidebar and the prompt line.
pub fn required_size(state: &GameState) -> (u16, u16) {
  let width = state.map.width() as u16 * X_SCALE + SIDEBAR_WIDTH;
  let map_rows = state.map.height() as u16 + 2;
  let sidebar_rows = state.aircraft.len() as u16 + 3;
  (width, map_rows.max(sidebar_rows))
}

/// Lays out one frame. Later spans draw over earlier ones.
pub fn layout(state: &GameState) -> Vec<Span> {
  let mut spans = Vec::new();
  let map = &state.map;
  let (width, height) = (map.width(), map.height());

  for (pos, cell) in map.cells() {
    let x = pos.x as u16 * X_SCALE;
    let y = pos.y as u16;

    let (x, text, style) = if let Some(id) = cell.exit {
      (x, id.to_string(), Style::Bold)
    } else if let Some(airport) = cell.airport {
      (
        x.saturating_sub(1),
        format!("{}{}", airport.direction.symbol(), airport.id),
        Style::Bold,
      )
    } else if let Some(id) = cell.beacon {
      (x.saturating_sub(1), format!("*{id}"), Style::Bold)
    } else if cell.path {
      (x, "+".into(), Style::Bold)
    } else if pos.y == 0 || pos.y == height - 1 {
      // Fill the gaps between cells so the border reads as a line.
      let run = if pos.x < width - 1 { X_SCALE } else { 1 };
      (x, "-".repeat(run as usize), Style::Plain)
    } else if pos.x == 0 || pos.x == width - 1 {
      (x, "|".into(), Style::Plain)
    } else {
      (x, ".".into(), Style::Plain)
    };

    spans.push(Span { x, y, text, style });
  }

  for aircraft in state.aircraft.iter().filter(|a| map.contains(a.pos)) {
    spans.push(Span {
      x: (aircraft.pos.x as u16 * X_SCALE).saturating_sub(1),
      y: aircraft.pos.y as u16,
      text: aircraft.label(),
      style: Style::Label,
    });
  }

  let bar_x = width as u16 * X_SCALE;
  line(&mut spans, bar_x, 0).push(
    format!("time: {} safe: {}", state.tick, state.safe),
    Style::Plain,
  );
  line(&mut spans, bar_x, 2).push("pl dt comm", Style::Plain);

  for (i, aircraft) in state.aircraft.iter().enumerate() {
    let mut text = format!("{} {}", aircraft.label(), aircraft.destination);
    if let Some(altitude) = aircraft.command.altitude {
      text.push_str(&format!(" alt -> {altitude}"));
    }
    if let Some(turn) = aircraft.command.turn {
      text.push_str(&format!(" dir -> {}", turn.heading));
      if let Some(beacon) = turn.beacon {
        text.push_str(&format!(" @ *{beacon}"));
      }
    }

    line(&mut spans, bar_x, i as u16 + 3).push(text, Style::Plain);
  }

  let prompt_y = height as u16 + 1;
  if let Some(failure) = &state.failure {
    line(&mut spans, 0, prompt_y).push(failure.to_string(), Style::Bad);
    return spans;
  }

  let mut prompt = line(&mut spans, 0, prompt_y);
  prompt.push("> ", Style::Plain);

  let command = &state.command;
  if let Some(id) = command.aircraft {
    let style = if state.find_aircraft(id).is_some() {
      Style::Good
    } else {
      Style::Bad
    };
    prompt.push(id, style).push(": ", Style::Plain);
  }

  match command.instruction {
    Some(PartialInstruction::Turn { heading, beacon }) => {
      prompt.push("turn: ", Style::Plain);
      if let Some(heading) = heading {
        prompt.push(heading.to_string(), Style::Plain);
      }
      if let Some(beacon) = beacon {
        let style = if map.beacon(beacon as usize).is_some() {
          Style::Plain
        } else {
          Style::Bad
        };
        prompt.push(format!(" @ *{beacon}"), style);
      }
    }
    Some(PartialInstruction::Altitude { value }) => {
      prompt.push("altitude: ", Style::Plain);
      if let Some(value) = value {
        prompt.push((value as u32 * 1000).to_string(), Style::Plain);
      }
    }
    None => {}
  }

  spans
}

/// Translates a terminal key press into an engine key.
pub fn map_key(event: KeyEvent) -> Option<Key> {
  if event.kind != KeyEventKind::Press {
    return None;
  }

  match event.code {
    KeyCode::Char('c' | 'd')
      if event.modifiers.contains(KeyModifiers::CONTROL) =>
    {
      Some(Key::Cancel)
    }
    KeyCode::Esc => Some(Key::Cancel),
    KeyCode::Enter => Some(Key::Enter),
    KeyCode::Backspace => Some(Key::Backspace),
    KeyCode::Char(c) => Some(Key::Char(c.to_ascii_lowercase())),
    _ => None,
  }
}

fn read_keys(sender: Sender<Key>) {
  loop {
    match event::read() {
      Ok(Event::Key(event)) => {
        if let Some(key) = map_key(event) {
          if sender.send_blocking(key).is_err() {
            break;
          }
        }
      }
      Ok(_) => {}
      Err(e) => {
        tracing::error!("Failed to read terminal input: {e}");
        break;
      }
    }
  }
}

/// Owns the terminal for the length of a session: raw mode and the
/// alternate screen are entered on creation and left on drop.
pub struct Screen {
  stdout: Stdout,
  keys: Receiver<Key>,
}

impl Screen {
  pub fn new() -> io::Result<Self> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen, cursor::Hide) {
      terminal::disable_raw_mode()?;
      return Err(e);
    }

    let (sender, keys) = async_channel::unbounded();
    std::thread::spawn(move || read_keys(sender));

    Ok(Self { stdout, keys })
  }

  fn print_span(&mut self, span: &Span) -> io::Result<()> {
    queue!(self.stdout, cursor::MoveTo(span.x, span.y))?;
    match span.style {
      Style::Plain => {}
      Style::Bold => queue!(self.stdout, SetAttribute(Attribute::Bold))?,
      Style::Label => queue!(
        self.stdout,
        SetBackgroundColor(Color::White),
        SetForegroundColor(Color::Black)
      )?,
      Style::Good => queue!(self.stdout, SetForegroundColor(Color::Green))?,
      Style::Bad => queue!(self.stdout, SetForegroundColor(Color::Red))?,
    }

    queue!(
      self.stdout,
      Print(&span.text),
      SetAttribute(Attribute::Reset),
      ResetColor
    )
  }
}

impl Renderer for Screen {
  fn draw(&mut self, state: &GameState) -> Result<(), Error> {
    queue!(self.stdout, terminal::Clear(ClearType::All))?;

    let (columns, rows) = terminal::size()?;
    let (width, height) = required_size(state);
    if columns < width || rows < height {
      queue!(
        self.stdout,
        cursor::MoveTo(0, 0),
        Print(format!(
          "Terminal is {columns}x{rows}, needs at least {width}x{height}"
        ))
      )?;
    } else {
      for span in layout(state) {
        self.print_span(&span)?;
      }
    }

    self.stdout.flush()?;
    Ok(())
  }

  async fn next_input(&mut self, deadline: Instant) -> Result<Input, Error> {
    tokio::select! {
      key = self.keys.recv() => key.map(Input::Key).map_err(|_| Error::InputClosed),
      () = tokio::time::sleep_until(deadline) => Ok(Input::Timer),
    }
  }
}

impl Drop for Screen {
  fn drop(&mut self) {
    let restored = execute!(self.stdout, cursor::Show, LeaveAlternateScreen)
      .and_then(|()| terminal::disable_raw_mode());
    if let Err(e) = restored {
      tracing::error!("Failed to restore terminal: {e}");
    }
  }
}

#[cfg(test)]
mod tests {
  use engine::{
    aircraft::{Aircraft, AircraftCommand, AircraftKind, Destination, TurnTarget},
    engine::Failure,
    heading::Heading,
    map::{Map, MapInfo},
  };
  use glam::IVec2;

  use super::*;

  const MAP: &str = r#"{
    "width": 6,
    "height": 5,
    "tickRate": 1,
    "spawnRate": 5,
    "exits": [[0, 2, "d"]],
    "airports": [[3, 2, "^"]],
    "beacons": [[2, 1]],
    "paths": [[[1, 3], [2, 3]]]
  }"#;

  fn state() -> GameState {
    let info: MapInfo = serde_json::from_str(MAP).unwrap();
    GameState::new(Map::new(info).unwrap())
  }

  fn text_at(spans: &[Span], x: u16, y: u16) -> Option<&Span> {
    spans.iter().rev().find(|s| s.x == x && s.y == y)
  }

  #[test]
  fn test_map_key() {
    let press = |code, modifiers| KeyEvent::new(code, modifiers);

    assert_eq!(
      map_key(press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
      Some(Key::Cancel)
    );
    assert_eq!(
      map_key(press(KeyCode::Char('d'), KeyModifiers::CONTROL)),
      Some(Key::Cancel)
    );
    assert_eq!(
      map_key(press(KeyCode::Esc, KeyModifiers::NONE)),
      Some(Key::Cancel)
    );
    assert_eq!(
      map_key(press(KeyCode::Char('c'), KeyModifiers::NONE)),
      Some(Key::Char('c'))
    );
    assert_eq!(
      map_key(press(KeyCode::Char('B'), KeyModifiers::SHIFT)),
      Some(Key::Char('b'))
    );
    assert_eq!(
      map_key(press(KeyCode::Enter, KeyModifiers::NONE)),
      Some(Key::Enter)
    );
    assert_eq!(
      map_key(press(KeyCode::Backspace, KeyModifiers::NONE)),
      Some(Key::Backspace)
    );
    assert_eq!(map_key(press(KeyCode::Up, KeyModifiers::NONE)), None);

    let mut release = press(KeyCode::Enter, KeyModifiers::NONE);
    release.kind = KeyEventKind::Release;
    assert_eq!(map_key(release), None);
  }

  #[test]
  fn test_layout_map_markers() {
    let spans = layout(&state());

    assert_eq!(text_at(&spans, 0, 2).unwrap().text, "0");
    assert_eq!(text_at(&spans, 8, 2).unwrap().text, "^0");
    assert_eq!(text_at(&spans, 5, 1).unwrap().text, "*0");
    assert_eq!(text_at(&spans, 3, 3).unwrap().text, "+");
    assert_eq!(text_at(&spans, 0, 0).unwrap().text, "---");
    assert_eq!(text_at(&spans, 15, 1).unwrap().text, "|");
    assert_eq!(text_at(&spans, 12, 3).unwrap().text, ".");
  }

  #[test]
  fn test_layout_aircraft_and_sidebar() {
    let mut state = state();
    state.tick = 12;
    state.safe = 3;
    state.aircraft.push(Aircraft {
      id: 'b',
      kind: AircraftKind::Prop,
      pos: IVec2::new(2, 2),
      altitude: 6,
      heading: Heading::East,
      destination: Destination::Airport(0),
      command: AircraftCommand {
        turn: Some(TurnTarget {
          heading: Heading::North,
          beacon: Some(0),
        }),
        altitude: Some(4),
      },
    });

    let spans = layout(&state);

    let label = text_at(&spans, 5, 2).unwrap();
    assert_eq!(label.text, "B6");
    assert_eq!(label.style, Style::Label);

    assert_eq!(text_at(&spans, 18, 0).unwrap().text, "time: 12 safe: 3");
    assert_eq!(text_at(&spans, 18, 2).unwrap().text, "pl dt comm");
    assert_eq!(
      text_at(&spans, 18, 3).unwrap().text,
      "B6 A0 alt -> 4 dir -> North @ *0"
    );
  }

  #[test]
  fn test_layout_prompt() {
    let mut state = state();
    for c in "btq5".chars() {
      state.command.press(Key::Char(c));
    }

    let spans = layout(&state);
    let prompt: Vec<_> = spans.iter().filter(|s| s.y == 6).collect();
    let text: String = prompt.iter().map(|s| s.text.as_str()).collect();

    assert_eq!(text, "> b: turn: NorthWest @ *5");
    // Unknown aircraft and unknown beacon are both flagged.
    assert_eq!(prompt[1].style, Style::Bad);
    assert_eq!(prompt.last().unwrap().style, Style::Bad);
  }

  #[test]
  fn test_layout_failure_replaces_prompt() {
    let mut state = state();
    state.command.press(Key::Char('b'));
    state.failure = Some(Failure::GroundCrash { label: "b0".into() });

    let spans = layout(&state);
    let prompt: Vec<_> = spans.iter().filter(|s| s.y == 6).collect();

    assert_eq!(prompt.len(), 1);
    assert_eq!(prompt[0].text, "b0 crashed into the ground");
    assert_eq!(prompt[0].style, Style::Bad);
  }

  #[test]
  fn test_required_size() {
    assert_eq!(required_size(&state()), (6 * X_SCALE + SIDEBAR_WIDTH, 7));
  }

  #[test]
  fn test_required_size_fits_sidebar() {
    let mut state = state();
    for id in engine::CALLSIGNS.into_iter().take(10) {
      state.aircraft.push(Aircraft {
        id,
        kind: AircraftKind::Jet,
        pos: IVec2::new(2, 2),
        altitude: 7,
        heading: Heading::North,
        destination: Destination::Exit(0),
        command: AircraftCommand::default(),
      });
    }

    let (_, rows) = required_size(&state);
    let lowest = layout(&state).iter().map(|s| s.y).max().unwrap();
    assert_eq!(rows, 13);
    assert!(lowest < rows);
  }
}
