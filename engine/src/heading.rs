use core::fmt;

use glam::IVec2;
use serde::{Deserialize, Serialize};

pub const HEADING_COUNT: i32 = 8;

/// An 8-point compass heading. Values are laid out clockwise from North so
/// that heading arithmetic is plain modulo-8 arithmetic on the index.
#[derive(
  Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "HeadingRepr", into = "char")]
pub enum Heading {
  North,
  NorthEast,
  East,
  SouthEast,
  South,
  SouthWest,
  West,
  NorthWest,
}

pub const HEADINGS: [Heading; 8] = [
  Heading::North,
  Heading::NorthEast,
  Heading::East,
  Heading::SouthEast,
  Heading::South,
  Heading::SouthWest,
  Heading::West,
  Heading::NorthWest,
];

impl Heading {
  pub fn index(self) -> i32 {
    self as i32
  }

  pub fn from_index(index: i32) -> Self {
    HEADINGS[index.rem_euclid(HEADING_COUNT) as usize]
  }

  /// Rotates by `steps` eighths of a turn; positive is clockwise.
  pub fn rotate(self, steps: i32) -> Self {
    Self::from_index(self.index() + steps)
  }

  pub fn clockwise_distance(self, to: Heading) -> i32 {
    (to.index() - self.index() + HEADING_COUNT) % HEADING_COUNT
  }

  pub fn counter_clockwise_distance(self, to: Heading) -> i32 {
    (self.index() - to.index() + HEADING_COUNT) % HEADING_COUNT
  }

  /// Grid offset of one step along this heading. Row 0 is the top of the
  /// map, so North decreases `y`.
  pub fn offset(self) -> IVec2 {
    match self {
      Heading::North => IVec2::new(0, -1),
      Heading::NorthEast => IVec2::new(1, -1),
      Heading::East => IVec2::new(1, 0),
      Heading::SouthEast => IVec2::new(1, 1),
      Heading::South => IVec2::new(0, 1),
      Heading::SouthWest => IVec2::new(-1, 1),
      Heading::West => IVec2::new(-1, 0),
      Heading::NorthWest => IVec2::new(-1, -1),
    }
  }

  /// The key that selects this heading in a turn command.
  pub fn key(self) -> char {
    match self {
      Heading::North => 'w',
      Heading::NorthEast => 'e',
      Heading::East => 'd',
      Heading::SouthEast => 'c',
      Heading::South => 'x',
      Heading::SouthWest => 'z',
      Heading::West => 'a',
      Heading::NorthWest => 'q',
    }
  }

  pub fn from_key(key: char) -> Option<Self> {
    HEADINGS.into_iter().find(|h| h.key() == key)
  }

  pub fn matches_direction(self, direction: Direction) -> bool {
    self == direction.heading()
  }
}

impl fmt::Display for Heading {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Heading::North => "North",
      Heading::NorthEast => "NorthEast",
      Heading::East => "East",
      Heading::SouthEast => "SouthEast",
      Heading::South => "South",
      Heading::SouthWest => "SouthWest",
      Heading::West => "West",
      Heading::NorthWest => "NorthWest",
    };

    write!(f, "{name}")
  }
}

impl From<Heading> for char {
  fn from(value: Heading) -> Self {
    value.key()
  }
}

/// Map files may spell a heading either as its index or as its command key.
#[derive(Deserialize)]
#[serde(untagged)]
enum HeadingRepr {
  Index(i32),
  Key(char),
}

impl TryFrom<HeadingRepr> for Heading {
  type Error = String;

  fn try_from(value: HeadingRepr) -> Result<Self, Self::Error> {
    match value {
      HeadingRepr::Index(i) if (0..HEADING_COUNT).contains(&i) => {
        Ok(Heading::from_index(i))
      }
      HeadingRepr::Index(i) => Err(format!("heading index {i} out of range")),
      HeadingRepr::Key(c) => {
        Heading::from_key(c).ok_or_else(|| format!("unknown heading key '{c}'"))
      }
    }
  }
}

/// Cardinal orientation of an airport approach.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
  #[serde(rename = "^")]
  Up,
  #[serde(rename = "v")]
  Down,
  #[serde(rename = "<")]
  Left,
  #[serde(rename = ">")]
  Right,
}

impl Direction {
  /// The only heading from which an aircraft may land on an airport facing
  /// this way.
  pub fn heading(self) -> Heading {
    match self {
      Direction::Up => Heading::North,
      Direction::Down => Heading::South,
      Direction::Left => Heading::West,
      Direction::Right => Heading::East,
    }
  }

  pub fn symbol(self) -> char {
    match self {
      Direction::Up => '^',
      Direction::Down => 'v',
      Direction::Left => '<',
      Direction::Right => '>',
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_index_wraps() {
    assert_eq!(Heading::from_index(8), Heading::North);
    assert_eq!(Heading::from_index(-1), Heading::NorthWest);
    assert_eq!(Heading::from_index(11), Heading::SouthEast);
  }

  #[test]
  fn test_rotation_distances() {
    assert_eq!(Heading::North.clockwise_distance(Heading::SouthEast), 3);
    assert_eq!(
      Heading::North.counter_clockwise_distance(Heading::SouthEast),
      5
    );
    assert_eq!(Heading::West.clockwise_distance(Heading::West), 0);
    assert_eq!(Heading::NorthWest.rotate(2), Heading::NorthEast);
    assert_eq!(Heading::NorthEast.rotate(-2), Heading::NorthWest);
  }

  #[test]
  fn test_keys_round_trip() {
    for heading in HEADINGS {
      assert_eq!(Heading::from_key(heading.key()), Some(heading));
    }

    assert_eq!(Heading::from_key('t'), None);
  }

  #[test]
  fn test_offsets_are_unit_steps() {
    for heading in HEADINGS {
      let offset = heading.offset();
      assert!(offset.x.abs() <= 1 && offset.y.abs() <= 1);
      assert_ne!(offset, IVec2::ZERO);
      assert_eq!(heading.rotate(4).offset(), -offset);
    }
  }

  #[test]
  fn test_only_cardinals_match_directions() {
    assert!(Heading::North.matches_direction(Direction::Up));
    assert!(Heading::South.matches_direction(Direction::Down));
    assert!(Heading::West.matches_direction(Direction::Left));
    assert!(Heading::East.matches_direction(Direction::Right));

    for direction in [
      Direction::Up,
      Direction::Down,
      Direction::Left,
      Direction::Right,
    ] {
      let matching = HEADINGS
        .into_iter()
        .filter(|h| h.matches_direction(direction))
        .count();
      assert_eq!(matching, 1);
    }
  }

  #[test]
  fn test_deserialize_heading_forms() {
    let headings: Vec<Heading> =
      serde_json::from_str(r#"[0, 3, "d", "q"]"#).unwrap();
    assert_eq!(
      headings,
      vec![
        Heading::North,
        Heading::SouthEast,
        Heading::East,
        Heading::NorthWest
      ]
    );

    assert!(serde_json::from_str::<Heading>("9").is_err());
    assert!(serde_json::from_str::<Heading>(r#""t""#).is_err());
  }

  #[test]
  fn test_deserialize_direction() {
    let directions: Vec<Direction> =
      serde_json::from_str(r#"["^", "v", "<", ">"]"#).unwrap();
    assert_eq!(
      directions,
      vec![
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right
      ]
    );
  }
}
