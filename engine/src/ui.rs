use tokio::time::Instant;

use crate::{
  command::Key,
  engine::{Error, GameState},
};

/// What woke the session loop up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Input {
  /// The tick deadline passed with no key pressed.
  Timer,
  Key(Key),
}

/// A front end for a running session. The engine owns the loop and the state;
/// a renderer only draws it and reports input.
pub trait Renderer {
  fn draw(&mut self, state: &GameState) -> Result<(), Error>;

  /// Resolves with the next key, or with [`Input::Timer`] once `deadline`
  /// passes, whichever comes first.
  fn next_input(
    &mut self,
    deadline: Instant,
  ) -> impl Future<Output = Result<Input, Error>>;
}
