use std::{
  path::{Path, PathBuf},
  process::ExitCode,
};

use clap::Parser;
use engine::{
  DEFAULT_TURN_RATE,
  aircraft::Aircraft,
  engine::{Engine, Failure, GameState, Options},
};
use serde::Serialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use turborand::{SeededCore, rng::Rng};

use config::{Config, ConfigError};
use maps::LoadMapError;
use screen::Screen;

mod config;
mod maps;
mod screen;

#[derive(Parser, Debug)]
#[command(version, about = "Air traffic control in your terminal")]
pub struct Cli {
  /// Map name under `maps/`, or a path to a map file.
  #[arg(short, long, default_value = maps::DEFAULT_MAP_NAME)]
  pub map: String,

  /// The seed to use for the random number generator.
  #[arg(short, long)]
  pub seed: Option<u64>,

  /// The path to the config file.
  #[arg(short, long, default_value = None)]
  pub config: Option<PathBuf>,

  /// Where to write the log. Defaults to the user data directory.
  #[arg(long)]
  pub log_file: Option<PathBuf>,

  /// Write a JSON report of the final state here on game over.
  #[arg(long)]
  pub report: Option<PathBuf>,

  /// Log more. Repeat for trace output.
  #[arg(short, long, action = clap::ArgAction::Count)]
  pub verbose: u8,
}

#[derive(Error, Debug)]
enum Error {
  #[error(transparent)]
  Config(#[from] ConfigError),
  #[error(transparent)]
  Map(#[from] LoadMapError),
  #[error(transparent)]
  Engine(#[from] engine::engine::Error),
  #[error("failed to serialize report: {0}")]
  Report(#[from] serde_json::Error),
  #[error("failed to write {}: {source}", .path.display())]
  Write {
    path: PathBuf,
    source: std::io::Error,
  },
}

/// The final state of a session.
#[derive(Debug, Serialize)]
struct Report<'a> {
  reason: String,
  failure: Option<&'a Failure>,
  tick: u64,
  safe: u64,
  aircraft: &'a [Aircraft],
}

impl<'a> From<&'a GameState> for Report<'a> {
  fn from(state: &'a GameState) -> Self {
    Self {
      reason: state
        .failure
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default(),
      failure: state.failure.as_ref(),
      tick: state.tick,
      safe: state.safe,
      aircraft: &state.aircraft,
    }
  }
}

fn log_level(cli: &Cli, config: &Config) -> Result<LevelFilter, ConfigError> {
  Ok(match cli.verbose {
    0 => config.log_level()?.unwrap_or(LevelFilter::INFO),
    1 => LevelFilter::DEBUG,
    _ => LevelFilter::TRACE,
  })
}

fn log_path(cli: &Cli, config: &Config) -> PathBuf {
  cli
    .log_file
    .clone()
    .or_else(|| config.log.as_ref().and_then(|log| log.path.clone()))
    .or_else(|| config::project_dirs().map(|dirs| dirs.data_dir().join("atc.log")))
    .unwrap_or_else(|| PathBuf::from("atc.log"))
}

/// Logs go to a file since stdout belongs to the game screen.
fn init_logging(path: &Path, level: LevelFilter) -> Result<WorkerGuard, Error> {
  let write_error = |source| Error::Write {
    path: path.to_owned(),
    source,
  };

  let dir = path.parent().unwrap_or(Path::new("."));
  std::fs::create_dir_all(dir).map_err(write_error)?;
  let file = std::fs::OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .map_err(write_error)?;

  let (writer, guard) = tracing_appender::non_blocking(file);
  tracing_subscriber::fmt()
    .with_max_level(level)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

fn write_report(path: &Path, state: &GameState) -> Result<(), Error> {
  let report = serde_json::to_string_pretty(&Report::from(state))?;
  std::fs::write(path, report).map_err(|source| Error::Write {
    path: path.to_owned(),
    source,
  })?;

  tracing::info!("Wrote report to {}", path.display());
  Ok(())
}

async fn run(cli: &Cli, config: &Config) -> Result<(), Error> {
  let game = config.game.unwrap_or_default();
  let map = maps::load(&cli.map, game.spawn_rate)?;

  let rng = match cli.seed.or(game.seed) {
    Some(seed) => {
      tracing::info!("Using seed {seed}");
      Rng::with_seed(seed)
    }
    None => Rng::new(),
  };

  let options = Options {
    turn_rate: game.turn_rate.unwrap_or(DEFAULT_TURN_RATE),
  };

  let mut engine = Engine::new(map, options, rng);
  {
    let mut screen = Screen::new().map_err(engine::engine::Error::from)?;
    engine.run(&mut screen).await?;
  }

  let state = &engine.state;
  if let Some(failure) = &state.failure {
    tracing::info!(
      "Game over after {} ticks with {} safe: {failure}",
      state.tick,
      state.safe
    );
    println!("Game over! ({failure})");
  }
  println!("time: {} safe: {}", state.tick, state.safe);

  if let Some(path) = &cli.report {
    write_report(path, state)?;
  }

  Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
  let cli = Cli::parse();

  let setup = Config::load(cli.config.as_deref())
    .map_err(Error::from)
    .and_then(|config| {
      let level = log_level(&cli, &config)?;
      let guard = init_logging(&log_path(&cli, &config), level)?;
      Ok((config, guard))
    });

  let (config, _guard) = match setup {
    Ok(setup) => setup,
    Err(e) => {
      eprintln!("{e}");
      return ExitCode::FAILURE;
    }
  };

  match run(&cli, &config).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      tracing::error!("{e}");
      eprintln!("{e}");
      ExitCode::FAILURE
    }
  }
}

#[cfg(test)]
mod tests {
  use engine::map::Map;

  use super::*;

  #[test]
  fn test_cli_flags() {
    let cli = Cli::parse_from([
      "atc",
      "--map",
      "harbour",
      "--seed",
      "9",
      "--report",
      "out.json",
      "-vv",
    ]);

    assert_eq!(cli.map, "harbour");
    assert_eq!(cli.seed, Some(9));
    assert_eq!(cli.report, Some(PathBuf::from("out.json")));
    assert_eq!(cli.verbose, 2);

    let cli = Cli::parse_from(["atc"]);
    assert_eq!(cli.map, "default");
    assert_eq!(cli.verbose, 0);
  }

  #[test]
  fn test_cli_overrides_config() {
    let config = Config::from_toml(
      "[log]\nlevel = \"warn\"\npath = \"/var/log/atc.log\"",
    )
    .unwrap();

    let cli = Cli::parse_from(["atc"]);
    assert_eq!(log_level(&cli, &config).unwrap(), LevelFilter::WARN);
    assert_eq!(log_path(&cli, &config), PathBuf::from("/var/log/atc.log"));

    let cli = Cli::parse_from(["atc", "-v", "--log-file", "here.log"]);
    assert_eq!(log_level(&cli, &config).unwrap(), LevelFilter::DEBUG);
    assert_eq!(log_path(&cli, &config), PathBuf::from("here.log"));
  }

  #[test]
  fn test_report() {
    let info = serde_json::from_str(maps::DEFAULT_MAP).unwrap();
    let mut engine = Engine::new(
      Map::new(info).unwrap(),
      Options::default(),
      Rng::with_seed(3),
    );
    engine.tick();
    engine.state.failure = Some(Failure::Exited);

    let report = serde_json::to_value(Report::from(&engine.state)).unwrap();

    assert_eq!(report["reason"], "exited");
    assert_eq!(report["failure"]["type"], "exited");
    assert_eq!(report["tick"], 1);
    assert_eq!(report["safe"], 0);
    assert_eq!(report["aircraft"].as_array().unwrap().len(), 1);
  }
}
