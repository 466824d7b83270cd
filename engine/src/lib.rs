//! Pure Sokoban simulation crate.
//! - Static terrain and crate/destination entities
//! - Move resolution with single-crate pushes and edge clamping
//! - Time-driven walking animation and session bookkeeping
//! - Level text format loader and bundled presets

mod animation;
mod board;
mod clock;
mod config;
mod entities;
mod game;
mod level;
mod preset;
pub mod render;
mod session;

pub use animation::{AnimationClock, AnimationState};
pub use board::{Board, BoardError, Cell, Point};
pub use clock::SessionClock;
pub use config::{ConfigError, GameConfig, CONFIG_ENV_VAR};
pub use entities::{Crate, EntityRegistry};
pub use game::{Direction, GameState, InvariantViolation, MoveOutcome, Player};
pub use level::{LcgRng, Level, LoadError, LoadedLevel, SimpleLevel};
pub use preset::{preset_level, preset_names};
pub use session::{Intent, PlayerView, Session, SessionView, TickReport};
