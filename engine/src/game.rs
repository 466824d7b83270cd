use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::animation::AnimationClock;
use crate::board::{Board, Point};
use crate::clock::SessionClock;
use crate::config::GameConfig;
use crate::entities::EntityRegistry;
use crate::level::LoadedLevel;

/// Declared in sprite-strip order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction { Left, Up, Right, Down }

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Left, Direction::Up, Direction::Right, Direction::Down];

    /// Row of the player's sprite sheet for this facing.
    pub fn strip(self) -> usize { self as usize }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Direction::Left),
            "up" => Ok(Direction::Up),
            "right" => Ok(Direction::Right),
            "down" => Ok(Direction::Down),
            other => Err(format!("invalid direction: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Player {
    pub position: Point,
    /// Last requested direction, updated even when the move is rejected.
    pub facing: Direction,
    pub animation: AnimationClock,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub accepted: bool,
    pub pushed_crate: Option<usize>,
}

impl MoveOutcome {
    const REJECTED: MoveOutcome = MoveOutcome { accepted: false, pushed_crate: None };
}

/// A broken board/entity invariant. Seeing one means the load or move contract
/// was violated; the session halts instead of playing on.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("crates {first} and {second} share cell {at}")]
    SharedCell { first: usize, second: usize, at: Point },
    #[error("crate {index} is off the board or inside a wall at {at}")]
    CrateBlocked { index: usize, at: Point },
    #[error("player is off the board, inside a wall or on a crate at {at}")]
    PlayerBlocked { at: Point },
    #[error("crate {index} has a stale on-target flag")]
    StaleOnTarget { index: usize },
}

#[derive(Clone, Debug, Serialize)]
pub struct GameState {
    pub(crate) board: Board,
    pub(crate) entities: EntityRegistry,
    pub(crate) player: Player,
    pub(crate) clock: SessionClock,
}

impl GameState {
    /// Fresh state for `level`, with its clocks starting at `now`.
    pub fn new(level: &LoadedLevel, config: &GameConfig, now: Duration) -> Self {
        Self {
            board: level.board.clone(),
            entities: level.entities.clone(),
            player: Player {
                position: level.player_start,
                facing: level.facing,
                animation: AnimationClock::new(config.frames_per_direction, config.animation_frame_rate),
            },
            clock: SessionClock::starting_at(now, config.tick_rate_window()),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    /// Samples the session clock at `now` and runs the walk animation up to
    /// it. Returns the animation frames advanced.
    pub fn advance_clocks(&mut self, now: Duration) -> u32 {
        self.clock.advance(now);
        self.player.animation.advance(now)
    }

    #[inline]
    fn dir_delta(dir: Direction) -> (isize, isize) {
        match dir {
            Direction::Left => (0, -1),
            Direction::Up => (-1, 0),
            Direction::Right => (0, 1),
            Direction::Down => (1, 0),
        }
    }

    /// One cell from `p` toward `dir`, clamped to the board.
    fn neighbour(&self, p: Point, dir: Direction) -> Point {
        let (dr, dc) = Self::dir_delta(dir);
        self.board.clamp(p.row as isize + dr, p.col as isize + dc)
    }

    /// Resolves one directional intent. Never fails: an illegal move is a
    /// rejected outcome, and turning toward `direction` still happens unless a
    /// previous move is still animating.
    pub fn attempt_move(&mut self, direction: Direction) -> MoveOutcome {
        if self.player.animation.is_animating() {
            log::debug!("move {direction:?} dropped: animation in flight");
            return MoveOutcome::REJECTED;
        }
        self.player.facing = direction;

        let target = self.neighbour(self.player.position, direction);
        if self.board.is_wall(target) {
            log::debug!("move {direction:?} blocked by wall at {target}");
            return MoveOutcome::REJECTED;
        }

        let pushed_crate = match self.entities.crate_at(target) {
            None => None,
            Some(index) => {
                let beyond = self.neighbour(target, direction);
                if self.board.is_wall(beyond) || self.entities.crate_at(beyond).is_some() {
                    log::debug!("push {direction:?} of crate {index} blocked at {beyond}");
                    return MoveOutcome::REJECTED;
                }
                self.entities.relocate_crate(index, beyond);
                log::debug!(
                    "crate {index} pushed to {beyond} (on target: {})",
                    self.entities.crates()[index].on_target
                );
                Some(index)
            }
        };

        self.player.position = target;
        self.player.animation.start(self.clock.now());
        self.clock.record_move();
        MoveOutcome { accepted: true, pushed_crate }
    }

    pub fn is_solved(&self) -> bool {
        self.entities.all_on_target()
    }

    /// Checks the global invariants that must hold after every completed move.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let crates = self.entities.crates();
        for (index, c) in crates.iter().enumerate() {
            if !self.board.contains(c.position) || self.board.is_wall(c.position) {
                return Err(InvariantViolation::CrateBlocked { index, at: c.position });
            }
            if let Some(offset) = crates[index + 1..].iter().position(|o| o.position == c.position) {
                return Err(InvariantViolation::SharedCell { first: index, second: index + 1 + offset, at: c.position });
            }
            if c.on_target != self.entities.is_destination(c.position) {
                return Err(InvariantViolation::StaleOnTarget { index });
            }
        }
        let at = self.player.position;
        if !self.board.contains(at) || self.board.is_wall(at) || self.entities.crate_at(at).is_some() {
            return Err(InvariantViolation::PlayerBlocked { at });
        }
        Ok(())
    }
}
