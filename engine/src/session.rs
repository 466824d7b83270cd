//! The per-level session driven once per frame by an outer loop.
//!
//! Each `tick` runs, in order: clock sampling, the tick's intents (one
//! resolver call per move intent), animation, win check. The returned
//! `SessionView` is what renderers get; they never see the mutable state.

use std::time::Duration;

use serde::Serialize;

use crate::board::Point;
use crate::config::GameConfig;
use crate::entities::Crate;
use crate::game::{Direction, GameState, InvariantViolation, MoveOutcome};
use crate::level::LoadedLevel;
use crate::render;

/// Abstract input produced by an input adapter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Intent {
    Move(Direction),
    Reset,
    Quit,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TickReport {
    /// One entry per move intent handled this tick.
    pub outcomes: Vec<MoveOutcome>,
    pub frames_advanced: u32,
    pub reset: bool,
    pub solved: bool,
    pub quit: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayerView {
    pub position: Point,
    pub facing: Direction,
    pub frame_index: u32,
    pub animating: bool,
}

/// Read-only snapshot handed to renderers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionView {
    pub level: String,
    pub rows: usize,
    pub cols: usize,
    pub room_text: String,
    pub crates: Vec<Crate>,
    pub destinations: Vec<Point>,
    pub player: PlayerView,
    pub solved: bool,
    pub elapsed: f64,
    pub tick_rate: f64,
    pub moves: u32,
    pub status_line: String,
}

pub struct Session {
    level: LoadedLevel,
    config: GameConfig,
    state: GameState,
    solved: bool,
    quit: bool,
    fault: Option<InvariantViolation>,
}

impl Session {
    pub fn new(level: LoadedLevel, config: GameConfig, now: Duration) -> Self {
        let state = GameState::new(&level, &config, now);
        let solved = state.is_solved();
        Self { level, config, state, solved, quit: false, fault: None }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn level_name(&self) -> &str {
        &self.level.name
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    pub fn has_quit(&self) -> bool {
        self.quit
    }

    pub fn fault(&self) -> Option<&InvariantViolation> {
        self.fault.as_ref()
    }

    /// Discards all play state and restarts the level at `now`.
    pub fn reset(&mut self, now: Duration) {
        log::info!("resetting level {:?}", self.level.name);
        self.state = GameState::new(&self.level, &self.config, now);
        self.solved = self.state.is_solved();
        self.quit = false;
        self.fault = None;
    }

    /// Advances the session to `now` (a monotonic offset from an arbitrary origin).
    pub fn tick(&mut self, now: Duration, intents: impl IntoIterator<Item = Intent>) -> TickReport {
        let mut report = TickReport::default();
        if self.fault.is_some() {
            report.quit = self.quit;
            return report;
        }
        self.state.clock.advance(now);

        for intent in intents {
            match intent {
                Intent::Quit => self.quit = true,
                Intent::Reset => {
                    self.reset(now);
                    self.state.clock.advance(now);
                    report.reset = true;
                }
                Intent::Move(_) if self.quit || self.solved => {}
                Intent::Move(dir) => {
                    let outcome = self.state.attempt_move(dir);
                    report.outcomes.push(outcome);
                    if outcome.accepted {
                        if let Err(violation) = self.state.check_invariants() {
                            log::error!("halting session on {:?}: {violation}", self.level.name);
                            self.fault = Some(violation);
                            report.quit = self.quit;
                            return report;
                        }
                    }
                }
            }
        }

        report.frames_advanced = self.state.player.animation.advance(now);

        let solved = self.state.is_solved();
        if solved && !self.solved {
            log::info!(
                "level {:?} solved in {} moves, {:.1} s",
                self.level.name,
                self.state.clock.moves(),
                self.state.clock.elapsed().as_secs_f64()
            );
        }
        self.solved = solved;
        report.solved = solved;
        report.quit = self.quit;
        report
    }

    pub fn view(&self) -> SessionView {
        let st = &self.state;
        let (rows, cols) = st.board.dimensions();
        let (facing, frame_index) = render::player_sprite(st);
        SessionView {
            level: self.level.name.clone(),
            rows,
            cols,
            room_text: render::room_text(st),
            crates: st.entities.crates().to_vec(),
            destinations: st.entities.destinations().to_vec(),
            player: PlayerView {
                position: st.player.position,
                facing,
                frame_index,
                animating: st.player.animation.is_animating(),
            },
            solved: self.solved,
            elapsed: st.clock.elapsed().as_secs_f64(),
            tick_rate: st.clock.tick_rate(),
            moves: st.clock.moves(),
            status_line: st.clock.status_line(&self.level.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    fn session(text: &str) -> Session {
        let lvl = Level::new("t", text).load().unwrap();
        Session::new(lvl, GameConfig::default(), Duration::ZERO)
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn second_intent_in_same_tick_is_dropped() {
        let mut s = session("3 5\n#####\n#p  #\n#####\n");
        let r = s.tick(ms(0), [Intent::Move(Direction::Right), Intent::Move(Direction::Right)]);
        assert_eq!(r.outcomes.len(), 2);
        assert!(r.outcomes[0].accepted);
        assert!(!r.outcomes[1].accepted);
        assert_eq!(s.view().player.position, Point::new(1, 2));
    }

    #[test]
    fn animation_drains_between_ticks() {
        let mut s = session("3 5\n#####\n#p  #\n#####\n");
        s.tick(ms(0), [Intent::Move(Direction::Right)]);
        assert!(s.view().player.animating);
        let r = s.tick(ms(100), []);
        assert_eq!(r.frames_advanced, 1);
        assert_eq!(s.view().player.frame_index, 1);
        s.tick(ms(300), []);
        let v = s.view();
        assert!(!v.player.animating);
        assert_eq!(v.player.frame_index, 0);
        assert!(s.tick(ms(300), [Intent::Move(Direction::Right)]).outcomes[0].accepted);
    }

    #[test]
    fn reset_restores_level_and_zeroes_counters() {
        let mut s = session("3 6\n######\n#pc x#\n######\n");
        s.tick(ms(0), [Intent::Move(Direction::Right)]);
        s.tick(ms(1_000), []);
        assert_eq!(s.view().moves, 1);
        let r = s.tick(ms(2_000), [Intent::Reset]);
        assert!(r.reset);
        let v = s.view();
        assert_eq!(v.moves, 0);
        assert_eq!(v.elapsed, 0.0);
        assert_eq!(v.player.position, Point::new(1, 1));
        assert_eq!(v.crates[0].position, Point::new(1, 2));
    }

    #[test]
    fn solved_session_ignores_moves_and_quit_is_reported() {
        let mut s = session("3 5\n#####\n#pcx#\n#####\n");
        let r = s.tick(ms(0), [Intent::Move(Direction::Right)]);
        assert!(r.solved);
        let r = s.tick(ms(1_000), [Intent::Move(Direction::Left), Intent::Quit]);
        assert!(r.outcomes.is_empty());
        assert!(r.quit);
        assert!(s.has_quit());
        assert_eq!(s.view().player.position, Point::new(1, 2));
    }

    #[test]
    fn zero_crate_level_is_solved_from_the_start() {
        let s = session("1 2\np \n");
        assert!(s.is_solved());
        assert!(s.view().solved);
    }

    #[test]
    fn invariant_fault_halts_the_session() {
        let mut s = session("4 6\n######\n#p  x#\n#c cx#\n######\n");
        s.state.entities.relocate_crate(1, Point::new(2, 1));
        let r = s.tick(ms(0), [Intent::Move(Direction::Right)]);
        assert!(r.outcomes[0].accepted);
        assert_eq!(
            s.fault(),
            Some(&InvariantViolation::SharedCell { first: 0, second: 1, at: Point::new(2, 1) })
        );

        let before = s.view();
        let r = s.tick(ms(2_000), [Intent::Move(Direction::Down), Intent::Move(Direction::Right)]);
        assert!(r.outcomes.is_empty());
        assert_eq!(r.frames_advanced, 0);
        let after = s.view();
        assert_eq!(after.player, before.player);
        assert_eq!(after.crates, before.crates);
        assert_eq!(after.moves, 1);
    }

    #[test]
    fn negative_tick_window_does_not_panic() {
        let lvl = Level::new("t", "3 5\n#####\n#p  #\n#####\n").load().unwrap();
        let config = GameConfig { tick_rate_window: -1.0, ..Default::default() };
        let mut s = Session::new(lvl, config, Duration::ZERO);
        s.tick(ms(0), []);
        s.tick(ms(600), []);
        assert_eq!(s.view().tick_rate, 2.0);
    }

    #[test]
    fn view_carries_status_line() {
        let mut s = session("3 5\n#####\n#p  #\n#####\n");
        s.tick(ms(0), [Intent::Move(Direction::Right)]);
        s.tick(ms(1_500), []);
        assert_eq!(s.view().status_line, "t, elapsed time = 1.5 s  2 frames / s moves: 1");
    }
}
