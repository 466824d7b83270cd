use std::time::Duration;

use serde::Serialize;

/// Elapsed time, tick-rate sampling and the move counter shown by the display.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionClock {
    #[serde(with = "secs")]
    started: Duration,
    #[serde(with = "secs")]
    now: Duration,
    #[serde(with = "secs")]
    elapsed: Duration,
    #[serde(with = "secs")]
    window: Duration,
    #[serde(with = "secs")]
    window_timer: Duration,
    frames_in_window: u32,
    tick_rate: f64,
    moves: u32,
}

impl SessionClock {
    pub fn starting_at(now: Duration, window: Duration) -> Self {
        Self {
            started: now,
            now,
            elapsed: Duration::ZERO,
            window,
            window_timer: Duration::ZERO,
            frames_in_window: 0,
            tick_rate: 0.0,
            moves: 0,
        }
    }

    /// Accounts one tick observed at `now`. Time never runs backwards here: an
    /// earlier `now` is treated as zero delta.
    pub fn advance(&mut self, now: Duration) {
        let delta = now.saturating_sub(self.now);
        self.now = self.now.max(now);
        self.elapsed += delta;
        self.window_timer += delta;
        if !self.window.is_zero() && self.window_timer > self.window {
            self.tick_rate = self.frames_in_window as f64 / self.window.as_secs_f64();
            self.frames_in_window = 0;
            self.window_timer -= self.window;
        }
        self.frames_in_window = self.frames_in_window.saturating_add(1);
    }

    pub(crate) fn record_move(&mut self) {
        self.moves = self.moves.saturating_add(1);
    }

    /// Latest observed timestamp.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn started(&self) -> Duration {
        self.started
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Ticks per second over the last completed sampling window.
    pub fn tick_rate(&self) -> f64 {
        self.tick_rate
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn status_line(&self, level_name: &str) -> String {
        format!(
            "{}, elapsed time = {:.1} s  {:.0} frames / s moves: {}",
            level_name,
            self.elapsed.as_secs_f64(),
            self.tick_rate,
            self.moves
        )
    }
}

/// Serializes a `Duration` as fractional seconds.
pub(crate) mod secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}
