//! Walking-animation state for the player sprite.
//!
//! Frames advance on wall time at a fixed rate, independent of how often the
//! driver ticks. Missed ticks are caught up in one step.

use std::time::Duration;

use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum AnimationState {
    /// No credit left; the facing strip shows frame 0.
    Idle,
    Animating,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnimationClock {
    frames_per_direction: u32,
    frame_rate: f64,
    move_credit_frames: u32,
    #[serde(with = "crate::clock::secs")]
    last_advance: Duration,
    current_frame: u32,
}

impl AnimationClock {
    pub fn new(frames_per_direction: u32, frame_rate: f64) -> Self {
        Self {
            frames_per_direction: frames_per_direction.max(1),
            frame_rate,
            move_credit_frames: 0,
            last_advance: Duration::ZERO,
            current_frame: 0,
        }
    }

    pub fn state(&self) -> AnimationState {
        if self.move_credit_frames > 0 { AnimationState::Animating } else { AnimationState::Idle }
    }

    #[inline]
    pub fn is_animating(&self) -> bool {
        self.move_credit_frames > 0
    }

    pub fn move_credit_frames(&self) -> u32 {
        self.move_credit_frames
    }

    pub fn frames_per_direction(&self) -> u32 {
        self.frames_per_direction
    }

    /// Frame of the facing strip to draw.
    pub fn frame_index(&self) -> u32 {
        if self.is_animating() { self.current_frame } else { 0 }
    }

    /// Idle -> Animating. Called when a move is accepted.
    pub(crate) fn start(&mut self, now: Duration) {
        self.move_credit_frames = self.frames_per_direction;
        self.last_advance = now;
    }

    /// Advances by however many whole frame intervals elapsed since the last
    /// advance. Returns the number of frames advanced.
    pub fn advance(&mut self, now: Duration) -> u32 {
        if !self.is_animating() {
            self.current_frame = 0;
            return 0;
        }
        let elapsed = now.saturating_sub(self.last_advance).as_secs_f64();
        let due = (elapsed * self.frame_rate).floor();
        if due.is_nan() || due < 1.0 {
            return 0;
        }
        let due = due.min(u32::MAX as f64) as u32;
        self.current_frame = ((self.current_frame as u64 + due as u64) % self.frames_per_direction as u64) as u32;
        self.last_advance = now;
        self.move_credit_frames = self.move_credit_frames.saturating_sub(due);
        if self.move_credit_frames == 0 {
            self.current_frame = 0;
        }
        due
    }
}
