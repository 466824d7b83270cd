use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable naming a JSON file with a `GameConfig`.
pub const CONFIG_ENV_VAR: &str = "SOKOBAN_CONFIG";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Frames in each facing's sprite strip; also the animation credit of one move.
    pub frames_per_direction: u32,
    /// Animation frames per second of wall time.
    pub animation_frame_rate: f64,
    /// Length of the tick-rate sampling window, in seconds.
    pub tick_rate_window: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self { frames_per_direction: 3, animation_frame_rate: 10.0, tick_rate_window: 0.5 }
    }
}

impl GameConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: GameConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Loads the file named by `SOKOBAN_CONFIG`, or the defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => {
                log::info!("loading game config from {}", Path::new(&path).display());
                Self::from_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frames_per_direction == 0 {
            return Err(ConfigError::Invalid("frames_per_direction must be at least 1".into()));
        }
        if !(self.animation_frame_rate.is_finite() && self.animation_frame_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "animation_frame_rate must be positive, got {}",
                self.animation_frame_rate
            )));
        }
        if !(self.tick_rate_window > 0.0 && Duration::try_from_secs_f64(self.tick_rate_window).is_ok()) {
            return Err(ConfigError::Invalid(format!(
                "tick_rate_window must be positive, got {}",
                self.tick_rate_window
            )));
        }
        Ok(())
    }

    /// The sampling window, or the default window when the configured one is
    /// not a positive representable duration.
    pub fn tick_rate_window(&self) -> Duration {
        match Duration::try_from_secs_f64(self.tick_rate_window) {
            Ok(window) if !window.is_zero() => window,
            _ => {
                let fallback = Self::default().tick_rate_window;
                log::warn!("tick_rate_window {} is unusable, using {fallback}", self.tick_rate_window);
                Duration::from_secs_f64(fallback)
            }
        }
    }
}
