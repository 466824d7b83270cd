//! Tool-call environment around a `sokoban_rs::Session`.
//!
//! The environment keeps a virtual clock: every step first lets `step_seconds`
//! of play elapse (so a previous walk animation can finish) and then feeds the
//! step's intent into the session.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use sokoban_rs::{preset_level, Direction, GameConfig, Intent, Level, LoadedLevel, Session, SimpleLevel, TickReport};

mod protocol;

pub use protocol::{EngineError, Environment, Observation, Snapshot, ToolCall};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Inline level source; wins over every other level option.
    pub level_text: Option<String>,
    /// Bundled level name, see `sokoban_rs::preset_names`.
    pub preset: Option<String>,
    /// Seed for a generated room when neither text nor preset is given.
    pub seed: Option<u64>,
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub num_crates: Option<usize>,
    /// Virtual seconds that pass on every step.
    pub step_seconds: Option<f64>,
    pub max_steps: Option<u32>,
    pub game: Option<GameConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level_text: None,
            preset: None,
            seed: None,
            width: None,
            height: None,
            num_crates: None,
            step_seconds: Some(1.0),
            max_steps: Some(500),
            game: None,
        }
    }
}

impl Config {
    fn level(&self) -> Result<Level, EngineError> {
        if let Some(text) = &self.level_text {
            return Ok(Level::new("inline", text.clone()));
        }
        if let Some(name) = &self.preset {
            return preset_level(name).ok_or_else(|| EngineError::NotFound(format!("unknown preset: {name}")));
        }
        if let Some(seed) = self.seed {
            let w = self.width.unwrap_or(7);
            let h = self.height.unwrap_or(7);
            let n = self.num_crates.unwrap_or(1);
            return Ok(Level::from_seed(w, h, n, seed));
        }
        Ok(SimpleLevel::build())
    }
}

fn parse_intent(call: &ToolCall) -> Result<Option<Intent>, EngineError> {
    match call.tool.as_str() {
        "move" | "interact" => {
            let dir = call
                .args
                .get("direction")
                .and_then(|v| v.as_str())
                .ok_or_else(|| EngineError::Validation("missing direction".into()))?;
            let d: Direction = dir.parse().map_err(EngineError::Validation)?;
            Ok(Some(Intent::Move(d)))
        }
        "reset" => Ok(Some(Intent::Reset)),
        "wait" => Ok(None),
        other => Err(EngineError::Validation(format!("unknown tool: {other}"))),
    }
}

pub struct SokobanEnvironment {
    session: Session,
    now: Duration,
    step_seconds: f64,
    max_steps: u32,
    num_env_steps: u32,
}

impl SokobanEnvironment {
    pub fn new(config: Config) -> Result<Self, EngineError> {
        let level = config.level()?.load()?;
        Self::with_level(level, &config)
    }

    /// Builds the environment around an already loaded level; the level
    /// options in `config` are ignored.
    pub fn with_level(level: LoadedLevel, config: &Config) -> Result<Self, EngineError> {
        let game = config.game.clone().unwrap_or_default();
        game.validate()?;
        let step_seconds = config.step_seconds.unwrap_or(1.0);
        Duration::try_from_secs_f64(step_seconds)
            .map_err(|e| EngineError::Validation(format!("bad step_seconds {step_seconds}: {e}")))?;
        log::info!("environment ready on level {:?} (step_seconds={step_seconds})", level.name);
        Ok(Self {
            session: Session::new(level, game, Duration::ZERO),
            now: Duration::ZERO,
            step_seconds,
            max_steps: config.max_steps.unwrap_or(500),
            num_env_steps: 0,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn pass_time(&mut self, seconds: f64) -> Result<(), EngineError> {
        let delta = Duration::try_from_secs_f64(seconds)
            .map_err(|e| EngineError::Validation(format!("bad seconds {seconds}: {e}")))?;
        self.now = self
            .now
            .checked_add(delta)
            .ok_or_else(|| EngineError::Validation("virtual clock overflow".into()))?;
        self.session.tick(self.now, []);
        Ok(())
    }

    fn observe(&self, terminated: bool, truncated: bool, extra: Json) -> Result<Observation, EngineError> {
        let mut data = serde_json::to_value(self.session.view())
            .map_err(|e| EngineError::Internal(format!("serializing view: {e}")))?;
        if let Some(map) = data.as_object_mut() {
            map.insert("num_env_steps".into(), json!(self.num_env_steps));
            map.insert("max_steps".into(), json!(self.max_steps));
            map.insert("terminated".into(), Json::Bool(terminated));
            map.insert("truncated".into(), Json::Bool(truncated));
            map.insert("extra".into(), extra);
        }
        Ok(Observation { terminated, truncated, data })
    }

    fn report_json(report: &TickReport) -> Json {
        let outcome = report.outcomes.first().copied().unwrap_or_default();
        json!({
            "accepted": outcome.accepted,
            "pushed_crate": outcome.pushed_crate,
            "frames_advanced": report.frames_advanced,
            "reset": report.reset,
        })
    }
}

#[async_trait]
impl Environment for SokobanEnvironment {
    async fn initialize(&mut self) -> Result<Observation, EngineError> {
        self.observe(self.session.is_solved(), false, json!({"event": "initialize"}))
    }

    async fn step(&mut self, tool_calls: Vec<ToolCall>) -> Result<Observation, EngineError> {
        let call = tool_calls
            .first()
            .ok_or_else(|| EngineError::Validation("no tool_calls provided".into()))?;
        let intent = parse_intent(call)?;
        if let Some(fault) = self.session.fault() {
            return Err(EngineError::Internal(format!("session halted: {fault}")));
        }

        let seconds = match intent {
            None => call.args.get("seconds").and_then(|v| v.as_f64()).unwrap_or(self.step_seconds),
            Some(_) => self.step_seconds,
        };
        self.pass_time(seconds)?;
        let report = self.session.tick(self.now, intent);
        log::debug!("tool {:?} -> {:?}", call.tool, report);
        if let Some(fault) = self.session.fault() {
            return Err(EngineError::Internal(format!("session halted: {fault}")));
        }
        if intent == Some(Intent::Reset) {
            self.num_env_steps = 0;
        } else {
            self.num_env_steps = self.num_env_steps.saturating_add(1);
        }

        let terminated = report.solved;
        let truncated = !terminated && self.num_env_steps >= self.max_steps;
        self.observe(terminated, truncated, Self::report_json(&report))
    }

    async fn checkpoint(&self) -> Result<Snapshot, EngineError> {
        let data = json!({
            "now": self.now.as_secs_f64(),
            "num_env_steps": self.num_env_steps,
            "view": self.session.view(),
            "state": self.session.state(),
        });
        Ok(Snapshot { version: 1, engine: "sokoban".into(), data })
    }

    async fn terminate(&mut self) -> Result<Observation, EngineError> {
        let solved = self.session.is_solved();
        self.session.tick(self.now, [Intent::Quit]);
        log::info!("environment terminated after {} steps (solved: {solved})", self.num_env_steps);
        self.observe(solved, !solved, json!({"event": "terminate"}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sokoban_rs::{EntityRegistry, Point};

    fn mv(direction: &str) -> Vec<ToolCall> {
        vec![ToolCall { tool: "move".into(), args: json!({ "direction": direction }) }]
    }

    #[tokio::test]
    async fn can_initialize_and_solve_simple() {
        let mut env = SokobanEnvironment::new(Config::default()).unwrap();
        let obs = env.initialize().await.unwrap();
        assert!(!obs.terminated);
        let obs = env.step(mv("up")).await.unwrap();
        assert!(obs.terminated, "one push up solves the simple level");
        assert_eq!(obs.data["extra"]["accepted"], json!(true));
        assert_eq!(obs.data["extra"]["pushed_crate"], json!(0));
        assert_eq!(obs.data["moves"], json!(1));
    }

    #[tokio::test]
    async fn consecutive_steps_are_not_dropped() {
        let cfg = Config { preset: Some("corridor".into()), ..Default::default() };
        let mut env = SokobanEnvironment::new(cfg).unwrap();
        env.initialize().await.unwrap();
        assert_eq!(env.step(mv("right")).await.unwrap().data["extra"]["accepted"], json!(true));
        let obs = env.step(mv("right")).await.unwrap();
        assert!(obs.terminated);
        assert_eq!(obs.data["room_text"], json!("######\n#  pg#\n######"));
    }

    #[tokio::test]
    async fn zero_step_seconds_drops_moves_until_wait() {
        let cfg = Config { preset: Some("corridor".into()), step_seconds: Some(0.0), ..Default::default() };
        let mut env = SokobanEnvironment::new(cfg).unwrap();
        assert_eq!(env.step(mv("right")).await.unwrap().data["extra"]["accepted"], json!(true));
        assert_eq!(env.step(mv("right")).await.unwrap().data["extra"]["accepted"], json!(false));
        let wait = vec![ToolCall { tool: "wait".into(), args: json!({ "seconds": 1.0 }) }];
        env.step(wait).await.unwrap();
        assert_eq!(env.step(mv("right")).await.unwrap().data["extra"]["accepted"], json!(true));
    }

    #[tokio::test]
    async fn reset_tool_restores_start() {
        let cfg = Config { preset: Some("corridor".into()), ..Default::default() };
        let mut env = SokobanEnvironment::new(cfg).unwrap();
        env.step(mv("right")).await.unwrap();
        let obs = env
            .step(vec![ToolCall { tool: "reset".into(), args: Json::Null }])
            .await
            .unwrap();
        assert_eq!(obs.data["extra"]["reset"], json!(true));
        assert_eq!(obs.data["moves"], json!(0));
        assert_eq!(obs.data["player"]["position"], json!({"row": 1, "col": 1}));
    }

    #[tokio::test]
    async fn truncates_after_max_steps() {
        let cfg = Config { preset: Some("corridor".into()), max_steps: Some(1), ..Default::default() };
        let mut env = SokobanEnvironment::new(cfg).unwrap();
        let obs = env.step(mv("up")).await.unwrap();
        assert!(!obs.terminated);
        assert!(obs.truncated);
    }

    #[tokio::test]
    async fn rejects_bad_input() {
        let mut env = SokobanEnvironment::new(Config::default()).unwrap();
        assert!(matches!(env.step(vec![]).await, Err(EngineError::Validation(_))));
        assert!(matches!(env.step(mv("north")).await, Err(EngineError::Validation(_))));
        let fly = vec![ToolCall { tool: "fly".into(), args: Json::Null }];
        assert!(matches!(env.step(fly).await, Err(EngineError::Validation(_))));
        let rewind = vec![ToolCall { tool: "wait".into(), args: json!({ "seconds": -1.0 }) }];
        assert!(matches!(env.step(rewind).await, Err(EngineError::Validation(_))));
    }

    #[test]
    fn config_errors_surface_as_engine_errors() {
        let bad_level = Config { level_text: Some("1 3\n cx\n".into()), ..Default::default() };
        assert!(matches!(SokobanEnvironment::new(bad_level), Err(EngineError::Validation(_))));
        let bad_preset = Config { preset: Some("nope".into()), ..Default::default() };
        assert!(matches!(SokobanEnvironment::new(bad_preset), Err(EngineError::NotFound(_))));
        let bad_game = Config {
            game: Some(GameConfig { frames_per_direction: 0, ..Default::default() }),
            ..Default::default()
        };
        assert!(matches!(SokobanEnvironment::new(bad_game), Err(EngineError::Validation(_))));
    }

    #[tokio::test]
    async fn broken_level_halts_with_internal_error() {
        // Two crates stacked on one cell: loading never produces this.
        let mut level = SimpleLevel::build().load().unwrap();
        let stacked = level.entities.crates()[0].position;
        level.entities = EntityRegistry::new(vec![stacked, stacked], vec![Point::new(1, 1), Point::new(1, 2)]).unwrap();
        let mut env = SokobanEnvironment::with_level(level, &Config::default()).unwrap();
        assert!(matches!(env.step(mv("left")).await, Err(EngineError::Internal(_))));
        assert!(env.session().fault().is_some());
        assert!(matches!(env.step(mv("right")).await, Err(EngineError::Internal(_))));
    }

    #[tokio::test]
    async fn checkpoint_carries_state() {
        let mut env = SokobanEnvironment::new(Config { seed: Some(3), ..Default::default() }).unwrap();
        env.step(mv("left")).await.unwrap();
        let snap = env.checkpoint().await.unwrap();
        assert_eq!(snap.engine, "sokoban");
        assert_eq!(snap.data["num_env_steps"], json!(1));
        assert!(snap.data["state"]["board"].is_object());
        assert_eq!(snap.data["view"]["level"], json!("seed-3"));
    }
}
