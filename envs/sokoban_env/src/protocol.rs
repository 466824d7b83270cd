//! Tool-call protocol shared by the environment and the HTTP service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Canonical tool call: tool name and JSON-serializable arguments.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub args: Json,
}

/// Observation contract. Enforces presence of terminated/truncated; additional fields live in `data`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub terminated: bool,
    pub truncated: bool,
    #[serde(default)]
    pub data: Json,
}

/// Snapshot contract for checkpoints.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub version: u32,
    pub engine: String,
    pub data: Json,
}

/// Environment errors mapped to HTTP responses by services.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sokoban_rs::LoadError> for EngineError {
    fn from(e: sokoban_rs::LoadError) -> Self {
        match e {
            sokoban_rs::LoadError::Io(io) => EngineError::Internal(format!("level io: {io}")),
            other => EngineError::Validation(other.to_string()),
        }
    }
}

impl From<sokoban_rs::ConfigError> for EngineError {
    fn from(e: sokoban_rs::ConfigError) -> Self {
        EngineError::Validation(e.to_string())
    }
}

#[async_trait]
pub trait Environment: Send + Sync {
    async fn initialize(&mut self) -> Result<Observation, EngineError>;
    async fn step(&mut self, tool_calls: Vec<ToolCall>) -> Result<Observation, EngineError>;
    async fn checkpoint(&self) -> Result<Snapshot, EngineError>;
    async fn terminate(&mut self) -> Result<Observation, EngineError>;
}
