use std::{collections::HashMap, sync::Arc, sync::atomic::{AtomicU64, Ordering}};

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sokoban_env::{Config, EngineError, Environment, Observation, Snapshot, SokobanEnvironment, ToolCall};
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AppState {
    store: Arc<RwLock<HashMap<String, Box<dyn Environment>>>>,
    id_ctr: Arc<AtomicU64>,
}

impl AppState {
    fn new() -> Self {
        Self { store: Arc::new(RwLock::new(HashMap::new())), id_ctr: Arc::new(AtomicU64::new(1)) }
    }
    fn next_id(&self) -> String { format!("env-{}", self.id_ctr.fetch_add(1, Ordering::Relaxed)) }
}

#[derive(Deserialize)]
pub struct InitRequest {
    #[serde(default)]
    pub config: Option<JsonValue>,
}

#[derive(Serialize)]
pub struct InitResponse {
    pub env_id: String,
    pub observation: Observation,
}

#[derive(Deserialize)]
pub struct StepRequest {
    pub env_id: String,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize)]
pub struct IdRequest { pub env_id: String }

pub fn make_app() -> Router {
    let state = AppState::new();
    Router::new()
        .route("/health", get(health))
        .route("/presets", get(presets))
        .route("/initialize", post(initialize))
        .route("/step", post(step))
        .route("/checkpoint", post(checkpoint))
        .route("/terminate", post(terminate))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let live = state.store.read().await.len();
    Json(serde_json::json!({ "status": "ok", "environments": live }))
}

async fn presets() -> impl IntoResponse {
    Json(sokoban_rs::preset_names())
}

async fn initialize(State(state): State<AppState>, Json(req): Json<InitRequest>) -> Result<Json<InitResponse>, (StatusCode, String)> {
    let config: Config = match req.config {
        Some(v) => serde_json::from_value(v).map_err(|e| map_engine_err(EngineError::Validation(format!("bad config: {e}"))))?,
        None => Config::default(),
    };
    let mut env: Box<dyn Environment> = Box::new(SokobanEnvironment::new(config).map_err(map_engine_err)?);
    let obs = env.initialize().await.map_err(map_engine_err)?;
    let id = state.next_id();
    log::info!("created {id}");
    state.store.write().await.insert(id.clone(), env);
    Ok(Json(InitResponse { env_id: id, observation: obs }))
}

async fn step(State(state): State<AppState>, Json(req): Json<StepRequest>) -> Result<Json<Observation>, (StatusCode, String)> {
    let mut guard = state.store.write().await;
    let env = guard.get_mut(&req.env_id).ok_or((StatusCode::NOT_FOUND, format!("env {} not found", req.env_id)))?;
    let obs = env.step(req.tool_calls).await.map_err(map_engine_err)?;
    Ok(Json(obs))
}

async fn checkpoint(State(state): State<AppState>, Json(req): Json<IdRequest>) -> Result<Json<Snapshot>, (StatusCode, String)> {
    let guard = state.store.read().await;
    let env = guard.get(&req.env_id).ok_or((StatusCode::NOT_FOUND, format!("env {} not found", req.env_id)))?;
    let snap = env.checkpoint().await.map_err(map_engine_err)?;
    Ok(Json(snap))
}

async fn terminate(State(state): State<AppState>, Json(req): Json<IdRequest>) -> Result<Json<Observation>, (StatusCode, String)> {
    let mut env = state
        .store
        .write()
        .await
        .remove(&req.env_id)
        .ok_or((StatusCode::NOT_FOUND, format!("env {} not found", req.env_id)))?;
    let obs = env.terminate().await.map_err(map_engine_err)?;
    log::info!("terminated {}", req.env_id);
    Ok(Json(obs))
}

fn map_engine_err(err: EngineError) -> (StatusCode, String) {
    log::warn!("request failed: {err}");
    match err {
        EngineError::Validation(s) => (StatusCode::BAD_REQUEST, s),
        EngineError::NotFound(s) => (StatusCode::NOT_FOUND, s),
        EngineError::Internal(s) => (StatusCode::INTERNAL_SERVER_ERROR, s),
    }
}
