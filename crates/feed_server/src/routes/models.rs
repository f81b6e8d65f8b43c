//! Model catalogue and per-instrument configuration endpoints

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, put},
    Router,
};
use feed_engine::{EngineError, InstrumentConfigurations};
use feed_models::{ModelConfig, ModelType, WalkStep};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

/// Supported model tags
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsResponse {
    pub models: Vec<ModelType>,
}

/// Body of a model switch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchModelRequest {
    /// Model tag, matched case-insensitively
    pub model_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchModelResponse {
    pub instrument: String,
    pub previous: ModelType,
    pub current: ModelType,
}

/// Body of a tick interval update
///
/// Signed so that non-positive values reach validation instead of failing
/// deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickIntervalRequest {
    pub tick_interval_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickIntervalResponse {
    pub instrument: String,
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomMultiplicativeRequest {
    pub standard_deviation: f64,
    pub mean: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeanRevertingRequest {
    pub mean: f64,
    pub kappa: f64,
    pub sigma: f64,
    pub dt: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomAdditiveWalkRequest {
    pub steps: Vec<WalkStep>,
}

/// Stored configuration after an update
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub instrument: String,
    pub config: ModelConfig,
}

/// Build the model routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/models", get(supported_models_handler))
        .route("/api/v1/instruments/{name}/config", get(configurations_handler))
        .route("/api/v1/instruments/{name}/model", put(switch_model_handler))
        .route(
            "/api/v1/instruments/{name}/tick-interval",
            put(tick_interval_handler),
        )
        .route(
            "/api/v1/instruments/{name}/config/random-multiplicative",
            put(random_multiplicative_handler),
        )
        .route(
            "/api/v1/instruments/{name}/config/mean-reverting",
            put(mean_reverting_handler),
        )
        .route(
            "/api/v1/instruments/{name}/config/random-additive-walk",
            put(random_additive_walk_handler),
        )
}

/// GET /api/v1/models
async fn supported_models_handler(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: state.service.get_supported_models(),
    })
}

/// GET /api/v1/instruments/{name}/config
async fn configurations_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<InstrumentConfigurations>, ApiError> {
    let configurations = state.service.get_configurations(&name).await?;
    Ok(Json(configurations))
}

/// PUT /api/v1/instruments/{name}/model
async fn switch_model_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<SwitchModelRequest>,
) -> Result<Json<SwitchModelResponse>, ApiError> {
    let current = request
        .model_type
        .parse::<ModelType>()
        .map_err(EngineError::from)?;
    let previous = state.service.switch_model(&name, current.as_str()).await?;

    tracing::info!(instrument = %name, %previous, %current, "Model switched");
    Ok(Json(SwitchModelResponse {
        instrument: name,
        previous,
        current,
    }))
}

/// PUT /api/v1/instruments/{name}/tick-interval
async fn tick_interval_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<TickIntervalRequest>,
) -> Result<Json<TickIntervalResponse>, ApiError> {
    let tick_interval_ms = state
        .service
        .update_tick_interval(&name, request.tick_interval_ms)
        .await?;
    Ok(Json(TickIntervalResponse {
        instrument: name,
        tick_interval_ms,
    }))
}

/// PUT /api/v1/instruments/{name}/config/random-multiplicative
async fn random_multiplicative_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<RandomMultiplicativeRequest>,
) -> Result<Json<ConfigResponse>, ApiError> {
    let config = state
        .service
        .update_random_multiplicative_config(&name, request.standard_deviation, request.mean)
        .await?;
    Ok(Json(ConfigResponse {
        instrument: name,
        config,
    }))
}

/// PUT /api/v1/instruments/{name}/config/mean-reverting
async fn mean_reverting_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<MeanRevertingRequest>,
) -> Result<Json<ConfigResponse>, ApiError> {
    let config = state
        .service
        .update_mean_reverting_config(
            &name,
            request.mean,
            request.kappa,
            request.sigma,
            request.dt,
        )
        .await?;
    Ok(Json(ConfigResponse {
        instrument: name,
        config,
    }))
}

/// PUT /api/v1/instruments/{name}/config/random-additive-walk
async fn random_additive_walk_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<RandomAdditiveWalkRequest>,
) -> Result<Json<ConfigResponse>, ApiError> {
    let config = state
        .service
        .update_random_additive_walk_config(&name, request.steps)
        .await?;
    Ok(Json(ConfigResponse {
        instrument: name,
        config,
    }))
}
