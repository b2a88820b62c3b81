use crate::config::{GeneratorConfig, ServerConfig};
use crate::data::{GenerationInput, GenerationOutput, LabTimetable};
use crate::error::GenerationError;
use crate::generator::Generator;
use crate::store::MemoryTimetableStore;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared by all handlers. The lock also serializes generation runs.
#[derive(Clone, Default)]
pub struct AppState {
    pub store: Arc<Mutex<MemoryTimetableStore>>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(flatten)]
    pub input: GenerationInput,
    #[serde(default)]
    pub config: GeneratorConfig,
}

pub struct ApiError(GenerationError);

impl From<GenerationError> for ApiError {
    fn from(e: GenerationError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GenerationError::MissingInput(_) => StatusCode::BAD_REQUEST,
            GenerationError::Infeasible { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            GenerationError::SearchAborted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GenerationError::StrategyUnavailable(_) => StatusCode::NOT_IMPLEMENTED,
            GenerationError::Store(_) | GenerationError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

async fn generate_handler(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerationOutput>, ApiError> {
    let mut store = state.store.clone().lock_owned().await;
    let output = tokio::task::spawn_blocking(move || {
        Generator::new(&req.input, req.config).generate(&mut *store)
    })
    .await
    .map_err(|e| GenerationError::Internal(format!("generation task failed: {e}")))??;
    Ok(Json(output))
}

async fn timetable_handler(State(state): State<AppState>) -> Json<Vec<LabTimetable>> {
    Json(state.store.lock().await.timetables().to_vec())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/timetable/generate", post(generate_handler))
        .route("/v1/timetable", get(timetable_handler))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    let app = router(AppState::default());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);

    axum::serve(listener, app).await.inspect_err(|e| {
        error!("Server error: {e}");
    })
}
