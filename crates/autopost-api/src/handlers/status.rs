//! Run status and manual trigger handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use autopost_models::RunStatus;

use crate::state::AppState;

/// Current run status snapshot.
///
/// Reads never block an in-flight run beyond the brief status lock, and the
/// snapshot is taken under the same lock as writes, so the fields are always
/// mutually consistent.
pub async fn get_status(State(state): State<AppState>) -> Json<RunStatus> {
    Json(state.orchestrator.snapshot())
}

/// Response for the manual trigger endpoint.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub status: &'static str,
    pub message: String,
}

/// Start a publishing run on demand.
///
/// Returns as soon as the run slot is claimed; the run proceeds in the
/// background and its result becomes visible via `/status`. A run already
/// in flight yields a structured error, never a second run.
pub async fn run_now(State(state): State<AppState>) -> (StatusCode, Json<TriggerResponse>) {
    match state.orchestrator.manual_trigger() {
        Ok(run_id) => (
            StatusCode::OK,
            Json(TriggerResponse {
                status: "success",
                message: format!("publishing run {run_id} started"),
            }),
        ),
        Err(e) => (
            StatusCode::CONFLICT,
            Json(TriggerResponse {
                status: "error",
                message: e.to_string(),
            }),
        ),
    }
}
