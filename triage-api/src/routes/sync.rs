use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::instrument;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(trigger_sync))
}

#[derive(Serialize)]
struct SyncResponse {
    message: String,
    status: String,
}

/// Kick off an on-demand sync. A request arriving while a run is active is
/// acknowledged immediately without starting a second execution; the
/// pipeline's single-flight permit guarantees that even when this check
/// races with a starting run.
#[instrument(name = "POST /sync", skip(app_state))]
async fn trigger_sync(State(app_state): State<AppState>) -> Json<SyncResponse> {
    if app_state.pipeline.is_running() {
        return Json(SyncResponse {
            message: "Ticket sync already in progress".to_string(),
            status: "already-running".to_string(),
        });
    }

    let pipeline = app_state.pipeline.clone();
    tokio::spawn(async move {
        if let Err(e) = pipeline.run().await {
            tracing::error!(error = %e, "Manual sync failed");
        }
    });

    Json(SyncResponse {
        message: "Ticket sync triggered successfully".to_string(),
        status: "running".to_string(),
    })
}
