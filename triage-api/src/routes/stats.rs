use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::instrument;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(stats))
}

#[derive(Serialize)]
struct IndexStats {
    total_tickets: usize,
    dimension: usize,
    generation: u64,
}

#[instrument(name = "GET /stats", skip(app_state))]
async fn stats(State(app_state): State<AppState>) -> Json<IndexStats> {
    let snapshot = app_state.index.snapshot();

    Json(IndexStats {
        total_tickets: snapshot.len(),
        dimension: snapshot.dimension(),
        generation: snapshot.generation(),
    })
}
