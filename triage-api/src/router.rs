use axum::{http::header, http::Method, routing::get, Json, Router};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::{app_state::AppState, routes};

pub fn create(app_state: AppState) -> Router<()> {
    let api = Router::new()
        .route("/", get(|| async { "Ticket Triage Assistant API" }))
        .route("/health", get(health))
        .nest("/chat", routes::chat::router())
        .nest("/sync", routes::sync::router())
        .nest("/stats", routes::stats::router());

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any);

    api.with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": "triage-api" }))
}
