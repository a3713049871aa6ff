use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::post,
    Json, Router,
};
use futures_util::Stream;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::instrument;

use crate::{
    domain::{ResponseEnvelope, ResponseType},
    routes::ApiError,
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(chat))
        .route("/stream", post(chat_stream))
}

#[derive(Debug, Clone, Deserialize)]
struct ChatRequest {
    session_id: String,
    question: String,
}

#[instrument(name = "POST /chat", skip(app_state, request))]
async fn chat(
    State(app_state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ResponseEnvelope>, ApiError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::bad_request("Question cannot be empty"));
    }

    let envelope = app_state
        .orchestrator
        .handle(&request.session_id, question)
        .await;

    Ok(Json(envelope))
}

/// Streaming variant of `/chat`: the same orchestration with ordered
/// progress markers around it, terminated by a `complete` event carrying
/// the full envelope. Framing only — routing decisions are identical to
/// the non-streaming endpoint.
#[instrument(name = "POST /chat/stream", skip(app_state, request))]
async fn chat_stream(
    State(app_state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Event>(16);

    tokio::spawn(async move {
        let question = request.question.trim().to_string();
        if question.is_empty() {
            let _ = tx
                .send(named_event(
                    "error",
                    json!({ "message": "Question cannot be empty" }),
                ))
                .await;
            return;
        }

        let _ = tx
            .send(named_event(
                "start",
                json!({ "message": "Processing your request..." }),
            ))
            .await;
        let _ = tx
            .send(named_event(
                "guardrail",
                json!({ "message": "Validating request..." }),
            ))
            .await;
        let _ = tx
            .send(named_event(
                "orchestrator",
                json!({ "message": "Analyzing intent..." }),
            ))
            .await;
        let _ = tx
            .send(named_event(
                "similarity-search-started",
                json!({ "message": "Searching for similar tickets..." }),
            ))
            .await;

        let envelope = app_state
            .orchestrator
            .handle(&request.session_id, &question)
            .await;

        let outcome = match envelope.response_type {
            ResponseType::Created | ResponseType::Updated => named_event(
                "mutation-done",
                json!({
                    "message": envelope.message.clone(),
                    "ticket_key": envelope.tickets.first().map(|t| t.key.clone()),
                }),
            ),
            ResponseType::Similar if !envelope.tickets.is_empty() => named_event(
                "similarity-found",
                json!({
                    "message": format!("Found {} similar ticket(s)", envelope.tickets.len()),
                    "count": envelope.tickets.len(),
                }),
            ),
            ResponseType::Similar => named_event(
                "similarity-not-found",
                json!({ "message": "No similar tickets found" }),
            ),
        };
        let _ = tx.send(outcome).await;

        if let Some(error) = &envelope.error {
            let _ = tx
                .send(named_event("error", json!({ "message": error })))
                .await;
        }

        let _ = tx
            .send(named_event("complete", json!({ "result": envelope })))
            .await;
    });

    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (Ok(event), rx))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn named_event(name: &str, payload: serde_json::Value) -> Event {
    Event::default()
        .event(name)
        .json_data(payload)
        .unwrap_or_else(|_| Event::default().event(name.to_string()))
}
