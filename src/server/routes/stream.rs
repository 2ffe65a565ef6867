//! Server-sent events for `/api/ask/stream`.
//!
//! The upstream answer is produced in one call, then replayed word by word:
//! `start`, one cumulative `chunk` per word, then `complete` (or `error`).

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chrono::Utc;
use futures::Stream;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, error};

use super::super::dto::AskRequest;
use super::super::error::ApiError;
use super::super::middleware::AuthUser;
use super::super::state::SharedState;
use crate::types::RequestType;

pub async fn stream(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    Json(req): Json<AskRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if req.prompt.trim().is_empty() {
        return Err(ApiError::bad_request("Prompt is required"));
    }
    debug!(uid = %user.uid, "starting answer stream");

    let (tx, rx) = mpsc::channel::<Value>(16);
    let delay = state.stream_chunk_delay();
    tokio::spawn(async move {
        if tx.send(json!({ "type": "start", "timestamp": Utc::now() })).await.is_err() {
            return;
        }
        let result = state
            .service()
            .generate_text(&req.prompt, RequestType::Text)
            .await;
        match result {
            Ok(generation) => replay(&tx, &generation.text, delay).await,
            Err(e) => {
                error!(error = %e, "stream generation failed");
                let _ = tx
                    .send(json!({ "type": "error", "error": e.to_string(), "timestamp": Utc::now() }))
                    .await;
            }
        }
    });

    let events = ReceiverStream::new(rx).map(|payload| Ok(Event::default().data(payload.to_string())));
    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

async fn replay(tx: &mpsc::Sender<Value>, text: &str, delay: Duration) {
    let words: Vec<&str> = text.split(' ').collect();
    let total = words.len();
    let mut current = String::with_capacity(text.len());

    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            current.push(' ');
        }
        current.push_str(word);
        let chunk = json!({
            "type": "chunk",
            "content": current,
            "progress": (i + 1) as f64 / total as f64,
        });
        if tx.send(chunk).await.is_err() {
            return;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    let _ = tx
        .send(json!({ "type": "complete", "content": text, "timestamp": Utc::now() }))
        .await;
}
