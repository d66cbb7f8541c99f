//! Chat endpoints: JSON request/response and SSE with heartbeats

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::post,
};
use serde::Serialize;
use tokio_stream::wrappers::ReceiverStream;

use super::ApiState;
use crate::Error;
use crate::assistant::ChatRequest;

/// Build chat router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/stream", post(chat_stream))
        .with_state(state)
}

/// Successful chat reply
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Error body for every chat failure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler-level errors
#[derive(Debug)]
pub enum ChatError {
    BadRequest(String),
    PayloadTooLarge(String),
    Timeout(String),
    Internal(String),
}

impl From<Error> for ChatError {
    fn from(err: Error) -> Self {
        match err {
            Error::BadRequest(m) => Self::BadRequest(m),
            Error::PayloadTooLarge(m) => Self::PayloadTooLarge(m),
            Error::Timeout(_) => Self::Timeout(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, m),
            Self::Timeout(m) => (StatusCode::GATEWAY_TIMEOUT, m),
            Self::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Check the body before any fetch or model call
fn validate(
    state: &ApiState,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> crate::Result<ChatRequest> {
    let Json(request) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge("Request body too large.".to_string())
        } else {
            Error::BadRequest(rejection.body_text())
        }
    })?;

    if request.message.trim().is_empty() {
        return Err(Error::BadRequest("A message is required.".to_string()));
    }

    if let Some(user_id) = request.user_id.as_deref()
        && !is_entry_id(user_id)
    {
        return Err(Error::BadRequest(
            "The FPL user ID must be a number.".to_string(),
        ));
    }

    let image_chars = request.image.as_ref().map_or(0, String::len);
    if image_chars > state.max_image_chars {
        tracing::warn!(image_chars, max = state.max_image_chars, "rejecting oversized image");
        return Err(Error::PayloadTooLarge(format!(
            "Image too large: {image_chars} characters exceeds the {} character limit. Please upload a smaller screenshot.",
            state.max_image_chars
        )));
    }

    Ok(request)
}

/// FPL entry ids are plain decimal numbers
fn is_entry_id(value: &str) -> bool {
    !value.is_empty() && value.len() <= 12 && value.bytes().all(|b| b.is_ascii_digit())
}

/// Answer a chat turn
async fn chat(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ChatError> {
    let request = validate(&state, payload)?;
    let response = state.assistant.respond(&request).await?;
    Ok(Json(ChatResponse { response }))
}

/// Answer a chat turn over SSE, sending heartbeats while the model works
async fn chat_stream(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ChatError> {
    let request = validate(&state, payload)?;
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(16);

    tokio::spawn(async move {
        let respond = state.assistant.respond(&request);
        tokio::pin!(respond);

        let mut heartbeat = tokio::time::interval(state.heartbeat);
        // The first tick completes immediately
        heartbeat.tick().await;

        loop {
            tokio::select! {
                result = &mut respond => {
                    let event = match result {
                        Ok(response) => Event::default()
                            .event("message")
                            .data(serde_json::to_string(&ChatResponse { response }).unwrap_or_default()),
                        Err(e) => Event::default()
                            .event("error")
                            .data(serde_json::to_string(&ErrorResponse { error: e.to_string() }).unwrap_or_default()),
                    };
                    let _ = tx.send(Ok(event)).await;
                    break;
                }
                _ = heartbeat.tick() => {
                    let beat = Event::default().event("heartbeat").data(r#"{"status":"working"}"#);
                    if tx.send(Ok(beat)).await.is_err() {
                        tracing::debug!("stream client disconnected");
                        break;
                    }
                }
            }
        }
    });

    Ok(Sse::new(ReceiverStream::new(rx)))
}
