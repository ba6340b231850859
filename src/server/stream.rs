//! SSE endpoint for `message/stream`.
//!
//! Creates (or continues) a task and forwards its event stream as
//! server-sent events, each framed as a JSON-RPC result. The stream closes
//! after the final status event.

use crate::server::rpc::{JsonRpcRequest, JsonRpcResponse, MessageSendParams};
use crate::server::AppState;
use agora_core::{codes, TaskEvent};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use futures::StreamExt;
use serde_json::{json, Value};
use std::convert::Infallible;

/// SSE event name for a task event.
fn event_name(event: &TaskEvent) -> &'static str {
    match event {
        TaskEvent::StatusUpdate { .. } => "task.status",
        TaskEvent::ArtifactUpdate { .. } => "task.artifact",
    }
}

/// Frame a task event as a JSON-RPC result payload.
fn frame(rpc_id: &Value, event: &TaskEvent) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": rpc_id,
        "result": event,
    })
}

/// Axum handler for `POST /a2a/stream`.
pub async fn handle_http(
    State(state): State<AppState>,
    payload: Result<Json<JsonRpcRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return Json(JsonRpcResponse::error(
                Value::Null,
                codes::PARSE_ERROR,
                format!("Parse error: {}", rejection),
            ))
            .into_response()
        }
    };

    if request.method != "message/stream" {
        return Json(JsonRpcResponse::error(
            request.id,
            codes::INVALID_REQUEST,
            "Only message/stream is served on this endpoint",
        ))
        .into_response();
    }

    let params: MessageSendParams = match serde_json::from_value(request.params) {
        Ok(params) => params,
        Err(err) => {
            return Json(JsonRpcResponse::error(
                request.id,
                codes::INVALID_PARAMS,
                format!("Invalid params: {}", err),
            ))
            .into_response()
        }
    };

    let requirements = params.requirements();
    let handle = match params.message.task_id.clone() {
        Some(task_id) => match state.manager.continue_task(&task_id, params.message).await {
            Ok(handle) => handle,
            Err(err) => {
                return Json(JsonRpcResponse::error(
                    request.id,
                    err.code(),
                    err.to_string(),
                ))
                .into_response()
            }
        },
        None => {
            state
                .manager
                .create_and_run(params.message, requirements)
                .await
        }
    };

    let rpc_id = request.id;
    let stream = handle.into_events().map(move |event| {
        Ok::<_, Infallible>(
            Event::default()
                .event(event_name(&event))
                .data(frame(&rpc_id, &event).to_string()),
        )
    });

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}
