//! JSON-RPC 2.0 dispatcher.
//!
//! Maps the A2A methods onto task manager operations:
//! - `message/send` — create (or continue) a task, wait for it to settle,
//!   return the final snapshot
//! - `tasks/get` — return the current snapshot
//! - `tasks/cancel` — request cancellation
//!
//! `message/stream` is served by the SSE endpoint; requesting it here
//! returns an invalid-request error pointing at `/a2a/stream`.

use crate::server::AppState;
use agora_core::{codes, Message, Result as CoreResult, RouteRequirements, Task};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// JSON-RPC 2.0 request.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default = "default_jsonrpc")]
    #[allow(dead_code)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Success response.
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response.
    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Parameters for `message/send` and `message/stream`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendParams {
    /// The message to process
    pub message: Message,
    /// Requested skill tags; empty means any agent
    #[serde(default)]
    pub skills: Vec<String>,
    /// Explicit agent pin
    #[serde(default)]
    pub agent: Option<String>,
}

impl MessageSendParams {
    /// Routing requirements carried by these params.
    pub fn requirements(&self) -> RouteRequirements {
        RouteRequirements {
            tags: self.skills.iter().cloned().collect(),
            agent: self.agent.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TaskIdParams {
    id: String,
}

/// Axum handler for `POST /a2a`.
pub async fn handle_http(
    State(state): State<AppState>,
    payload: Result<Json<JsonRpcRequest>, JsonRejection>,
) -> Json<JsonRpcResponse> {
    match payload {
        Ok(Json(request)) => Json(handle(&state, request).await),
        Err(rejection) => Json(JsonRpcResponse::error(
            Value::Null,
            codes::PARSE_ERROR,
            format!("Parse error: {}", rejection),
        )),
    }
}

/// Dispatch one JSON-RPC request.
pub async fn handle(state: &AppState, request: JsonRpcRequest) -> JsonRpcResponse {
    debug!(method = %request.method, "Handling JSON-RPC request");
    match request.method.as_str() {
        "message/send" => message_send(state, request.id, request.params).await,
        "message/stream" => JsonRpcResponse::error(
            request.id,
            codes::INVALID_REQUEST,
            "message/stream must be sent to the /a2a/stream endpoint",
        ),
        "tasks/get" => tasks_get(state, request.id, request.params).await,
        "tasks/cancel" => tasks_cancel(state, request.id, request.params).await,
        other => JsonRpcResponse::error(
            request.id,
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", other),
        ),
    }
}

async fn message_send(state: &AppState, id: Value, params: Value) -> JsonRpcResponse {
    let params: MessageSendParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => {
            return JsonRpcResponse::error(
                id,
                codes::INVALID_PARAMS,
                format!("Invalid params: {}", err),
            )
        }
    };
    respond(id, send_message(state, params).await)
}

/// Create a new task, or continue one waiting for input when the message
/// carries a task id; either way wait for it to settle.
pub async fn send_message(state: &AppState, params: MessageSendParams) -> CoreResult<Task> {
    let requirements = params.requirements();
    let handle = match params.message.task_id.clone() {
        Some(task_id) => {
            state
                .manager
                .continue_task(&task_id, params.message)
                .await?
        }
        None => {
            state
                .manager
                .create_and_run(params.message, requirements)
                .await
        }
    };
    handle.wait().await
}

async fn tasks_get(state: &AppState, id: Value, params: Value) -> JsonRpcResponse {
    let params: TaskIdParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => {
            return JsonRpcResponse::error(
                id,
                codes::INVALID_PARAMS,
                format!("Invalid params: {}", err),
            )
        }
    };
    respond(id, state.manager.get(&params.id).await)
}

async fn tasks_cancel(state: &AppState, id: Value, params: Value) -> JsonRpcResponse {
    let params: TaskIdParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(err) => {
            return JsonRpcResponse::error(
                id,
                codes::INVALID_PARAMS,
                format!("Invalid params: {}", err),
            )
        }
    };
    respond(id, state.manager.cancel(&params.id).await)
}

fn respond(id: Value, result: CoreResult<Task>) -> JsonRpcResponse {
    match result {
        Ok(task) => match serde_json::to_value(&task) {
            Ok(value) => JsonRpcResponse::ok(id, value),
            Err(err) => JsonRpcResponse::error(
                id,
                codes::INTERNAL_ERROR,
                format!("Serialization error: {}", err),
            ),
        },
        Err(err) => JsonRpcResponse::error(id, err.code(), err.to_string()),
    }
}
