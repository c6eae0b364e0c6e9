//! WebSocket upgrade + message loop. Each client message is parsed as an `EditCommand` and
//! forwarded to core logic. We reply with a single JSON `ServerEvent` per message.
//!
//! `/ws?session=<id>` attaches to an existing draft session; without it a new session is opened
//! and closed again when the socket goes away.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    Query, State, WebSocketUpgrade,
  },
  http::StatusCode,
  response::{IntoResponse, Response},
};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::logic::{handle_command, snapshot};
use crate::protocol::{EditCommand, ErrorCode, ServerEvent, WsQuery};
use crate::state::{AppState, SessionHandle};

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(
  ws: WebSocketUpgrade,
  State(state): State<Arc<AppState>>,
  Query(q): Query<WsQuery>,
) -> Response {
  let (id, handle, owned) = match q.session {
    Some(id) => match state.session(id).await {
      Some(handle) => (id, handle, false),
      None => return (StatusCode::NOT_FOUND, format!("Unknown draft session: {id}")).into_response(),
    },
    None => {
      let (id, handle) = state.open_session().await;
      (id, handle, true)
    }
  };
  info!(target: "course_editor", session = %id, owned, "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| async move {
    handle_ws(socket, &state, id, handle).await;
    if owned {
      state.close_session(id).await;
    }
  })
}

fn encode(ev: &ServerEvent) -> String {
  serde_json::to_string(ev).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "code": "validation", "message": format!("Serialization error: {}", e) }).to_string()
  })
}

#[instrument(level = "info", skip(socket, state, handle))]
async fn handle_ws(mut socket: WebSocket, state: &AppState, id: Uuid, handle: SessionHandle) {
  info!(target: "course_editor", session = %id, "WebSocket connected");

  // Greet with the current snapshot so the client learns its session id.
  let hello = encode(&snapshot(&handle).await);
  if let Err(e) = socket.send(Message::Text(hello)).await {
    error!(target: "course_editor", error = %e, "WS send error");
    return;
  }

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply = match serde_json::from_str::<EditCommand>(&txt) {
          Ok(cmd) => {
            debug!(target: "course_editor", session = %id, len = txt.len(), "WS command received");
            handle_command(state, &handle, cmd).await
          }
          Err(e) => ServerEvent::error(ErrorCode::Validation, format!("Invalid JSON: {}", e)),
        };
        let done = matches!(reply, ServerEvent::Submitted { .. });

        if let Err(e) = socket.send(Message::Text(encode(&reply))).await {
          error!(target: "course_editor", error = %e, "WS send error");
          break;
        }
        if done {
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "course_editor", session = %id, "WebSocket disconnected");
}
