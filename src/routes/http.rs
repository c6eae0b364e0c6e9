//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented with the session id and basic result info.

use std::sync::Arc;

use axum::{
  extract::{Multipart, Path, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::image::ImageFile;
use crate::logic::{handle_command, select_image, snapshot, submit_draft};
use crate::protocol::*;
use crate::state::{AppState, SessionHandle};

type Reply = (StatusCode, Json<ServerEvent>);

fn status_of(ev: &ServerEvent) -> StatusCode {
  match ev {
    ServerEvent::Error { code, .. } => match code {
      ErrorCode::Validation => StatusCode::UNPROCESSABLE_ENTITY,
      ErrorCode::NotFound => StatusCode::NOT_FOUND,
      ErrorCode::Conflict => StatusCode::CONFLICT,
      ErrorCode::Upstream => StatusCode::BAD_GATEWAY,
    },
    _ => StatusCode::OK,
  }
}

fn reply(ev: ServerEvent) -> Reply {
  (status_of(&ev), Json(ev))
}

async fn lookup(state: &AppState, id: Uuid) -> Result<SessionHandle, Reply> {
  state
    .session(id)
    .await
    .ok_or_else(|| reply(ServerEvent::error(ErrorCode::NotFound, format!("Unknown draft session: {id}"))))
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_create_draft(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let (id, handle) = state.open_session().await;
  info!(target: "draft", session = %id, "HTTP draft session created");
  (StatusCode::CREATED, Json(snapshot(&handle).await))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_draft(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Reply, Reply> {
  let handle = lookup(&state, id).await?;
  Ok(reply(snapshot(&handle).await))
}

#[instrument(level = "info", skip(state, cmd))]
pub async fn http_post_command(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  Json(cmd): Json<EditCommand>,
) -> Result<Reply, Reply> {
  let handle = lookup(&state, id).await?;
  Ok(reply(handle_command(&state, &handle, cmd).await))
}

/// Multipart upload with a single `image` file field; its declared content type is what gets validated.
#[instrument(level = "info", skip(state, multipart))]
pub async fn http_post_image(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  mut multipart: Multipart,
) -> Result<Reply, Reply> {
  let handle = lookup(&state, id).await?;
  loop {
    let field = match multipart.next_field().await {
      Ok(Some(field)) => field,
      Ok(None) => break,
      Err(e) => {
        warn!(target: "draft", session = %id, error = %e, "Unreadable multipart body");
        return Err(reply(ServerEvent::error(ErrorCode::Validation, format!("Invalid multipart body: {e}"))));
      }
    };
    if field.name() != Some("image") {
      continue;
    }
    let file_name = field.file_name().unwrap_or("image").to_string();
    let mime = field.content_type().unwrap_or("application/octet-stream").to_string();
    let bytes = field
      .bytes()
      .await
      .map_err(|e| reply(ServerEvent::error(ErrorCode::Validation, format!("Failed to read image: {e}"))))?;
    return Ok(reply(select_image(&handle, ImageFile::new(file_name, mime, bytes.to_vec())).await));
  }
  Err(reply(ServerEvent::error(ErrorCode::Validation, "Multipart body has no 'image' field")))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_submit(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<Reply, Reply> {
  let handle = lookup(&state, id).await?;
  let ev = submit_draft(&state, &handle).await;
  if let ServerEvent::Submitted { course_id, location } = &ev {
    info!(target: "submit", session = %id, %course_id, %location, "HTTP submission accepted");
  }
  Ok(reply(ev))
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_draft(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> StatusCode {
  if state.close_session(id).await { StatusCode::NO_CONTENT } else { StatusCode::NOT_FOUND }
}
