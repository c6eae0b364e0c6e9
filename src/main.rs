//! Course Draft Editor · authoring backend
//!
//! - Axum HTTP + WebSocket API driving in-memory course draft sessions
//! - Cover image validation and base64 previews
//! - Multipart submission of the finished draft to the course API
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   EDITOR_CONFIG_PATH  : path to TOML config (course API + image limits)
//!   COURSE_API_BASE_URL : overrides `api.base_url` from the config
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod path;
mod tree;
mod image;
mod editor;
mod client;
mod config;
mod protocol;
mod state;
mod logic;
mod routes;
#[cfg(test)]
mod testing;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

use crate::routes::build_router;
use crate::state::{spawn_session_sweeper, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: session registry, course API client, config.
  let state = Arc::new(AppState::new()?);

  let sweeper = spawn_session_sweeper(state.clone());
  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "course_editor", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      info!(target: "course_editor", "Shutdown signal received");
    })
    .await?;
  sweeper.abort();
  Ok(())
}
