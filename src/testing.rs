//! Test-only mock of the course API: an axum server on an ephemeral port that records uploads.

use std::sync::Arc;

use axum::{
  extract::{Multipart, State},
  http::StatusCode,
  routing::post,
  Json, Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

#[derive(Clone)]
pub enum MockReply {
  Created(Value),
  Rejected(u16, Value),
}

#[derive(Clone, Debug, Default)]
pub struct ReceivedUpload {
  pub image_bytes: Vec<u8>,
  pub image_name: Option<String>,
  pub image_type: Option<String>,
  pub course_data: Value,
}

#[derive(Clone)]
struct MockState {
  reply: MockReply,
  received: Arc<Mutex<Vec<ReceivedUpload>>>,
}

pub struct MockApi {
  pub base_url: String,
  received: Arc<Mutex<Vec<ReceivedUpload>>>,
}

impl MockApi {
  pub async fn received(&self) -> Vec<ReceivedUpload> {
    self.received.lock().await.clone()
  }
}

async fn create_course(State(state): State<MockState>, mut multipart: Multipart) -> (StatusCode, Json<Value>) {
  let mut upload = ReceivedUpload::default();
  while let Ok(Some(field)) = multipart.next_field().await {
    let name = field.name().map(str::to_string);
    match name.as_deref() {
      Some("image") => {
        upload.image_name = field.file_name().map(str::to_string);
        upload.image_type = field.content_type().map(str::to_string);
        upload.image_bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
      }
      Some("courseData") => {
        let text = field.text().await.unwrap_or_default();
        upload.course_data = serde_json::from_str(&text).unwrap_or(Value::Null);
      }
      _ => {}
    }
  }
  state.received.lock().await.push(upload);

  match state.reply {
    MockReply::Created(body) => (StatusCode::CREATED, Json(body)),
    MockReply::Rejected(code, body) => {
      (StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST), Json(body))
    }
  }
}

/// Start the mock; it lives until the test's runtime shuts down.
pub async fn spawn_mock_api(reply: MockReply) -> MockApi {
  let received = Arc::new(Mutex::new(Vec::new()));
  let app = Router::new()
    .route("/courses", post(create_course))
    .with_state(MockState { reply, received: received.clone() });

  let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock api");
  let addr = listener.local_addr().expect("mock api addr");
  tokio::spawn(async move {
    let _ = axum::serve(listener, app).await;
  });
  MockApi { base_url: format!("http://{addr}"), received }
}
