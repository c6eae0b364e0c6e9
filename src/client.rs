//! Minimal client for the external course API.
//!
//! One call: `POST {base_url}/courses` as multipart with `image` (binary) and `courseData` (JSON).
//! Calls are instrumented with payload sizes and latency; image bytes and draft text are never logged.

use std::time::{Duration, Instant};

use reqwest::header::USER_AGENT;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{error, info, instrument};

use crate::editor::Submission;
use crate::error::SubmitError;
use crate::util::trunc_for_log;

/// Course created by the API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatedCourse {
  pub id: String,
}

#[derive(Clone)]
pub struct CourseApi {
  pub client: reqwest::Client,
  pub base_url: String,
}

impl CourseApi {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SubmitError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| SubmitError::Client(e.to_string()))?;
    Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
  }

  /// Send one submission. Exactly one request per call; no retries.
  #[instrument(level = "info", skip(self, submission), fields(
    image_bytes = submission.image.bytes.len(),
    mime = %submission.image.mime,
    course_data_len = submission.course_data.len()
  ))]
  pub async fn create_course(&self, submission: &Submission) -> Result<CreatedCourse, SubmitError> {
    let url = format!("{}/courses", self.base_url);

    let image = Part::bytes(submission.image.bytes.to_vec())
      .file_name(submission.image.file_name.clone())
      .mime_str(&submission.image.mime)
      .map_err(|e| SubmitError::Client(e.to_string()))?;
    let form = Form::new()
      .part("image", image)
      .text("courseData", submission.course_data.clone());

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "course-draft-editor/0.1")
      .multipart(form)
      .send()
      .await
      .map_err(|e| SubmitError::Transport(e.to_string()))?;

    let status = res.status();
    let body = res.text().await.map_err(|e| SubmitError::Transport(e.to_string()))?;
    let elapsed = start.elapsed();

    if !status.is_success() {
      let message = extract_api_error(&body)
        .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));
      error!(target: "submit", ?elapsed, status = status.as_u16(), body = %trunc_for_log(&body, 200), "Course API rejected submission");
      return Err(SubmitError::Api { status: status.as_u16(), message });
    }

    let json: Value = serde_json::from_str(&body)
      .map_err(|e| SubmitError::InvalidResponse(format!("JSON parse error: {e}")))?;
    let id = extract_course_id(&json)
      .ok_or_else(|| SubmitError::InvalidResponse("response carries no course identifier".into()))?;

    info!(target: "submit", ?elapsed, course_id = %id, "Course created");
    Ok(CreatedCourse { id })
  }
}

/// `error` wins over `message`; blank strings count as absent.
pub fn extract_api_error(body: &str) -> Option<String> {
  let v: Value = serde_json::from_str(body).ok()?;
  ["error", "message"]
    .iter()
    .filter_map(|k| v.get(*k).and_then(Value::as_str))
    .map(str::trim)
    .find(|s| !s.is_empty())
    .map(str::to_string)
}

/// Identifier at the top level or inside a `course` / `data` object. Numbers are stringified.
pub fn extract_course_id(v: &Value) -> Option<String> {
  fn direct(v: &Value) -> Option<String> {
    ["id", "_id", "courseId"].iter().find_map(|k| match v.get(*k)? {
      Value::String(s) if !s.is_empty() => Some(s.clone()),
      Value::Number(n) => Some(n.to_string()),
      _ => None,
    })
  }
  direct(v).or_else(|| ["course", "data"].iter().find_map(|k| v.get(*k).and_then(direct)))
}
