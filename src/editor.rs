//! The course draft editor: one draft, one optional cover image, a submit flag and an error banner.
//!
//! Every edit swaps in a new `Arc<CourseDraft>` built by the pure functions in `tree` and `path`;
//! snapshots handed out earlier stay valid. Failed edits leave the draft untouched.
//!
//! Submission is split into `begin_submit` (synchronous guard + payload) and `finish_submit`
//! (result handling) so a host can release its lock while the request is in flight.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::client::CreatedCourse;
use crate::domain::CourseDraft;
use crate::error::{EditorError, SubmitError};
use crate::image::{ImageAsset, ImageFile, ImageRules, PreviewJob};
use crate::path::{FieldPath, FieldValue, TestCaseField};
use crate::tree;
use crate::util::fill_template;

/// Everything the editor needs from configuration.
#[derive(Clone, Debug)]
pub struct EditorSettings {
  pub image: ImageRules,
  /// Location of the created course; `{id}` is replaced by the API's identifier.
  pub course_view_template: String,
}

impl Default for EditorSettings {
  fn default() -> Self {
    Self { image: ImageRules::default(), course_view_template: "/courses/{id}".into() }
  }
}

/// Payload of one submission: the image and the JSON-serialized draft.
#[derive(Clone, Debug)]
pub struct Submission {
  pub image: ImageFile,
  pub course_data: String,
}

/// Where control goes after a successful submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Navigation {
  pub course_id: String,
  pub location: String,
}

#[derive(Debug)]
pub struct CourseDraftEditor {
  draft: Arc<CourseDraft>,
  image: Option<ImageAsset>,
  submitting: bool,
  error: Option<String>,
  settings: EditorSettings,
}

impl Default for CourseDraftEditor {
  fn default() -> Self {
    Self::new(EditorSettings::default())
  }
}

impl CourseDraftEditor {
  pub fn new(settings: EditorSettings) -> Self {
    Self { draft: Arc::new(CourseDraft::default()), image: None, submitting: false, error: None, settings }
  }

  // --- Read access ---

  pub fn snapshot(&self) -> Arc<CourseDraft> {
    self.draft.clone()
  }

  pub fn draft(&self) -> &CourseDraft {
    &self.draft
  }

  pub fn image(&self) -> Option<&ImageAsset> {
    self.image.as_ref()
  }

  pub fn is_submitting(&self) -> bool {
    self.submitting
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  fn replace(&mut self, next: CourseDraft) {
    self.draft = Arc::new(next);
  }

  // --- Field edits ---

  pub fn set_field(&mut self, path: FieldPath, value: FieldValue) -> Result<(), EditorError> {
    let next = crate::path::set_field(&self.draft, path, value)?;
    debug!(target: "draft", %path, "Field updated");
    self.replace(next);
    Ok(())
  }

  /// Same as `set_field` with the textual path form.
  pub fn set_field_at(&mut self, path: &str, value: FieldValue) -> Result<(), EditorError> {
    let path: FieldPath = path.parse()?;
    self.set_field(path, value)
  }

  // --- Structure edits ---

  pub fn add_module(&mut self) {
    let next = tree::add_module(&self.draft);
    self.replace(next);
  }

  pub fn remove_module(&mut self, module: usize) -> Result<(), EditorError> {
    let next = tree::remove_module(&self.draft, module)?;
    self.replace(next);
    Ok(())
  }

  pub fn add_lesson(&mut self, module: usize) -> Result<(), EditorError> {
    let next = tree::add_lesson(&self.draft, module)?;
    self.replace(next);
    Ok(())
  }

  pub fn remove_lesson(&mut self, module: usize, lesson: usize) -> Result<(), EditorError> {
    let next = tree::remove_lesson(&self.draft, module, lesson)?;
    self.replace(next);
    Ok(())
  }

  pub fn set_exercise(&mut self, module: usize, lesson: usize, attach: bool) -> Result<(), EditorError> {
    let next = tree::set_exercise(&self.draft, module, lesson, attach)?;
    self.replace(next);
    Ok(())
  }

  pub fn add_test_case(&mut self, module: usize, lesson: usize) -> Result<(), EditorError> {
    let next = tree::add_test_case(&self.draft, module, lesson)?;
    self.replace(next);
    Ok(())
  }

  pub fn remove_test_case(&mut self, module: usize, lesson: usize, test_case: usize) -> Result<(), EditorError> {
    let next = tree::remove_test_case(&self.draft, module, lesson, test_case)?;
    self.replace(next);
    Ok(())
  }

  pub fn update_test_case_field(
    &mut self,
    module: usize,
    lesson: usize,
    test_case: usize,
    field: TestCaseField,
    value: impl Into<String>,
  ) -> Result<(), EditorError> {
    self.set_field(FieldPath::TestCase { module, lesson, test_case, field }, FieldValue::Text(value.into()))
  }

  pub fn add_hint(&mut self, module: usize, lesson: usize) -> Result<(), EditorError> {
    let next = tree::add_hint(&self.draft, module, lesson)?;
    self.replace(next);
    Ok(())
  }

  pub fn remove_hint(&mut self, module: usize, lesson: usize, hint: usize) -> Result<(), EditorError> {
    let next = tree::remove_hint(&self.draft, module, lesson, hint)?;
    self.replace(next);
    Ok(())
  }

  pub fn update_hint(&mut self, module: usize, lesson: usize, hint: usize, text: impl Into<String>) -> Result<(), EditorError> {
    self.set_field(FieldPath::Hint { module, lesson, hint }, FieldValue::Text(text.into()))
  }

  /// Start over with an empty draft. Image and banner are kept.
  pub fn reset(&mut self) {
    self.replace(CourseDraft::default());
  }

  // --- Stable key lookups ---

  pub fn module_position(&self, key: Uuid) -> Option<usize> {
    tree::module_position(&self.draft, key)
  }

  pub fn lesson_position(&self, module_key: Uuid, lesson_key: Uuid) -> Option<(usize, usize)> {
    tree::lesson_position(&self.draft, module_key, lesson_key)
  }

  pub fn test_case_position(&self, module_key: Uuid, lesson_key: Uuid, test_case_key: Uuid) -> Option<(usize, usize, usize)> {
    tree::test_case_position(&self.draft, module_key, lesson_key, test_case_key)
  }

  // --- Image ---

  /// Validate and store a new cover image. On rejection the banner is set and the previous image
  /// stays. On success the banner is cleared and the returned job must be rendered and fed back
  /// through `complete_preview`.
  #[instrument(level = "info", skip(self, file), fields(file_name = %file.file_name, mime = %file.mime, size = file.size()))]
  pub fn select_image(&mut self, file: ImageFile) -> Result<PreviewJob, EditorError> {
    if let Err(e) = self.settings.image.check(&file) {
      warn!(target: "draft", error = %e, "Image rejected");
      self.error = Some(e.to_string());
      return Err(e);
    }
    let key = Uuid::new_v4();
    let job = PreviewJob { key, mime: file.mime.clone(), bytes: file.bytes.clone() };
    self.image = Some(ImageAsset { key, file, preview: None });
    self.error = None;
    info!(target: "draft", %key, "Image selected");
    Ok(job)
  }

  /// Store a rendered preview. Returns false (and changes nothing) if another image was selected
  /// or the image was cleared in the meantime.
  pub fn complete_preview(&mut self, key: Uuid, preview: String) -> bool {
    match self.image.as_mut() {
      Some(img) if img.key == key => {
        img.preview = Some(preview);
        true
      }
      _ => {
        debug!(target: "draft", %key, "Dropping stale image preview");
        false
      }
    }
  }

  pub fn clear_image(&mut self) {
    self.image = None;
  }

  pub fn dismiss_error(&mut self) {
    self.error = None;
  }

  // --- Submission ---

  /// Synchronous half of a submission. Sets the in-flight flag before returning, so a second call
  /// is refused until `finish_submit` runs.
  pub fn begin_submit(&mut self) -> Result<Submission, EditorError> {
    if self.submitting {
      return Err(EditorError::SubmitInFlight);
    }
    let result = self.prepare_submission();
    match result {
      Ok(submission) => {
        self.submitting = true;
        self.error = None;
        Ok(submission)
      }
      Err(e) => {
        self.error = Some(e.to_string());
        Err(e)
      }
    }
  }

  fn prepare_submission(&self) -> Result<Submission, EditorError> {
    let image = self.image.as_ref().ok_or_else(|| EditorError::Validation("no image selected".into()))?;
    let missing = self.draft.missing_required_fields();
    if !missing.is_empty() {
      return Err(EditorError::Validation(format!("missing required field(s): {}", missing.join(", "))));
    }
    let course_data = self
      .draft
      .to_payload_json()
      .map_err(|e| EditorError::Validation(format!("draft cannot be serialized: {e}")))?;
    Ok(Submission { image: image.file.clone(), course_data })
  }

  /// Second half: clear the in-flight flag and either produce the navigation target or record the
  /// failure message. The draft is never modified here.
  pub fn finish_submit(&mut self, result: Result<CreatedCourse, SubmitError>) -> Result<Navigation, String> {
    self.submitting = false;
    match result {
      Ok(created) => {
        let id_segment = urlencoding::encode(&created.id);
        let location = fill_template(&self.settings.course_view_template, &[("id", &*id_segment)]);
        info!(target: "submit", course_id = %created.id, %location, "Submission succeeded");
        Ok(Navigation { course_id: created.id, location })
      }
      Err(e) => {
        let message = e.user_message();
        warn!(target: "submit", error = %e, "Submission failed; draft kept for retry");
        self.error = Some(message.clone());
        Err(message)
      }
    }
  }

  /// Both halves back to back, for callers that own the editor outright.
  #[cfg(test)]
  pub async fn submit(&mut self, api: &crate::client::CourseApi) -> Result<Navigation, String> {
    let submission = self.begin_submit().map_err(|e| e.to_string())?;
    let result = api.create_course(&submission).await;
    self.finish_submit(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::client::CourseApi;
  use crate::image::{render_preview, MAX_IMAGE_BYTES};
  use crate::testing::{spawn_mock_api, MockReply};
  use serde_json::json;
  use std::time::Duration;

  fn png(len: usize) -> ImageFile {
    ImageFile::new("cover.png", "image/png", vec![7u8; len])
  }

  fn filled_editor() -> CourseDraftEditor {
    let mut ed = CourseDraftEditor::default();
    ed.set_field_at("title", "Intro to X".into()).unwrap();
    ed.set_field_at("description", "Basics".into()).unwrap();
    ed.set_field_at("language", "English".into()).unwrap();
    ed.set_field_at("duration", "4 weeks".into()).unwrap();
    ed
  }

  #[test]
  fn oversized_image_is_rejected_and_previous_kept() {
    let mut ed = CourseDraftEditor::default();
    ed.select_image(png(10)).unwrap();
    let kept = ed.image().unwrap().key;

    let err = ed.select_image(png(MAX_IMAGE_BYTES as usize + 1)).unwrap_err();
    assert!(matches!(err, EditorError::ImageTooLarge { .. }));
    assert_eq!(ed.image().unwrap().key, kept);
    assert!(ed.error().unwrap().contains("too large"));
  }

  #[test]
  fn wrong_type_is_rejected() {
    let mut ed = CourseDraftEditor::default();
    let err = ed.select_image(ImageFile::new("doc.pdf", "application/pdf", vec![0u8; 4])).unwrap_err();
    assert_eq!(err, EditorError::UnsupportedImageType("application/pdf".into()));
    assert!(ed.image().is_none());
    assert!(ed.error().unwrap().contains("Unsupported image type"));
  }

  #[tokio::test]
  async fn valid_image_clears_error_and_gets_preview() {
    let mut ed = CourseDraftEditor::default();
    let _ = ed.select_image(png(MAX_IMAGE_BYTES as usize + 1));
    assert!(ed.error().is_some());

    let job = ed.select_image(png(16)).unwrap();
    assert!(ed.error().is_none());
    assert!(ed.image().unwrap().preview.is_none());

    let preview = render_preview(job.clone()).await.unwrap();
    assert!(ed.complete_preview(job.key, preview));
    assert!(ed.image().unwrap().preview.as_deref().unwrap().starts_with("data:"));
  }

  #[tokio::test]
  async fn stale_preview_is_dropped() {
    let mut ed = CourseDraftEditor::default();
    let first = ed.select_image(png(4)).unwrap();
    let _second = ed.select_image(png(8)).unwrap();
    let preview = render_preview(first.clone()).await.unwrap();
    assert!(!ed.complete_preview(first.key, preview));
    assert!(ed.image().unwrap().preview.is_none());
  }

  #[test]
  fn snapshots_survive_later_edits() {
    let mut ed = CourseDraftEditor::default();
    ed.add_module();
    let before = ed.snapshot();
    ed.set_field_at("modules[0].title", "Changed".into()).unwrap();
    assert_eq!(before.modules[0].title, "");
    assert_eq!(ed.draft().modules[0].title, "Changed");
  }

  #[test]
  fn failed_edit_keeps_draft() {
    let mut ed = CourseDraftEditor::default();
    ed.add_module();
    let before = ed.snapshot();
    assert!(ed.remove_lesson(0, 0).is_err());
    assert!(ed.set_field_at("modules[0].order", "x".into()).is_err());
    assert!(Arc::ptr_eq(&before, &ed.snapshot()));
  }

  #[test]
  fn submit_without_image_never_prepares_payload() {
    let mut ed = filled_editor();
    let err = ed.begin_submit().unwrap_err();
    assert_eq!(err, EditorError::Validation("no image selected".into()));
    assert!(!ed.is_submitting());
    assert!(ed.error().unwrap().contains("no image"));
  }

  #[test]
  fn submit_requires_top_level_fields() {
    let mut ed = CourseDraftEditor::default();
    ed.select_image(png(4)).unwrap();
    ed.set_field_at("title", "Only a title".into()).unwrap();
    let err = ed.begin_submit().unwrap_err();
    assert_eq!(err, EditorError::Validation("missing required field(s): description, language, duration".into()));
  }

  #[test]
  fn second_submit_is_refused_while_in_flight() {
    let mut ed = filled_editor();
    ed.select_image(png(4)).unwrap();
    ed.begin_submit().unwrap();
    assert!(ed.is_submitting());
    assert_eq!(ed.begin_submit().unwrap_err(), EditorError::SubmitInFlight);

    let nav = ed.finish_submit(Ok(CreatedCourse { id: "abc".into() })).unwrap();
    assert_eq!(nav, Navigation { course_id: "abc".into(), location: "/courses/abc".into() });
    assert!(!ed.is_submitting());
  }

  #[test]
  fn course_id_is_escaped_in_location() {
    let mut ed = filled_editor();
    ed.select_image(png(4)).unwrap();
    ed.begin_submit().unwrap();
    let nav = ed.finish_submit(Ok(CreatedCourse { id: "a/b?c#d".into() })).unwrap();
    assert_eq!(nav.course_id, "a/b?c#d");
    assert_eq!(nav.location, "/courses/a%2Fb%3Fc%23d");
  }

  #[test]
  fn failure_keeps_draft_for_retry() {
    let mut ed = filled_editor();
    ed.select_image(png(4)).unwrap();
    let before = ed.snapshot();
    ed.begin_submit().unwrap();
    let msg = ed
      .finish_submit(Err(SubmitError::Api { status: 400, message: "title required".into() }))
      .unwrap_err();
    assert_eq!(msg, "title required");
    assert_eq!(ed.error(), Some("title required"));
    assert!(Arc::ptr_eq(&before, &ed.snapshot()));
    assert!(ed.begin_submit().is_ok());
  }

  #[tokio::test]
  async fn submit_without_image_sends_nothing() {
    let mock = spawn_mock_api(MockReply::Created(json!({ "_id": "never" }))).await;
    let api = CourseApi::new(&mock.base_url, Duration::from_secs(5)).unwrap();
    let mut ed = filled_editor();

    let msg = ed.submit(&api).await.unwrap_err();
    assert!(msg.contains("no image"));
    assert!(mock.received().await.is_empty());
  }

  #[tokio::test]
  async fn api_error_sets_exact_message_and_does_not_navigate() {
    let mock = spawn_mock_api(MockReply::Rejected(400, json!({ "error": "title required" }))).await;
    let api = CourseApi::new(&mock.base_url, Duration::from_secs(5)).unwrap();
    let mut ed = filled_editor();
    ed.select_image(png(4)).unwrap();

    assert_eq!(ed.submit(&api).await, Err("title required".to_string()));
    assert_eq!(ed.error(), Some("title required"));
    assert_eq!(mock.received().await.len(), 1);
  }

  #[tokio::test]
  async fn end_to_end_payload_matches_in_memory_tree() {
    let mock = spawn_mock_api(MockReply::Created(json!({ "_id": "course-77" }))).await;
    let api = CourseApi::new(&mock.base_url, Duration::from_secs(5)).unwrap();

    let mut ed = filled_editor();
    ed.add_module();
    ed.set_field_at("modules[0].title", "Getting started".into()).unwrap();
    ed.add_lesson(0).unwrap();
    ed.set_exercise(0, 0, true).unwrap();
    ed.add_test_case(0, 0).unwrap();
    ed.add_test_case(0, 0).unwrap();
    ed.update_test_case_field(0, 0, 1, TestCaseField::ExpectedOutput, "42").unwrap();
    ed.add_hint(0, 0).unwrap();
    ed.update_hint(0, 0, 0, "Read the docs").unwrap();
    ed.select_image(png(32)).unwrap();

    let nav = ed.submit(&api).await.unwrap();
    assert_eq!(nav.course_id, "course-77");
    assert_eq!(nav.location, "/courses/course-77");

    let seen = mock.received().await;
    assert_eq!(seen.len(), 1);
    let data = &seen[0].course_data;
    assert_eq!(data["title"], "Intro to X");
    let modules = data["modules"].as_array().unwrap();
    assert_eq!(modules.len(), ed.draft().modules.len());
    let lessons = modules[0]["lessons"].as_array().unwrap();
    assert_eq!(lessons.len(), ed.draft().modules[0].lessons.len());
    let exercise = &lessons[0]["exercise"];
    let in_memory = ed.draft().modules[0].lessons[0].exercise.clone().unwrap();
    assert_eq!(exercise["testCases"].as_array().unwrap().len(), in_memory.test_cases.len());
    assert_eq!(exercise["testCases"].as_array().unwrap().len(), 2);
    assert_eq!(exercise["testCases"][1]["expectedOutput"], "42");
    assert_eq!(exercise["hints"], json!(["Read the docs"]));
    assert_eq!(seen[0].image_bytes.len(), 32);
  }
}
