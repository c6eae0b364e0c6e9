//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Applying edit commands to a session's editor
//!   - Image selection with background preview rendering
//!   - Submission: synchronous guard under the session lock, network call outside it, and the
//!     result settled by a task that outlives the caller

use std::sync::{Arc, Weak};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::client::CreatedCourse;
use crate::editor::CourseDraftEditor;
use crate::error::{EditorError, PathError, SubmitError};
use crate::image::{render_preview, ImageFile, PreviewJob};
use crate::path::TestCaseField;
use crate::protocol::{to_out, EditCommand, ErrorCode, ServerEvent};
use crate::state::{AppState, Session, SessionHandle};

fn closed_event() -> ServerEvent {
    ServerEvent::error(ErrorCode::NotFound, "Editor session is closed")
}

fn snapshot_event(session: &Session) -> ServerEvent {
    ServerEvent::Draft { snapshot: to_out(session.id, &session.editor) }
}

/// Lock the session for a client request. `None` once it is closed.
async fn lock_open(handle: &SessionHandle) -> Option<MutexGuard<'_, Session>> {
    let mut session = handle.lock().await;
    if session.is_closed() {
        return None;
    }
    session.touch();
    Some(session)
}

/// Apply a pure edit command. Commands with side effects beyond the draft are handled by the caller.
pub fn apply_edit(editor: &mut CourseDraftEditor, cmd: EditCommand) -> Result<(), EditorError> {
    match cmd {
        EditCommand::SetField { path, value } => editor.set_field_at(&path, value),
        EditCommand::AddModule => {
            editor.add_module();
            Ok(())
        }
        EditCommand::RemoveModule { module } => editor.remove_module(module),
        EditCommand::AddLesson { module } => editor.add_lesson(module),
        EditCommand::RemoveLesson { module, lesson } => editor.remove_lesson(module, lesson),
        EditCommand::SetExercise { module, lesson, attached } => editor.set_exercise(module, lesson, attached),
        EditCommand::AddTestCase { module, lesson } => editor.add_test_case(module, lesson),
        EditCommand::RemoveTestCase { module, lesson, test_case } => editor.remove_test_case(module, lesson, test_case),
        EditCommand::UpdateTestCaseField { module, lesson, test_case, field, value } => {
            let field = TestCaseField::parse(&field).ok_or(PathError::UnknownField(field))?;
            editor.update_test_case_field(module, lesson, test_case, field, value)
        }
        EditCommand::AddHint { module, lesson } => editor.add_hint(module, lesson),
        EditCommand::RemoveHint { module, lesson, hint } => editor.remove_hint(module, lesson, hint),
        EditCommand::UpdateHint { module, lesson, hint, text } => editor.update_hint(module, lesson, hint, text),
        EditCommand::ClearImage => {
            editor.clear_image();
            Ok(())
        }
        EditCommand::DismissError => {
            editor.dismiss_error();
            Ok(())
        }
        EditCommand::Reset => {
            editor.reset();
            Ok(())
        }
        // No draft change; the caller answers these.
        EditCommand::Ping
        | EditCommand::Snapshot
        | EditCommand::Locate { .. }
        | EditCommand::SelectImage { .. }
        | EditCommand::Submit => Ok(()),
    }
}

#[instrument(level = "info", skip_all)]
pub async fn handle_command(state: &AppState, handle: &SessionHandle, cmd: EditCommand) -> ServerEvent {
    match cmd {
        EditCommand::Ping => match lock_open(handle).await {
            Some(_) => ServerEvent::Pong,
            None => closed_event(),
        },
        EditCommand::Submit => submit_draft(state, handle).await,
        EditCommand::SelectImage { file_name, mime, data_base64 } => match STANDARD.decode(data_base64.as_bytes()) {
            Ok(bytes) => select_image(handle, ImageFile::new(file_name, mime, bytes)).await,
            Err(e) => ServerEvent::error(ErrorCode::Validation, format!("Invalid base64 image data: {e}")),
        },
        EditCommand::Locate { module_key, lesson_key, test_case_key } => {
            let Some(session) = lock_open(handle).await else { return closed_event() };
            locate(&session.editor, module_key, lesson_key, test_case_key)
                .unwrap_or_else(|| ServerEvent::error(ErrorCode::NotFound, "No element with that key"))
        }
        cmd => {
            let Some(mut session) = lock_open(handle).await else { return closed_event() };
            match apply_edit(&mut session.editor, cmd) {
                Ok(()) => snapshot_event(&session),
                Err(e) => {
                    debug!(target: "draft", session = %session.id, error = %e, "Edit rejected");
                    e.into()
                }
            }
        }
    }
}

fn locate(
    editor: &CourseDraftEditor,
    module_key: Uuid,
    lesson_key: Option<Uuid>,
    test_case_key: Option<Uuid>,
) -> Option<ServerEvent> {
    match (lesson_key, test_case_key) {
        (None, None) => {
            let module = editor.module_position(module_key)?;
            Some(ServerEvent::Located { module, lesson: None, test_case: None })
        }
        (Some(lk), None) => {
            let (module, lesson) = editor.lesson_position(module_key, lk)?;
            Some(ServerEvent::Located { module, lesson: Some(lesson), test_case: None })
        }
        (Some(lk), Some(tk)) => {
            let (module, lesson, test_case) = editor.test_case_position(module_key, lk, tk)?;
            Some(ServerEvent::Located { module, lesson: Some(lesson), test_case: Some(test_case) })
        }
        (None, Some(_)) => None,
    }
}

pub async fn snapshot(handle: &SessionHandle) -> ServerEvent {
    match lock_open(handle).await {
        Some(session) => snapshot_event(&session),
        None => closed_event(),
    }
}

/// Validate and store the image, then render its preview in the background.
#[instrument(level = "info", skip(handle, file), fields(file_name = %file.file_name, size = file.size()))]
pub async fn select_image(handle: &SessionHandle, file: ImageFile) -> ServerEvent {
    let Some(mut session) = lock_open(handle).await else { return closed_event() };
    match session.editor.select_image(file) {
        Ok(job) => {
            spawn_preview(handle, &mut session, job);
            snapshot_event(&session)
        }
        Err(e) => e.into(),
    }
}

/// The task keeps only a weak reference, so a dropped session is never written to.
fn spawn_preview(handle: &SessionHandle, session: &mut Session, job: PreviewJob) {
    let weak = Arc::downgrade(handle);
    let task = tokio::spawn(async move {
        let key = job.key;
        let Some(preview) = render_preview(job).await else { return };
        let Some(handle) = weak.upgrade() else { return };
        let mut session = handle.lock().await;
        if !session.is_closed() {
            session.editor.complete_preview(key, preview);
        }
    });
    session.track(task.abort_handle());
}

/// Submit the session's draft. On success the session is closed: the draft now belongs to the API.
#[instrument(level = "info", skip(state, handle))]
pub async fn submit_draft(state: &AppState, handle: &SessionHandle) -> ServerEvent {
    let (id, request) = {
        let Some(mut session) = lock_open(handle).await else { return closed_event() };
        let submission = match session.editor.begin_submit() {
            Ok(s) => s,
            Err(e) => return e.into(),
        };
        debug!(
            target: "submit",
            session = %session.id,
            modules = session.editor.draft().modules.len(),
            image_bytes = submission.image.size(),
            "Submission started"
        );
        let api = state.api.clone();
        let request = tokio::spawn(async move { api.create_course(&submission).await });
        session.track(request.abort_handle());
        (session.id, request)
    };

    // Untracked: it may close the session itself, and it must finish even if this caller is dropped.
    let settle = tokio::spawn(settle_submission(state.clone(), Arc::downgrade(handle), id, request));
    match settle.await {
        Ok(ev) => ev,
        Err(e) => ServerEvent::error(ErrorCode::Upstream, format!("Submission task failed: {e}")),
    }
}

async fn settle_submission(
    state: AppState,
    session: Weak<Mutex<Session>>,
    id: Uuid,
    request: JoinHandle<Result<CreatedCourse, SubmitError>>,
) -> ServerEvent {
    let result = match request.await {
        Ok(r) => r,
        Err(e) if e.is_cancelled() => {
            warn!(target: "submit", session = %id, "Submission cancelled by session teardown");
            return closed_event();
        }
        Err(e) => Err(SubmitError::Transport(e.to_string())),
    };

    let Some(handle) = session.upgrade() else { return closed_event() };
    let outcome = {
        let mut session = handle.lock().await;
        if session.is_closed() {
            return closed_event();
        }
        session.editor.finish_submit(result)
    };

    match outcome {
        Ok(nav) => {
            state.close_session(id).await;
            ServerEvent::Submitted { course_id: nav.course_id, location: nav.location }
        }
        Err(message) => ServerEvent::error(ErrorCode::Upstream, message),
    }
}
