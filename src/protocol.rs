//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::CourseDraft;
use crate::editor::CourseDraftEditor;
use crate::error::{EditorError, SubmitError};
use crate::path::FieldValue;

/// Edit commands a client can send (WS text frame or HTTP body).
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditCommand {
    Ping,
    Snapshot,
    SetField {
        path: String,
        value: FieldValue,
    },
    AddModule,
    RemoveModule {
        module: usize,
    },
    AddLesson {
        module: usize,
    },
    RemoveLesson {
        module: usize,
        lesson: usize,
    },
    SetExercise {
        module: usize,
        lesson: usize,
        attached: bool,
    },
    AddTestCase {
        module: usize,
        lesson: usize,
    },
    RemoveTestCase {
        module: usize,
        lesson: usize,
        #[serde(rename = "testCase")]
        test_case: usize,
    },
    UpdateTestCaseField {
        module: usize,
        lesson: usize,
        #[serde(rename = "testCase")]
        test_case: usize,
        field: String,
        value: String,
    },
    AddHint {
        module: usize,
        lesson: usize,
    },
    RemoveHint {
        module: usize,
        lesson: usize,
        hint: usize,
    },
    UpdateHint {
        module: usize,
        lesson: usize,
        hint: usize,
        text: String,
    },
    SelectImage {
        #[serde(rename = "fileName")]
        file_name: String,
        mime: String,
        #[serde(rename = "dataBase64")]
        data_base64: String,
    },
    /// Resolve stable keys to current positions.
    Locate {
        #[serde(rename = "moduleKey")]
        module_key: Uuid,
        #[serde(rename = "lessonKey", default)]
        lesson_key: Option<Uuid>,
        #[serde(rename = "testCaseKey", default)]
        test_case_key: Option<Uuid>,
    },
    ClearImage,
    DismissError,
    Reset,
    Submit,
}

/// Broad error class, mapped to HTTP status by the router.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Validation,
    NotFound,
    Conflict,
    Upstream,
}

/// Messages the server sends back.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Pong,
    Draft {
        snapshot: SessionOut,
    },
    Located {
        module: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        lesson: Option<usize>,
        #[serde(rename = "testCase", skip_serializing_if = "Option::is_none")]
        test_case: Option<usize>,
    },
    Submitted {
        #[serde(rename = "courseId")]
        course_id: String,
        location: String,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl ServerEvent {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerEvent::Error { code, message: message.into() }
    }
}

impl From<EditorError> for ServerEvent {
    fn from(e: EditorError) -> Self {
        let code = match e {
            EditorError::SubmitInFlight => ErrorCode::Conflict,
            _ => ErrorCode::Validation,
        };
        ServerEvent::error(code, e.to_string())
    }
}

impl From<SubmitError> for ServerEvent {
    fn from(e: SubmitError) -> Self {
        ServerEvent::error(ErrorCode::Upstream, e.user_message())
    }
}

/// Full session snapshot delivered after every successful command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
    pub session_id: Uuid,
    pub draft: CourseDraft,
    pub keys: Vec<ModuleKeysOut>,
    pub image: Option<ImageOut>,
    pub submitting: bool,
    pub error: Option<String>,
}

/// Stable keys in the same shape as the draft, so clients can re-resolve positions.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleKeysOut {
    pub key: Uuid,
    pub lessons: Vec<LessonKeysOut>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonKeysOut {
    pub key: Uuid,
    pub test_cases: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOut {
    pub file_name: String,
    pub mime: String,
    pub size: u64,
    pub preview: Option<String>,
}

/// Convert the editor state into the public snapshot.
pub fn to_out(session_id: Uuid, editor: &CourseDraftEditor) -> SessionOut {
    let draft = editor.snapshot();
    let keys = draft
        .modules
        .iter()
        .map(|m| ModuleKeysOut {
            key: m.key,
            lessons: m
                .lessons
                .iter()
                .map(|l| LessonKeysOut {
                    key: l.key,
                    test_cases: l
                        .exercise
                        .as_ref()
                        .map(|e| e.test_cases.iter().map(|t| t.key).collect())
                        .unwrap_or_default(),
                })
                .collect(),
        })
        .collect();

    SessionOut {
        session_id,
        draft: CourseDraft::clone(&draft),
        keys,
        image: editor.image().map(|img| ImageOut {
            file_name: img.file.file_name.clone(),
            mime: img.file.mime.clone(),
            size: img.file.size(),
            preview: img.preview.clone(),
        }),
        submitting: editor.is_submitting(),
        error: editor.error().map(str::to_string),
    }
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub session: Option<Uuid>,
}
