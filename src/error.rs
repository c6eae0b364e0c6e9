//! Error types for draft editing and course submission.

use thiserror::Error;

/// Fallback banner text when a failed submission carries no usable message.
pub const GENERIC_SUBMIT_FAILURE: &str = "Failed to create course. Please try again.";

/// Errors raised synchronously by the editor. None of these ever reach the wire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
  #[error("Image is too large: {size} bytes (maximum is {max} bytes, 5 MB)")]
  ImageTooLarge { size: u64, max: u64 },

  #[error("Unsupported image type '{0}': use JPEG, PNG, GIF or WebP")]
  UnsupportedImageType(String),

  #[error("Validation error: {0}")]
  Validation(String),

  #[error("A submission is already in progress")]
  SubmitInFlight,

  #[error("{what} index {index} is out of range (length {len})")]
  IndexOutOfRange { what: &'static str, index: usize, len: usize },

  #[error("Lesson {lesson} of module {module} has no exercise")]
  NoExercise { module: usize, lesson: usize },

  #[error(transparent)]
  Path(#[from] PathError),
}

/// Errors produced while addressing or assigning a field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
  #[error("Invalid field path '{path}': {reason}")]
  Syntax { path: String, reason: String },

  #[error("Unknown field '{0}'")]
  UnknownField(String),

  #[error("Field '{field}' expects {expected}")]
  WrongValue { field: String, expected: &'static str },
}

/// Errors from the outbound course API call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
  /// The API answered with a non-success status; `message` is already the best available text.
  #[error("Course API returned HTTP {status}: {message}")]
  Api { status: u16, message: String },

  #[error("Transport error: {0}")]
  Transport(String),

  #[error("Unexpected course API response: {0}")]
  InvalidResponse(String),

  #[error("Failed to build HTTP client: {0}")]
  Client(String),
}

impl SubmitError {
  /// Text shown in the error banner.
  pub fn user_message(&self) -> String {
    let msg = match self {
      SubmitError::Api { message, .. } => message.trim(),
      SubmitError::Transport(m) | SubmitError::InvalidResponse(m) | SubmitError::Client(m) => m.trim(),
    };
    if msg.is_empty() { GENERIC_SUBMIT_FAILURE.to_string() } else { msg.to_string() }
  }
}
