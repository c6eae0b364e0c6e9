//! Domain models for a course draft: course, modules, lessons, exercises, test cases.
//!
//! Serde names follow the course API's `courseData` payload (camelCase, lowercase enums).
//! Each module, lesson and test case carries a stable key that never leaves the process.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Target audience of a course.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
  #[default]
  Beginner,
  Intermediate,
  Advanced,
}

impl Level {
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "beginner" => Some(Level::Beginner),
      "intermediate" => Some(Level::Intermediate),
      "advanced" => Some(Level::Advanced),
      _ => None,
    }
  }
}

/// Exercise difficulty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  #[default]
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub fn parse(s: &str) -> Option<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "easy" => Some(Difficulty::Easy),
      "medium" => Some(Difficulty::Medium),
      "hard" => Some(Difficulty::Hard),
      _ => None,
    }
  }
}

fn new_key() -> Uuid {
  Uuid::new_v4()
}

/// The whole document being edited.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDraft {
  pub title: String,
  pub description: String,
  pub level: Level,
  pub language: String,
  pub duration: String,
  #[serde(default)]
  pub enrolled_students: u64,
  #[serde(default)]
  pub modules: Vec<Module>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
  #[serde(skip, default = "new_key")]
  pub key: Uuid,
  pub title: String,
  pub description: String,
  pub order: i64,
  #[serde(default)]
  pub lessons: Vec<Lesson>,
}

impl Module {
  /// Empty module placed at `order`.
  pub fn empty(order: i64) -> Self {
    Self { key: new_key(), title: String::new(), description: String::new(), order, lessons: Vec::new() }
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
  #[serde(skip, default = "new_key")]
  pub key: Uuid,
  pub title: String,
  pub description: String,
  pub content: String,
  pub duration: String,
  pub order: i64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub exercise: Option<Exercise>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub completed: Option<bool>,
}

impl Lesson {
  pub fn empty(order: i64) -> Self {
    Self {
      key: new_key(),
      title: String::new(),
      description: String::new(),
      content: String::new(),
      duration: String::new(),
      order,
      exercise: None,
      completed: None,
    }
  }
}

/// Coding exercise attached to a lesson. A fresh one is easy with no tests or hints.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
  pub title: String,
  pub description: String,
  pub starter_code: String,
  #[serde(default)]
  pub test_cases: Vec<TestCase>,
  #[serde(default)]
  pub hints: Vec<String>,
  pub difficulty: Difficulty,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
  #[serde(skip, default = "new_key")]
  pub key: Uuid,
  pub input: String,
  pub expected_output: String,
  pub description: String,
}

impl TestCase {
  pub fn empty() -> Self {
    Self { key: new_key(), input: String::new(), expected_output: String::new(), description: String::new() }
  }
}

impl CourseDraft {
  /// Serialized `courseData` field of the submission.
  pub fn to_payload_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string(self)
  }

  /// Names of required top-level fields that are still blank.
  pub fn missing_required_fields(&self) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if self.title.trim().is_empty() { missing.push("title"); }
    if self.description.trim().is_empty() { missing.push("description"); }
    if self.language.trim().is_empty() { missing.push("language"); }
    if self.duration.trim().is_empty() { missing.push("duration"); }
    missing
  }
}
