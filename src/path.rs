//! Explicit field addresses into a draft and the pure setter that applies them.
//!
//! Textual form mirrors the payload's field names, e.g.
//! `modules[0].lessons[1].exercise.testCases[2].expectedOutput` or
//! `modules[0].lessons[1].exercise.hints[0]`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{CourseDraft, Difficulty, Level};
use crate::error::{EditorError, PathError};
use crate::tree::{edit, exercise_mut, hint_mut, lesson_mut, module_mut, test_case_mut};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CourseField { Title, Description, Level, Language, Duration, EnrolledStudents }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleField { Title, Description, Order }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LessonField { Title, Description, Content, Duration, Order, Completed }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExerciseField { Title, Description, StarterCode, Difficulty }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestCaseField { Input, ExpectedOutput, Description }

/// Address of exactly one leaf in the draft tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldPath {
  Course(CourseField),
  Module { module: usize, field: ModuleField },
  Lesson { module: usize, lesson: usize, field: LessonField },
  Exercise { module: usize, lesson: usize, field: ExerciseField },
  TestCase { module: usize, lesson: usize, test_case: usize, field: TestCaseField },
  Hint { module: usize, lesson: usize, hint: usize },
}

/// Value assigned to a leaf. Deserialized from plain JSON scalars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
  Bool(bool),
  Integer(i64),
  Text(String),
  Null,
}

impl From<&str> for FieldValue {
  fn from(s: &str) -> Self { FieldValue::Text(s.to_string()) }
}
impl From<String> for FieldValue {
  fn from(s: String) -> Self { FieldValue::Text(s) }
}
impl From<i64> for FieldValue {
  fn from(n: i64) -> Self { FieldValue::Integer(n) }
}
impl From<bool> for FieldValue {
  fn from(b: bool) -> Self { FieldValue::Bool(b) }
}

impl FieldValue {
  fn text(self, field: &str) -> Result<String, PathError> {
    match self {
      FieldValue::Text(s) => Ok(s),
      _ => Err(PathError::WrongValue { field: field.to_string(), expected: "a string" }),
    }
  }

  /// Integers arrive either as numbers or as the raw text of a number input.
  fn integer(self, field: &str) -> Result<i64, PathError> {
    let wrong = || PathError::WrongValue { field: field.to_string(), expected: "an integer" };
    match self {
      FieldValue::Integer(n) => Ok(n),
      FieldValue::Text(s) => s.trim().parse::<i64>().map_err(|_| wrong()),
      _ => Err(wrong()),
    }
  }
}

impl CourseField {
  fn parse(name: &str) -> Option<Self> {
    Some(match name {
      "title" => CourseField::Title,
      "description" => CourseField::Description,
      "level" => CourseField::Level,
      "language" => CourseField::Language,
      "duration" => CourseField::Duration,
      "enrolledStudents" => CourseField::EnrolledStudents,
      _ => return None,
    })
  }
  fn name(self) -> &'static str {
    match self {
      CourseField::Title => "title",
      CourseField::Description => "description",
      CourseField::Level => "level",
      CourseField::Language => "language",
      CourseField::Duration => "duration",
      CourseField::EnrolledStudents => "enrolledStudents",
    }
  }
}

impl ModuleField {
  fn parse(name: &str) -> Option<Self> {
    Some(match name {
      "title" => ModuleField::Title,
      "description" => ModuleField::Description,
      "order" => ModuleField::Order,
      _ => return None,
    })
  }
  fn name(self) -> &'static str {
    match self {
      ModuleField::Title => "title",
      ModuleField::Description => "description",
      ModuleField::Order => "order",
    }
  }
}

impl LessonField {
  fn parse(name: &str) -> Option<Self> {
    Some(match name {
      "title" => LessonField::Title,
      "description" => LessonField::Description,
      "content" => LessonField::Content,
      "duration" => LessonField::Duration,
      "order" => LessonField::Order,
      "completed" => LessonField::Completed,
      _ => return None,
    })
  }
  fn name(self) -> &'static str {
    match self {
      LessonField::Title => "title",
      LessonField::Description => "description",
      LessonField::Content => "content",
      LessonField::Duration => "duration",
      LessonField::Order => "order",
      LessonField::Completed => "completed",
    }
  }
}

impl ExerciseField {
  fn parse(name: &str) -> Option<Self> {
    Some(match name {
      "title" => ExerciseField::Title,
      "description" => ExerciseField::Description,
      "starterCode" => ExerciseField::StarterCode,
      "difficulty" => ExerciseField::Difficulty,
      _ => return None,
    })
  }
  fn name(self) -> &'static str {
    match self {
      ExerciseField::Title => "title",
      ExerciseField::Description => "description",
      ExerciseField::StarterCode => "starterCode",
      ExerciseField::Difficulty => "difficulty",
    }
  }
}

impl TestCaseField {
  pub fn parse(name: &str) -> Option<Self> {
    Some(match name {
      "input" => TestCaseField::Input,
      "expectedOutput" => TestCaseField::ExpectedOutput,
      "description" => TestCaseField::Description,
      _ => return None,
    })
  }
  fn name(self) -> &'static str {
    match self {
      TestCaseField::Input => "input",
      TestCaseField::ExpectedOutput => "expectedOutput",
      TestCaseField::Description => "description",
    }
  }
}

fn unknown(name: &str) -> PathError {
  PathError::UnknownField(name.to_string())
}

/// Split `name[3]` into ("name", Some(3)).
fn segment<'a>(path: &str, raw: &'a str) -> Result<(&'a str, Option<usize>), PathError> {
  let syntax = |reason: &str| PathError::Syntax { path: path.to_string(), reason: reason.to_string() };
  match raw.find('[') {
    None if raw.is_empty() => Err(syntax("empty segment")),
    None => Ok((raw, None)),
    Some(open) => {
      let inner = raw[open + 1..].strip_suffix(']').ok_or_else(|| syntax("unclosed index"))?;
      let idx = inner.parse::<usize>().map_err(|_| syntax("index is not a non-negative integer"))?;
      Ok((&raw[..open], Some(idx)))
    }
  }
}

impl FromStr for FieldPath {
  type Err = PathError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let segs = s.trim().split('.').map(|raw| segment(s, raw)).collect::<Result<Vec<_>, _>>()?;

    let path = match segs.as_slice() {
      [(f, None)] => FieldPath::Course(CourseField::parse(f).ok_or_else(|| unknown(f))?),
      [("modules", Some(m)), (f, None)] => FieldPath::Module {
        module: *m,
        field: ModuleField::parse(f).ok_or_else(|| unknown(f))?,
      },
      [("modules", Some(m)), ("lessons", Some(l)), (f, None)] => FieldPath::Lesson {
        module: *m,
        lesson: *l,
        field: LessonField::parse(f).ok_or_else(|| unknown(f))?,
      },
      [("modules", Some(m)), ("lessons", Some(l)), ("exercise", None), ("hints", Some(h))] => {
        FieldPath::Hint { module: *m, lesson: *l, hint: *h }
      }
      [("modules", Some(m)), ("lessons", Some(l)), ("exercise", None), (f, None)] => FieldPath::Exercise {
        module: *m,
        lesson: *l,
        field: ExerciseField::parse(f).ok_or_else(|| unknown(f))?,
      },
      [("modules", Some(m)), ("lessons", Some(l)), ("exercise", None), ("testCases", Some(k)), (f, None)] => {
        FieldPath::TestCase {
          module: *m,
          lesson: *l,
          test_case: *k,
          field: TestCaseField::parse(f).ok_or_else(|| unknown(f))?,
        }
      }
      _ => {
        return Err(PathError::Syntax { path: s.to_string(), reason: "does not address a leaf field".into() })
      }
    };
    Ok(path)
  }
}

impl fmt::Display for FieldPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match *self {
      FieldPath::Course(field) => write!(f, "{}", field.name()),
      FieldPath::Module { module, field } => write!(f, "modules[{module}].{}", field.name()),
      FieldPath::Lesson { module, lesson, field } => {
        write!(f, "modules[{module}].lessons[{lesson}].{}", field.name())
      }
      FieldPath::Exercise { module, lesson, field } => {
        write!(f, "modules[{module}].lessons[{lesson}].exercise.{}", field.name())
      }
      FieldPath::TestCase { module, lesson, test_case, field } => write!(
        f,
        "modules[{module}].lessons[{lesson}].exercise.testCases[{test_case}].{}",
        field.name()
      ),
      FieldPath::Hint { module, lesson, hint } => {
        write!(f, "modules[{module}].lessons[{lesson}].exercise.hints[{hint}]")
      }
    }
  }
}

/// Return a new draft with exactly the addressed leaf replaced.
/// The input draft is never touched; on error no draft is produced.
pub fn set_field(draft: &CourseDraft, path: FieldPath, value: FieldValue) -> Result<CourseDraft, EditorError> {
  let label = path.to_string();
  edit(draft, |d| {
    match path {
      FieldPath::Course(field) => match field {
        CourseField::Title => d.title = value.text(&label)?,
        CourseField::Description => d.description = value.text(&label)?,
        CourseField::Language => d.language = value.text(&label)?,
        CourseField::Duration => d.duration = value.text(&label)?,
        CourseField::Level => {
          let raw = value.text(&label)?;
          d.level = Level::parse(&raw).ok_or(PathError::WrongValue {
            field: label.clone(),
            expected: "one of beginner, intermediate, advanced",
          })?;
        }
        CourseField::EnrolledStudents => {
          let n = value.integer(&label)?;
          d.enrolled_students = u64::try_from(n)
            .map_err(|_| PathError::WrongValue { field: label.clone(), expected: "a non-negative integer" })?;
        }
      },
      FieldPath::Module { module, field } => {
        let m = module_mut(d, module)?;
        match field {
          ModuleField::Title => m.title = value.text(&label)?,
          ModuleField::Description => m.description = value.text(&label)?,
          ModuleField::Order => m.order = value.integer(&label)?,
        }
      }
      FieldPath::Lesson { module, lesson, field } => {
        let l = lesson_mut(d, module, lesson)?;
        match field {
          LessonField::Title => l.title = value.text(&label)?,
          LessonField::Description => l.description = value.text(&label)?,
          LessonField::Content => l.content = value.text(&label)?,
          LessonField::Duration => l.duration = value.text(&label)?,
          LessonField::Order => l.order = value.integer(&label)?,
          LessonField::Completed => {
            l.completed = match value {
              FieldValue::Bool(b) => Some(b),
              FieldValue::Null => None,
              _ => {
                return Err(PathError::WrongValue { field: label.clone(), expected: "a boolean or null" }.into())
              }
            }
          }
        }
      }
      FieldPath::Exercise { module, lesson, field } => {
        let e = exercise_mut(d, module, lesson)?;
        match field {
          ExerciseField::Title => e.title = value.text(&label)?,
          ExerciseField::Description => e.description = value.text(&label)?,
          ExerciseField::StarterCode => e.starter_code = value.text(&label)?,
          ExerciseField::Difficulty => {
            let raw = value.text(&label)?;
            e.difficulty = Difficulty::parse(&raw)
              .ok_or(PathError::WrongValue { field: label.clone(), expected: "one of easy, medium, hard" })?;
          }
        }
      }
      FieldPath::TestCase { module, lesson, test_case, field } => {
        let t = test_case_mut(d, module, lesson, test_case)?;
        match field {
          TestCaseField::Input => t.input = value.text(&label)?,
          TestCaseField::ExpectedOutput => t.expected_output = value.text(&label)?,
          TestCaseField::Description => t.description = value.text(&label)?,
        }
      }
      FieldPath::Hint { module, lesson, hint } => {
        *hint_mut(d, module, lesson, hint)? = value.text(&label)?;
      }
    }
    Ok(())
  })
}
