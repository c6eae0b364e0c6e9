//! Pure replace-on-write updates over the draft tree.
//!
//! Every function takes the current draft by reference and returns a new one. Positions shift on
//! insert/remove; `order` fields are never renumbered.

use uuid::Uuid;

use crate::domain::{CourseDraft, Exercise, Lesson, Module, TestCase};
use crate::error::EditorError;

fn check(what: &'static str, index: usize, len: usize) -> Result<(), EditorError> {
  if index < len { Ok(()) } else { Err(EditorError::IndexOutOfRange { what, index, len }) }
}

/// Clone the draft, run `f` on the clone and hand it back if `f` succeeded.
pub fn edit<F>(draft: &CourseDraft, f: F) -> Result<CourseDraft, EditorError>
where
  F: FnOnce(&mut CourseDraft) -> Result<(), EditorError>,
{
  let mut next = draft.clone();
  f(&mut next)?;
  Ok(next)
}

pub fn module_mut(d: &mut CourseDraft, module: usize) -> Result<&mut Module, EditorError> {
  check("module", module, d.modules.len())?;
  Ok(&mut d.modules[module])
}

pub fn lesson_mut(d: &mut CourseDraft, module: usize, lesson: usize) -> Result<&mut Lesson, EditorError> {
  let m = module_mut(d, module)?;
  check("lesson", lesson, m.lessons.len())?;
  Ok(&mut m.lessons[lesson])
}

pub fn exercise_mut(d: &mut CourseDraft, module: usize, lesson: usize) -> Result<&mut Exercise, EditorError> {
  lesson_mut(d, module, lesson)?
    .exercise
    .as_mut()
    .ok_or(EditorError::NoExercise { module, lesson })
}

pub fn test_case_mut(
  d: &mut CourseDraft,
  module: usize,
  lesson: usize,
  test_case: usize,
) -> Result<&mut TestCase, EditorError> {
  let e = exercise_mut(d, module, lesson)?;
  check("test case", test_case, e.test_cases.len())?;
  Ok(&mut e.test_cases[test_case])
}

pub fn hint_mut(d: &mut CourseDraft, module: usize, lesson: usize, hint: usize) -> Result<&mut String, EditorError> {
  let e = exercise_mut(d, module, lesson)?;
  check("hint", hint, e.hints.len())?;
  Ok(&mut e.hints[hint])
}

pub fn add_module(draft: &CourseDraft) -> CourseDraft {
  let mut next = draft.clone();
  let order = next.modules.len() as i64;
  next.modules.push(Module::empty(order));
  next
}

pub fn remove_module(draft: &CourseDraft, module: usize) -> Result<CourseDraft, EditorError> {
  edit(draft, |d| {
    check("module", module, d.modules.len())?;
    d.modules.remove(module);
    Ok(())
  })
}

pub fn add_lesson(draft: &CourseDraft, module: usize) -> Result<CourseDraft, EditorError> {
  edit(draft, |d| {
    let m = module_mut(d, module)?;
    let order = m.lessons.len() as i64;
    m.lessons.push(Lesson::empty(order));
    Ok(())
  })
}

pub fn remove_lesson(draft: &CourseDraft, module: usize, lesson: usize) -> Result<CourseDraft, EditorError> {
  edit(draft, |d| {
    let m = module_mut(d, module)?;
    check("lesson", lesson, m.lessons.len())?;
    m.lessons.remove(lesson);
    Ok(())
  })
}

/// Attach a default exercise, or drop the current one with all its tests and hints.
/// Attaching to a lesson that already has an exercise keeps it as is.
pub fn set_exercise(draft: &CourseDraft, module: usize, lesson: usize, attach: bool) -> Result<CourseDraft, EditorError> {
  edit(draft, |d| {
    let l = lesson_mut(d, module, lesson)?;
    if !attach {
      l.exercise = None;
    } else if l.exercise.is_none() {
      l.exercise = Some(Exercise::default());
    }
    Ok(())
  })
}

pub fn add_test_case(draft: &CourseDraft, module: usize, lesson: usize) -> Result<CourseDraft, EditorError> {
  edit(draft, |d| {
    exercise_mut(d, module, lesson)?.test_cases.push(TestCase::empty());
    Ok(())
  })
}

pub fn remove_test_case(
  draft: &CourseDraft,
  module: usize,
  lesson: usize,
  test_case: usize,
) -> Result<CourseDraft, EditorError> {
  edit(draft, |d| {
    let e = exercise_mut(d, module, lesson)?;
    check("test case", test_case, e.test_cases.len())?;
    e.test_cases.remove(test_case);
    Ok(())
  })
}

pub fn add_hint(draft: &CourseDraft, module: usize, lesson: usize) -> Result<CourseDraft, EditorError> {
  edit(draft, |d| {
    exercise_mut(d, module, lesson)?.hints.push(String::new());
    Ok(())
  })
}

pub fn remove_hint(draft: &CourseDraft, module: usize, lesson: usize, hint: usize) -> Result<CourseDraft, EditorError> {
  edit(draft, |d| {
    let e = exercise_mut(d, module, lesson)?;
    check("hint", hint, e.hints.len())?;
    e.hints.remove(hint);
    Ok(())
  })
}

// Stable key lookups. Keys survive index shifts, positions do not.

pub fn module_position(d: &CourseDraft, key: Uuid) -> Option<usize> {
  d.modules.iter().position(|m| m.key == key)
}

pub fn lesson_position(d: &CourseDraft, module_key: Uuid, lesson_key: Uuid) -> Option<(usize, usize)> {
  let m = module_position(d, module_key)?;
  let l = d.modules[m].lessons.iter().position(|l| l.key == lesson_key)?;
  Some((m, l))
}

pub fn test_case_position(
  d: &CourseDraft,
  module_key: Uuid,
  lesson_key: Uuid,
  test_case_key: Uuid,
) -> Option<(usize, usize, usize)> {
  let (m, l) = lesson_position(d, module_key, lesson_key)?;
  let e = d.modules[m].lessons[l].exercise.as_ref()?;
  let k = e.test_cases.iter().position(|t| t.key == test_case_key)?;
  Some((m, l, k))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Difficulty;

  fn with_modules(n: usize) -> CourseDraft {
    (0..n).fold(CourseDraft::default(), |d, _| add_module(&d))
  }

  #[test]
  fn appended_modules_take_creation_count_as_order() {
    let d = with_modules(4);
    assert_eq!(d.modules.len(), 4);
    for (i, m) in d.modules.iter().enumerate() {
      assert_eq!(m.order, i as i64);
    }
  }

  #[test]
  fn removing_a_module_shifts_followers_without_renumbering() {
    let mut d = with_modules(3);
    d.modules[0].title = "A".into();
    d.modules[1].title = "B".into();
    d.modules[2].title = "C".into();
    let removed_key = d.modules[1].key;

    let after = remove_module(&d, 1).unwrap();
    assert_eq!(after.modules.len(), 2);
    assert_eq!(after.modules[0], d.modules[0]);
    assert_eq!(after.modules[1], d.modules[2]);
    assert_eq!(after.modules[1].order, 2);
    assert!(module_position(&after, removed_key).is_none());
    // original untouched
    assert_eq!(d.modules.len(), 3);
  }

  #[test]
  fn new_module_after_removal_reuses_count_as_order() {
    let d = remove_module(&with_modules(3), 0).unwrap();
    let d = add_module(&d);
    let orders: Vec<i64> = d.modules.iter().map(|m| m.order).collect();
    assert_eq!(orders, vec![1, 2, 2]);
  }

  #[test]
  fn lessons_are_scoped_to_their_module() {
    let d = with_modules(2);
    let d = add_lesson(&d, 1).unwrap();
    let d = add_lesson(&d, 1).unwrap();
    let d = add_lesson(&d, 0).unwrap();
    assert_eq!(d.modules[0].lessons.len(), 1);
    assert_eq!(d.modules[1].lessons.iter().map(|l| l.order).collect::<Vec<_>>(), vec![0, 1]);

    let d = remove_lesson(&d, 1, 0).unwrap();
    assert_eq!(d.modules[1].lessons.len(), 1);
    assert_eq!(d.modules[1].lessons[0].order, 1);
    assert_eq!(
      remove_lesson(&d, 1, 3).unwrap_err(),
      EditorError::IndexOutOfRange { what: "lesson", index: 3, len: 1 }
    );
  }

  #[test]
  fn detaching_an_exercise_discards_its_contents() {
    let d = add_lesson(&with_modules(1), 0).unwrap();
    let d = set_exercise(&d, 0, 0, true).unwrap();
    let ex = d.modules[0].lessons[0].exercise.as_ref().unwrap();
    assert_eq!(ex.difficulty, Difficulty::Easy);
    assert!(ex.test_cases.is_empty() && ex.hints.is_empty());

    let d = add_test_case(&d, 0, 0).unwrap();
    let d = add_hint(&d, 0, 0).unwrap();
    let d = set_exercise(&d, 0, 0, false).unwrap();
    assert!(d.modules[0].lessons[0].exercise.is_none());

    let d = set_exercise(&d, 0, 0, true).unwrap();
    let ex = d.modules[0].lessons[0].exercise.as_ref().unwrap();
    assert!(ex.test_cases.is_empty());
    assert!(ex.hints.is_empty());
  }

  #[test]
  fn test_cases_and_hints_need_an_exercise() {
    let d = add_lesson(&with_modules(1), 0).unwrap();
    assert_eq!(add_test_case(&d, 0, 0).unwrap_err(), EditorError::NoExercise { module: 0, lesson: 0 });
    assert_eq!(add_hint(&d, 0, 0).unwrap_err(), EditorError::NoExercise { module: 0, lesson: 0 });
  }

  #[test]
  fn keys_track_elements_across_shifts() {
    let d = add_lesson(&with_modules(2), 1).unwrap();
    let d = set_exercise(&d, 1, 0, true).unwrap();
    let d = add_test_case(&d, 1, 0).unwrap();
    let d = add_test_case(&d, 1, 0).unwrap();
    let mk = d.modules[1].key;
    let lk = d.modules[1].lessons[0].key;
    let tk = d.modules[1].lessons[0].exercise.as_ref().unwrap().test_cases[1].key;

    let d = remove_module(&d, 0).unwrap();
    let d = remove_test_case(&d, 0, 0, 0).unwrap();
    assert_eq!(test_case_position(&d, mk, lk, tk), Some((0, 0, 0)));
    assert_eq!(lesson_position(&d, mk, lk), Some((0, 0)));
  }

  #[test]
  fn hints_remove_by_position() {
    let d = add_lesson(&with_modules(1), 0).unwrap();
    let d = set_exercise(&d, 0, 0, true).unwrap();
    let mut d = add_hint(&add_hint(&d, 0, 0).unwrap(), 0, 0).unwrap();
    *hint_mut(&mut d, 0, 0, 0).unwrap() = "first".into();
    *hint_mut(&mut d, 0, 0, 1).unwrap() = "second".into();
    let d = remove_hint(&d, 0, 0, 0).unwrap();
    assert_eq!(d.modules[0].lessons[0].exercise.as_ref().unwrap().hints, vec!["second".to_string()]);
  }
}
