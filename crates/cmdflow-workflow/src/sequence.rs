//! Structural editing of a step list.
//!
//! Every operation is a pure reducer: it reads the current sequence and
//! returns a new one with step numbers re-derived from position. The input
//! sequence is never modified, so callers replace their reference with the
//! returned value.

use std::ops::Index;

use tracing::debug;

use crate::error::SequenceError;
use crate::step::{Step, StepDraft, StepPatch};

/// Direction for [`Operation::Move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Up,
  Down,
}

/// An editing operation on a step sequence. Indices are 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
  Append(StepDraft),
  Remove(usize),
  Move(usize, Direction),
  Duplicate(usize),
  Edit(usize, StepPatch),
}

/// Ordered list of steps whose numbers always read `1..=N`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepSequence {
  steps: Vec<Step>,
}

impl StepSequence {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a sequence from drafts, numbering them by position.
  pub fn from_drafts(drafts: impl IntoIterator<Item = StepDraft>) -> Self {
    let mut steps: Vec<Step> = drafts
      .into_iter()
      .map(|draft| Step::from_draft(0, draft))
      .collect();
    renumber(&mut steps);
    Self { steps }
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Step> {
    self.steps.iter()
  }

  pub fn as_slice(&self) -> &[Step] {
    &self.steps
  }

  /// Step by 1-based step number.
  pub fn by_number(&self, number: u32) -> Option<&Step> {
    let index = usize::try_from(number).ok()?.checked_sub(1)?;
    self.steps.get(index)
  }

  /// Apply `op` and return the resulting sequence.
  pub fn apply(&self, op: Operation) -> Result<StepSequence, SequenceError> {
    let mut steps = self.steps.clone();
    let len = steps.len();

    match op {
      Operation::Append(draft) => {
        steps.push(Step::from_draft(0, draft));
      }
      Operation::Remove(index) => {
        check_index(index, len)?;
        steps.remove(index);
      }
      Operation::Move(index, direction) => {
        check_index(index, len)?;
        match direction {
          Direction::Up if index > 0 => steps.swap(index, index - 1),
          Direction::Down if index + 1 < len => steps.swap(index, index + 1),
          _ => debug!(index, ?direction, "move at boundary, sequence unchanged"),
        }
      }
      Operation::Duplicate(index) => {
        check_index(index, len)?;
        let copy = steps[index].clone();
        steps.push(copy);
      }
      Operation::Edit(index, patch) => {
        check_index(index, len)?;
        patch.apply_to(&mut steps[index]);
      }
    }

    renumber(&mut steps);
    Ok(StepSequence { steps })
  }

  pub fn append(&self, draft: StepDraft) -> Result<StepSequence, SequenceError> {
    self.apply(Operation::Append(draft))
  }

  pub fn remove(&self, index: usize) -> Result<StepSequence, SequenceError> {
    self.apply(Operation::Remove(index))
  }

  pub fn move_step(&self, index: usize, direction: Direction) -> Result<StepSequence, SequenceError> {
    self.apply(Operation::Move(index, direction))
  }

  pub fn duplicate(&self, index: usize) -> Result<StepSequence, SequenceError> {
    self.apply(Operation::Duplicate(index))
  }

  pub fn edit(&self, index: usize, patch: StepPatch) -> Result<StepSequence, SequenceError> {
    self.apply(Operation::Edit(index, patch))
  }
}

impl Index<usize> for StepSequence {
  type Output = Step;

  fn index(&self, index: usize) -> &Step {
    &self.steps[index]
  }
}

impl<'a> IntoIterator for &'a StepSequence {
  type Item = &'a Step;
  type IntoIter = std::slice::Iter<'a, Step>;

  fn into_iter(self) -> Self::IntoIter {
    self.steps.iter()
  }
}

fn check_index(index: usize, len: usize) -> Result<(), SequenceError> {
  if index < len {
    Ok(())
  } else {
    Err(SequenceError::IndexOutOfRange { index, len })
  }
}

fn renumber(steps: &mut [Step]) {
  for (position, step) in steps.iter_mut().enumerate() {
    step.number = position as u32 + 1;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::step::Routing;

  fn numbers(seq: &StepSequence) -> Vec<u32> {
    seq.iter().map(Step::number).collect()
  }

  fn commands(seq: &StepSequence) -> Vec<&str> {
    seq.iter().map(|s| s.command.as_str()).collect()
  }

  fn three_steps() -> StepSequence {
    StepSequence::from_drafts([
      StepDraft::new("A", "a"),
      StepDraft::new("B", "b"),
      StepDraft::new("C", "c"),
    ])
  }

  fn assert_contiguous(seq: &StepSequence) {
    let expected: Vec<u32> = (1..=seq.len() as u32).collect();
    assert_eq!(numbers(seq), expected);
  }

  #[test]
  fn test_append_uses_defaults() {
    let seq = StepSequence::new()
      .append(StepDraft::new("UPLOAD", "f.txt"))
      .unwrap();

    assert_eq!(seq.len(), 1);
    let step = &seq[0];
    assert_eq!(step.number(), 1);
    assert_eq!(step.delay, 0);
    assert_eq!(step.on_success, Routing::Continue);
    assert_eq!(step.on_failure, Routing::Stop);
    assert_eq!(step.jump_target, None);
  }

  #[test]
  fn test_append_renumbers_like_apply() {
    let seq = three_steps().remove(0).unwrap();
    let draft = StepDraft::new("D", "d");

    let appended = seq.append(draft.clone()).unwrap();

    assert_eq!(appended, seq.apply(Operation::Append(draft)).unwrap());
    assert_eq!(numbers(&appended), vec![1, 2, 3]);
    assert_eq!(appended[2].command, "D");
  }

  #[test]
  fn test_apply_does_not_touch_input() {
    let seq = three_steps();
    let before = seq.clone();

    let _ = seq.remove(0).unwrap();
    let _ = seq.duplicate(1).unwrap();

    assert_eq!(seq, before);
  }

  #[test]
  fn test_remove_renumbers_but_keeps_jump_targets() {
    let seq = three_steps()
      .edit(
        0,
        StepPatch {
          on_failure: Some(Routing::Jump),
          jump_target: Some(Some(3)),
          ..Default::default()
        },
      )
      .unwrap();

    let seq = seq.remove(1).unwrap();

    assert_eq!(commands(&seq), vec!["A", "C"]);
    assert_contiguous(&seq);
    assert_eq!(seq[0].jump_target, Some(3));
  }

  #[test]
  fn test_move_swaps_and_renumbers() {
    let seq = three_steps().move_step(2, Direction::Up).unwrap();
    assert_eq!(commands(&seq), vec!["A", "C", "B"]);
    assert_contiguous(&seq);

    let seq = seq.move_step(0, Direction::Down).unwrap();
    assert_eq!(commands(&seq), vec!["C", "A", "B"]);
    assert_contiguous(&seq);
  }

  #[test]
  fn test_move_at_boundary_is_noop() {
    let seq = three_steps();

    assert_eq!(seq.move_step(0, Direction::Up).unwrap(), seq);
    assert_eq!(seq.move_step(2, Direction::Down).unwrap(), seq);
  }

  #[test]
  fn test_duplicate_appends_copy() {
    let seq = three_steps()
      .edit(
        0,
        StepPatch {
          delay: Some(250),
          on_success: Some(Routing::Jump),
          jump_target: Some(Some(2)),
          ..Default::default()
        },
      )
      .unwrap();

    let dup = seq.duplicate(0).unwrap();

    assert_eq!(dup.len(), 4);
    assert_eq!(dup[3].number(), 4);
    assert_eq!(dup[3].to_draft(), seq[0].to_draft());
  }

  #[test]
  fn test_out_of_range_index() {
    let seq = three_steps();

    for op in [
      Operation::Remove(3),
      Operation::Move(5, Direction::Up),
      Operation::Duplicate(3),
      Operation::Edit(9, StepPatch::default()),
    ] {
      assert!(matches!(
        seq.apply(op),
        Err(SequenceError::IndexOutOfRange { len: 3, .. })
      ));
    }

    assert!(StepSequence::new().remove(0).is_err());
  }

  #[test]
  fn test_numbers_stay_contiguous_across_mixed_operations() {
    let ops = [
      Operation::Append(StepDraft::new("D", "")),
      Operation::Duplicate(1),
      Operation::Remove(0),
      Operation::Move(3, Direction::Up),
      Operation::Append(StepDraft::new("E", "")),
      Operation::Remove(4),
      Operation::Move(0, Direction::Down),
      Operation::Duplicate(0),
      Operation::Remove(2),
    ];

    let mut seq = three_steps();
    for op in ops {
      seq = seq.apply(op).unwrap();
      assert_contiguous(&seq);
    }
    assert_eq!(seq.len(), 4);
  }

  #[test]
  fn test_by_number() {
    let seq = three_steps();

    assert_eq!(seq.by_number(2).map(|s| s.command.as_str()), Some("B"));
    assert!(seq.by_number(0).is_none());
    assert!(seq.by_number(4).is_none());
  }
}
