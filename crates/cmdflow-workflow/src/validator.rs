//! Save/execute gate for workflow documents.
//!
//! Validation stops at the first problem so the editor can point at a single
//! step and field.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValidationError;
use crate::step::{Directive, Routing, Step};
use crate::workflow::WorkflowDocument;

/// How strictly jump targets are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
  /// Jump targets used by a `jump` directive must name a step of the document.
  #[default]
  Strict,
  /// Only require that a jump target is present. Accepts documents stored
  /// before range checking existed.
  Compatible,
}

/// Check `doc`, returning the first problem found.
pub fn validate(doc: &WorkflowDocument, policy: ValidationPolicy) -> Result<(), ValidationError> {
  if doc.id.trim().is_empty() {
    return Err(ValidationError::MissingIdentifier);
  }

  let steps = doc.steps();
  if steps.is_empty() {
    return Err(ValidationError::EmptySequence);
  }

  if let Some(step) = steps.iter().find(|s| s.command.is_empty()) {
    return Err(ValidationError::MissingCommand {
      step: step.number(),
    });
  }

  for step in steps {
    for directive in [Directive::OnSuccess, Directive::OnFailure] {
      if step.routing(directive) == Routing::Jump && step.jump_target.is_none() {
        return Err(ValidationError::MissingJumpTarget {
          step: step.number(),
          directive,
        });
      }
    }
  }

  if policy == ValidationPolicy::Strict {
    for step in steps {
      check_range(step, steps.len())?;
    }
  }

  debug!(workflow_id = %doc.id, steps = steps.len(), ?policy, "workflow valid");
  Ok(())
}

fn check_range(step: &Step, len: usize) -> Result<(), ValidationError> {
  let Some(target) = step.jump_target else {
    return Ok(());
  };

  for directive in [Directive::OnSuccess, Directive::OnFailure] {
    if step.routing(directive) == Routing::Jump && (target == 0 || target as usize > len) {
      return Err(ValidationError::JumpTargetOutOfRange {
        step: step.number(),
        directive,
        target,
        len,
      });
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sequence::StepSequence;
  use crate::step::StepDraft;

  fn doc(id: &str, drafts: Vec<StepDraft>) -> WorkflowDocument {
    WorkflowDocument::with_steps(id, StepSequence::from_drafts(drafts))
  }

  #[test]
  fn test_missing_identifier_wins_over_step_problems() {
    let d = doc(
      "  ",
      vec![StepDraft::new("", "").on_success(Routing::Jump)],
    );
    assert_eq!(
      validate(&d, ValidationPolicy::Strict),
      Err(ValidationError::MissingIdentifier)
    );

    let d = doc("", vec![StepDraft::new("PING", "")]);
    assert_eq!(
      validate(&d, ValidationPolicy::Compatible),
      Err(ValidationError::MissingIdentifier)
    );
  }

  #[test]
  fn test_empty_sequence() {
    let d = doc("wf", vec![]);
    assert_eq!(
      validate(&d, ValidationPolicy::Strict),
      Err(ValidationError::EmptySequence)
    );
  }

  #[test]
  fn test_missing_command_names_first_step() {
    let d = doc(
      "wf",
      vec![
        StepDraft::new("PING", ""),
        StepDraft::new("", ""),
        StepDraft::new("", ""),
      ],
    );
    let err = validate(&d, ValidationPolicy::Strict).unwrap_err();
    assert_eq!(err, ValidationError::MissingCommand { step: 2 });
    assert_eq!(err.to_string(), "step 2: command is not set");
  }

  #[test]
  fn test_missing_command_reported_before_jump_problems() {
    let d = doc(
      "wf",
      vec![
        StepDraft::new("PING", "").on_success(Routing::Jump),
        StepDraft::new("", ""),
      ],
    );
    assert_eq!(
      validate(&d, ValidationPolicy::Strict),
      Err(ValidationError::MissingCommand { step: 2 })
    );
  }

  #[test]
  fn test_missing_jump_target_on_success() {
    let d = doc(
      "wf",
      vec![
        StepDraft::new("PING", ""),
        StepDraft::new("UPLOAD", "f.txt").on_success(Routing::Jump),
        StepDraft::new("REBOOT", ""),
      ],
    );
    let err = validate(&d, ValidationPolicy::Compatible).unwrap_err();
    assert_eq!(
      err,
      ValidationError::MissingJumpTarget {
        step: 2,
        directive: Directive::OnSuccess
      }
    );
    assert_eq!(err.step(), Some(2));
    assert!(err.to_string().contains("onSuccess"));
  }

  #[test]
  fn test_missing_jump_target_on_failure() {
    let d = doc(
      "wf",
      vec![StepDraft::new("PING", "").on_failure(Routing::Jump)],
    );
    assert_eq!(
      validate(&d, ValidationPolicy::Strict),
      Err(ValidationError::MissingJumpTarget {
        step: 1,
        directive: Directive::OnFailure
      })
    );
  }

  #[test]
  fn test_self_jump_is_valid() {
    let d = doc(
      "upload_flow",
      vec![
        StepDraft::new("UPLOAD", "f.txt")
          .on_failure(Routing::Jump)
          .jump_to(1),
      ],
    );
    assert_eq!(validate(&d, ValidationPolicy::Strict), Ok(()));
  }

  #[test]
  fn test_dangling_jump_depends_on_policy() {
    let d = doc(
      "wf",
      vec![
        StepDraft::new("PING", "").on_failure(Routing::Jump).jump_to(3),
        StepDraft::new("REBOOT", ""),
        StepDraft::new("UPLOAD", ""),
      ],
    );
    assert_eq!(validate(&d, ValidationPolicy::Strict), Ok(()));

    let d = WorkflowDocument::with_steps("wf", d.steps().remove(1).unwrap());
    assert_eq!(validate(&d, ValidationPolicy::Compatible), Ok(()));
    assert_eq!(
      validate(&d, ValidationPolicy::Strict),
      Err(ValidationError::JumpTargetOutOfRange {
        step: 1,
        directive: Directive::OnFailure,
        target: 3,
        len: 2
      })
    );
  }

  #[test]
  fn test_unused_jump_target_is_not_range_checked() {
    let d = doc("wf", vec![StepDraft::new("PING", "").jump_to(7)]);
    assert_eq!(validate(&d, ValidationPolicy::Strict), Ok(()));
  }

  #[test]
  fn test_zero_jump_target_is_out_of_range() {
    let d = doc(
      "wf",
      vec![StepDraft::new("PING", "").on_success(Routing::Jump).jump_to(0)],
    );
    assert!(matches!(
      validate(&d, ValidationPolicy::Strict),
      Err(ValidationError::JumpTargetOutOfRange { target: 0, .. })
    ));
  }
}
