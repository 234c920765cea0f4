use crate::error::{SequenceError, ValidationError};
use crate::sequence::{Operation, StepSequence};
use crate::validator::{ValidationPolicy, validate};

/// A named, ordered sequence of steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowDocument {
  /// Persistence key within the owning device scope.
  pub id: String,
  steps: StepSequence,
}

impl WorkflowDocument {
  /// An empty document, as created at the start of an editing session.
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      steps: StepSequence::new(),
    }
  }

  pub fn with_steps(id: impl Into<String>, steps: StepSequence) -> Self {
    Self {
      id: id.into(),
      steps,
    }
  }

  pub fn steps(&self) -> &StepSequence {
    &self.steps
  }

  /// Number of steps.
  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  /// Apply a sequencer operation, returning the edited document.
  pub fn apply(&self, op: Operation) -> Result<WorkflowDocument, SequenceError> {
    Ok(WorkflowDocument {
      id: self.id.clone(),
      steps: self.steps.apply(op)?,
    })
  }

  pub fn validate(&self, policy: ValidationPolicy) -> Result<(), ValidationError> {
    validate(self, policy)
  }
}
