use thiserror::Error;

use crate::step::Directive;

/// First problem found while validating a workflow document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("workflow id is missing")]
  MissingIdentifier,

  #[error("workflow has no steps")]
  EmptySequence,

  #[error("step {step}: command is not set")]
  MissingCommand { step: u32 },

  #[error("step {step}: {directive} is jump but no jump target is set")]
  MissingJumpTarget { step: u32, directive: Directive },

  #[error("step {step}: {directive} jumps to step {target}, but the workflow has {len} steps")]
  JumpTargetOutOfRange {
    step: u32,
    directive: Directive,
    target: u32,
    len: usize,
  },
}

impl ValidationError {
  /// Step number the error refers to, if any.
  pub fn step(&self) -> Option<u32> {
    match self {
      ValidationError::MissingIdentifier | ValidationError::EmptySequence => None,
      ValidationError::MissingCommand { step }
      | ValidationError::MissingJumpTarget { step, .. }
      | ValidationError::JumpTargetOutOfRange { step, .. } => Some(*step),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
  #[error("step index {index} out of range for {len} steps")]
  IndexOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("failed to decode workflow JSON: {0}")]
  Decode(#[from] serde_json::Error),
}
