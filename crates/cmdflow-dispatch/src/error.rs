//! Dispatch errors.

use cmdflow_workflow::{ValidationError, WorkflowError};

use crate::runner::RunReport;

/// Errors that can occur while stepping through a workflow.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
  /// The workflow has no steps to start from.
  #[error("workflow has no steps")]
  EmptyWorkflow,

  /// A step number that does not exist in the workflow.
  #[error("step {step} not found in workflow of {len} steps")]
  StepNotFound { step: u32, len: usize },

  /// A jump directive pointing outside the workflow.
  #[error("step {step} jumps to step {target}, but the workflow has {len} steps")]
  DanglingJump { step: u32, target: u32, len: usize },

  /// The workflow did not pass validation.
  #[error("workflow is invalid: {0}")]
  Invalid(#[from] ValidationError),

  /// The hand-off payload could not be decoded.
  #[error(transparent)]
  Decode(#[from] WorkflowError),

  /// The configured visit limit was reached before the workflow terminated.
  #[error("visit limit of {limit} reached at step {step}")]
  VisitLimit {
    limit: u64,
    step: u32,
    report: Box<RunReport>,
  },

  /// The receiving end of a hand-off is gone.
  #[error("executor channel closed")]
  ChannelClosed,

  /// Execution was cancelled.
  #[error("execution cancelled")]
  Cancelled { report: Box<RunReport> },
}

impl DispatchError {
  /// The visits made before a run was stopped early.
  pub fn partial_report(&self) -> Option<&RunReport> {
    match self {
      DispatchError::VisitLimit { report, .. } | DispatchError::Cancelled { report } => {
        Some(report.as_ref())
      }
      _ => None,
    }
  }
}
