use cmdflow_dispatch::DispatchError;
use cmdflow_workflow::{SequenceError, ValidationError};

/// Errors surfaced to the editor. The draft is unchanged whenever one of
/// these is returned.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
  #[error("invalid workflow: {0}")]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Sequence(#[from] SequenceError),

  #[error("template store: {0}")]
  Store(#[from] cmdflow_store::Error),

  #[error("hand-off failed: {0}")]
  Dispatch(#[from] DispatchError),
}
