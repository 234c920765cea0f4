use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What an executor receives for one step visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInvocation {
  pub execution_id: String,
  pub workflow_id: String,
  pub step: u32,
  pub command: String,
  pub content: String,
  /// How many times this step has been visited in this run, starting at 1.
  pub visit: u64,
}

/// A step that ran and failed. Routed through the step's `onFailure`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StepFailure {
  pub message: String,
}

impl StepFailure {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

/// Runs a single command against a device.
///
/// Implementations live outside cmdflow; the runner only needs to know
/// whether the command succeeded.
#[async_trait]
pub trait StepExecutor: Send + Sync {
  async fn execute(&self, invocation: &StepInvocation) -> Result<serde_json::Value, StepFailure>;
}
