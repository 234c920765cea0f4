//! Hand-off of serialized workflows to an executor.
//!
//! Editors never run steps themselves. They validate, serialize to canonical
//! JSON, and pass the string through a [`Handoff`].

use std::sync::Arc;

use async_trait::async_trait;
use cmdflow_workflow::from_json;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::DispatchError;
use crate::executor::StepExecutor;
use crate::runner::{RunReport, WorkflowRunner};

/// Acknowledgement of a hand-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoffReceipt {
  pub execution_id: String,
  pub workflow_id: String,
  /// Present when the hand-off ran the workflow to completion.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub report: Option<RunReport>,
}

/// Executor entry point taking the canonical workflow JSON.
#[async_trait]
pub trait Handoff: Send + Sync {
  async fn execute(&self, workflow_json: String) -> Result<HandoffReceipt, DispatchError>;
}

/// A serialized workflow queued for an external executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedWorkflow {
  pub execution_id: String,
  pub workflow_json: String,
}

/// Queues workflows on a channel for a consumer in another task or process
/// bridge.
#[derive(Debug, Clone)]
pub struct ChannelHandoff {
  sender: mpsc::Sender<QueuedWorkflow>,
}

impl ChannelHandoff {
  pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<QueuedWorkflow>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (Self { sender }, receiver)
  }
}

#[async_trait]
impl Handoff for ChannelHandoff {
  async fn execute(&self, workflow_json: String) -> Result<HandoffReceipt, DispatchError> {
    let workflow_id = from_json(&workflow_json)?.id;
    let execution_id = uuid::Uuid::new_v4().to_string();

    self
      .sender
      .send(QueuedWorkflow {
        execution_id: execution_id.clone(),
        workflow_json,
      })
      .await
      .map_err(|_| DispatchError::ChannelClosed)?;

    info!(workflow_id = %workflow_id, execution_id = %execution_id, "workflow queued");
    Ok(HandoffReceipt {
      execution_id,
      workflow_id,
      report: None,
    })
  }
}

/// Decodes the payload and runs it in-process with a [`WorkflowRunner`].
pub struct RunnerHandoff<E> {
  runner: Arc<WorkflowRunner<E>>,
  cancel: CancellationToken,
}

impl<E: StepExecutor> RunnerHandoff<E> {
  /// Each hand-off runs under a child of `cancel`.
  pub fn new(runner: Arc<WorkflowRunner<E>>, cancel: CancellationToken) -> Self {
    Self { runner, cancel }
  }
}

#[async_trait]
impl<E: StepExecutor + 'static> Handoff for RunnerHandoff<E> {
  async fn execute(&self, workflow_json: String) -> Result<HandoffReceipt, DispatchError> {
    let doc = from_json(&workflow_json)?;
    let report = self.runner.run(&doc, self.cancel.child_token()).await?;

    Ok(HandoffReceipt {
      execution_id: report.execution_id.clone(),
      workflow_id: report.workflow_id.clone(),
      report: Some(report),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::runner::tests::ScriptedExecutor;
  use cmdflow_workflow::{Routing, StepDraft, StepSequence, WorkflowDocument, to_json};

  fn doc() -> WorkflowDocument {
    WorkflowDocument::with_steps(
      "upload_flow",
      StepSequence::from_drafts([
        StepDraft::new("UPLOAD", "f.txt")
          .on_failure(Routing::Jump)
          .jump_to(1),
        StepDraft::new("REBOOT", ""),
      ]),
    )
  }

  #[tokio::test]
  async fn test_channel_handoff_queues_json() {
    let (handoff, mut receiver) = ChannelHandoff::new(4);
    let json = to_json(&doc());

    let receipt = handoff.execute(json.clone()).await.unwrap();

    assert_eq!(receipt.workflow_id, "upload_flow");
    assert!(receipt.report.is_none());
    let queued = receiver.recv().await.unwrap();
    assert_eq!(queued.workflow_json, json);
    assert_eq!(queued.execution_id, receipt.execution_id);
  }

  #[tokio::test]
  async fn test_channel_handoff_closed() {
    let (handoff, receiver) = ChannelHandoff::new(1);
    drop(receiver);

    let err = handoff.execute(to_json(&doc())).await.unwrap_err();
    assert!(matches!(err, DispatchError::ChannelClosed));
  }

  #[tokio::test]
  async fn test_runner_handoff_runs_payload() {
    let executor = Arc::new(ScriptedExecutor::default());
    let runner = Arc::new(WorkflowRunner::new(executor.clone()));
    let handoff = RunnerHandoff::new(runner, CancellationToken::new());

    let receipt = handoff.execute(to_json(&doc())).await.unwrap();

    let report = receipt.report.unwrap();
    assert_eq!(report.visits.len(), 2);
    assert_eq!(executor.seen.lock().unwrap()[0].content, "f.txt");
  }

  #[tokio::test]
  async fn test_runner_handoff_rejects_garbage() {
    let runner = Arc::new(WorkflowRunner::new(Arc::new(ScriptedExecutor::default())));
    let handoff = RunnerHandoff::new(runner, CancellationToken::new());

    let err = handoff.execute("{not json".to_string()).await.unwrap_err();
    assert!(matches!(err, DispatchError::Decode(_)));
  }
}
