use std::collections::BTreeSet;

use async_trait::async_trait;
use cmdflow_dispatch::{StepExecutor, StepFailure, StepInvocation};
use serde_json::json;
use tracing::info;

use crate::registry::{CommandRegistry, label_for};

/// Executor that logs what each step would send instead of contacting a
/// device.
///
/// Every step succeeds unless its number was marked with
/// [`DryRunExecutor::failing`].
pub struct DryRunExecutor<R> {
  registry: R,
  failing: BTreeSet<u32>,
}

impl<R: CommandRegistry> DryRunExecutor<R> {
  pub fn new(registry: R) -> Self {
    Self {
      registry,
      failing: BTreeSet::new(),
    }
  }

  /// Report failure for these step numbers.
  pub fn failing(mut self, steps: impl IntoIterator<Item = u32>) -> Self {
    self.failing.extend(steps);
    self
  }
}

#[async_trait]
impl<R: CommandRegistry + 'static> StepExecutor for DryRunExecutor<R> {
  async fn execute(&self, invocation: &StepInvocation) -> Result<serde_json::Value, StepFailure> {
    let label = label_for(&self.registry, &invocation.command).to_string();
    let content = match self.registry.resolve(&invocation.command) {
      Some(descriptor) => descriptor.format_content(&invocation.content),
      None => invocation.content.clone(),
    };
    info!(
      step = invocation.step,
      visit = invocation.visit,
      command = %label,
      content = %content,
      "dry run"
    );

    if self.failing.contains(&invocation.step) {
      return Err(StepFailure::new(format!("{label} marked as failing")));
    }
    Ok(json!({ "label": label, "content": content }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::CommandCatalog;
  use crate::descriptor::CatalogCommand;
  use cmdflow_dispatch::{DispatchError, RunnerConfig, WorkflowRunner};
  use cmdflow_workflow::{Routing, StepDraft, StepSequence, WorkflowDocument};
  use std::sync::Arc;
  use tokio_util::sync::CancellationToken;

  fn invocation(step: u32, command: &str, content: &str) -> StepInvocation {
    StepInvocation {
      execution_id: "exec-1".to_string(),
      workflow_id: "wf".to_string(),
      step,
      command: command.to_string(),
      content: content.to_string(),
      visit: 1,
    }
  }

  fn catalog() -> CommandCatalog {
    let mut catalog = CommandCatalog::new();
    catalog.insert(
      "UPLOAD",
      CatalogCommand::new("Upload file", "path").with_template("upload {{ content }}"),
    );
    catalog
  }

  #[tokio::test]
  async fn test_renders_known_commands() {
    let executor = DryRunExecutor::new(catalog());

    let output = executor
      .execute(&invocation(1, "UPLOAD", "f.txt"))
      .await
      .unwrap();

    assert_eq!(output["label"], "Upload file");
    assert_eq!(output["content"], "upload f.txt");
  }

  #[tokio::test]
  async fn test_unknown_command_passes_through() {
    let executor = DryRunExecutor::new(catalog());

    let output = executor.execute(&invocation(1, "PING", "x")).await.unwrap();

    assert_eq!(output["label"], "PING");
    assert_eq!(output["content"], "x");
  }

  #[tokio::test]
  async fn test_failing_steps_fail() {
    let executor = DryRunExecutor::new(catalog()).failing([2]);

    assert!(executor.execute(&invocation(1, "UPLOAD", "a")).await.is_ok());
    let failure = executor
      .execute(&invocation(2, "UPLOAD", "b"))
      .await
      .unwrap_err();
    assert_eq!(failure.message, "Upload file marked as failing");
  }

  #[tokio::test]
  async fn test_failing_retry_loop_stops_at_visit_limit() {
    let doc = WorkflowDocument::with_steps(
      "retry_upload",
      StepSequence::from_drafts([
        StepDraft::new("UPLOAD", "f.txt")
          .on_failure(Routing::Jump)
          .jump_to(1),
        StepDraft::new("REBOOT", ""),
      ]),
    );
    let executor = Arc::new(DryRunExecutor::new(catalog()).failing([1]));
    let runner = WorkflowRunner::new(executor).with_config(RunnerConfig {
      max_visits: Some(3),
      ..Default::default()
    });

    let err = runner.run(&doc, CancellationToken::new()).await.unwrap_err();

    assert!(matches!(err, DispatchError::VisitLimit { limit: 3, step: 1, .. }));
    let report = err.partial_report().unwrap();
    assert_eq!(report.visit_count, 3);
    assert_eq!(report.visits[2].detail, "Upload file marked as failing");
  }
}
