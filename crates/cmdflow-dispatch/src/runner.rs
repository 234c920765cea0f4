//! Async driver for the traversal rules.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use cmdflow_workflow::{ValidationPolicy, WorkflowDocument};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::dispatcher::{DispatchState, Dispatcher, Outcome};
use crate::error::DispatchError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};
use crate::executor::{StepExecutor, StepInvocation};

/// Visits kept in a [`RunReport`] unless configured otherwise.
pub const DEFAULT_HISTORY: usize = 32;

fn default_history() -> usize {
  DEFAULT_HISTORY
}

/// Limits applied to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
  /// Validation applied before the first step.
  #[serde(default)]
  pub policy: ValidationPolicy,
  /// Abort after this many step visits. `None` runs until termination or
  /// cancellation.
  #[serde(default)]
  pub max_visits: Option<u64>,
  /// Number of most recent visits kept in the report. The full sequence is
  /// only available through an [`ExecutionNotifier`].
  #[serde(default = "default_history")]
  pub history: usize,
}

impl Default for RunnerConfig {
  fn default() -> Self {
    Self {
      policy: ValidationPolicy::default(),
      max_visits: None,
      history: DEFAULT_HISTORY,
    }
  }
}

/// One step visit of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
  pub step: u32,
  pub outcome: Outcome,
  /// Executor output on success, failure message otherwise.
  pub detail: serde_json::Value,
}

/// What a run did, up to termination or the point it was stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
  pub execution_id: String,
  pub workflow_id: String,
  /// Total number of step visits.
  pub visit_count: u64,
  /// The most recent visits, oldest first, at most `RunnerConfig::history`.
  pub visits: VecDeque<Visit>,
}

impl RunReport {
  fn new(execution_id: &str, workflow_id: &str) -> Self {
    Self {
      execution_id: execution_id.to_string(),
      workflow_id: workflow_id.to_string(),
      visit_count: 0,
      visits: VecDeque::new(),
    }
  }

  fn record(&mut self, visit: Visit, history: usize) {
    self.visit_count += 1;
    if history == 0 {
      return;
    }
    if self.visits.len() == history {
      self.visits.pop_front();
    }
    self.visits.push_back(visit);
  }

  /// The last step visited, if any.
  pub fn last_step(&self) -> Option<u32> {
    self.visits.back().map(|visit| visit.step)
  }
}

/// Steps through a workflow, delegating each command to a [`StepExecutor`].
pub struct WorkflowRunner<E> {
  executor: Arc<E>,
  notifier: Arc<dyn ExecutionNotifier>,
  config: RunnerConfig,
}

impl<E: StepExecutor> WorkflowRunner<E> {
  pub fn new(executor: Arc<E>) -> Self {
    Self {
      executor,
      notifier: Arc::new(NoopNotifier),
      config: RunnerConfig::default(),
    }
  }

  pub fn with_notifier(mut self, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  pub fn with_config(mut self, config: RunnerConfig) -> Self {
    self.config = config;
    self
  }

  pub fn config(&self) -> &RunnerConfig {
    &self.config
  }

  /// Validate `doc` and run it until it terminates.
  ///
  /// A cancelled run, or one stopped by the visit limit, carries its partial
  /// report in the error.
  #[instrument(name = "workflow_run", skip(self, doc, cancel), fields(workflow_id = %doc.id))]
  pub async fn run(
    &self,
    doc: &WorkflowDocument,
    cancel: CancellationToken,
  ) -> Result<RunReport, DispatchError> {
    doc.validate(self.config.policy)?;

    let execution_id = uuid::Uuid::new_v4().to_string();
    info!(execution_id = %execution_id, steps = doc.len(), "workflow_started");
    self.notifier.notify(ExecutionEvent::WorkflowStarted {
      execution_id: execution_id.clone(),
      workflow_id: doc.id.clone(),
    });

    let result = self.run_loop(doc, &execution_id, &cancel).await;

    match &result {
      Ok(report) => {
        info!(execution_id = %execution_id, visits = report.visit_count, "workflow_completed");
        self.notifier.notify(ExecutionEvent::WorkflowCompleted {
          execution_id,
          visits: report.visit_count,
        });
      }
      Err(e) => {
        error!(execution_id = %execution_id, error = %e, "workflow_failed");
        self.notifier.notify(ExecutionEvent::WorkflowFailed {
          execution_id,
          error: e.to_string(),
        });
      }
    }

    result
  }

  async fn run_loop(
    &self,
    doc: &WorkflowDocument,
    execution_id: &str,
    cancel: &CancellationToken,
  ) -> Result<RunReport, DispatchError> {
    let dispatcher = Dispatcher::new(doc);
    let mut state = dispatcher.start()?;
    let mut report = RunReport::new(execution_id, &doc.id);
    // Keyed by step number, so bounded by the workflow length
    let mut visit_counts: HashMap<u32, u64> = HashMap::new();

    while let DispatchState::At(current) = state {
      if cancel.is_cancelled() {
        warn!(execution_id = %execution_id, step = current, "cancelled between steps");
        return Err(DispatchError::Cancelled {
          report: Box::new(report),
        });
      }

      if let Some(limit) = self.config.max_visits
        && report.visit_count >= limit
      {
        warn!(execution_id = %execution_id, limit, step = current, "visit limit reached");
        return Err(DispatchError::VisitLimit {
          limit,
          step: current,
          report: Box::new(report),
        });
      }

      let step = dispatcher.step(current)?;
      let visit = {
        let count = visit_counts.entry(current).or_default();
        *count += 1;
        *count
      };

      self.notifier.notify(ExecutionEvent::StepStarted {
        execution_id: execution_id.to_string(),
        step: current,
        command: step.command.clone(),
      });

      if step.delay > 0 {
        debug!(step = current, delay_ms = step.delay, "waiting before dispatch");
        tokio::select! {
          _ = tokio::time::sleep(Duration::from_millis(step.delay)) => {}
          _ = cancel.cancelled() => {
            warn!(execution_id = %execution_id, step = current, "cancelled during delay");
            return Err(DispatchError::Cancelled { report: Box::new(report) });
          }
        }
      }

      let invocation = StepInvocation {
        execution_id: execution_id.to_string(),
        workflow_id: doc.id.clone(),
        step: current,
        command: step.command.clone(),
        content: step.content.clone(),
        visit,
      };

      let result = tokio::select! {
        result = self.executor.execute(&invocation) => result,
        _ = cancel.cancelled() => {
          warn!(execution_id = %execution_id, step = current, "cancelled during step");
          return Err(DispatchError::Cancelled { report: Box::new(report) });
        }
      };

      let (outcome, detail) = match result {
        Ok(output) => (Outcome::Success, output),
        Err(failure) => (Outcome::Failure, serde_json::Value::String(failure.message)),
      };
      debug!(step = current, ?outcome, "step finished");

      self.notifier.notify(ExecutionEvent::StepFinished {
        execution_id: execution_id.to_string(),
        step: current,
        outcome,
      });
      report.record(
        Visit {
          step: current,
          outcome,
          detail,
        },
        self.config.history,
      );

      state = dispatcher.next(current, outcome)?;
    }

    Ok(report)
  }
}
