//! Execution events and notifiers.
//!
//! The runner emits an event for every step visit so that consumers can
//! persist history, stream progress to an editor preview, or ignore it.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::dispatcher::Outcome;

/// Events emitted while a workflow runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  WorkflowStarted {
    execution_id: String,
    workflow_id: String,
  },

  /// A step is about to wait out its delay and run.
  StepStarted {
    execution_id: String,
    step: u32,
    command: String,
  },

  StepFinished {
    execution_id: String,
    step: u32,
    outcome: Outcome,
  },

  /// The workflow reached a terminating transition.
  WorkflowCompleted { execution_id: String, visits: u64 },

  WorkflowFailed { execution_id: String, error: String },
}

/// Receiver of execution events.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// Forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls a run. Volume is one or two
  // events per step visit.
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
