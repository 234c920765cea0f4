//! Step traversal rules.
//!
//! A run starts at step 1. After each step the outcome selects a routing:
//! `continue` advances (terminating after the last step), `stop` terminates
//! and `jump` moves to the step's jump target. Steps run exactly once per
//! visit, and jumps may revisit earlier steps, so a workflow without a
//! reachable `stop` can run forever. Stopping such a run is the executor's
//! job.

use cmdflow_workflow::{Routing, Step, WorkflowDocument};
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Result of running one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
  Success,
  Failure,
}

/// Position of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
  /// The given step number runs next.
  At(u32),
  Terminated,
}

/// Applies the traversal rules to one document.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'a> {
  doc: &'a WorkflowDocument,
}

impl<'a> Dispatcher<'a> {
  pub fn new(doc: &'a WorkflowDocument) -> Self {
    Self { doc }
  }

  /// Initial state: step 1.
  pub fn start(&self) -> Result<DispatchState, DispatchError> {
    if self.doc.is_empty() {
      return Err(DispatchError::EmptyWorkflow);
    }
    Ok(DispatchState::At(1))
  }

  /// The step a state points at.
  pub fn step(&self, number: u32) -> Result<&'a Step, DispatchError> {
    self
      .doc
      .steps()
      .by_number(number)
      .ok_or(DispatchError::StepNotFound {
        step: number,
        len: self.doc.len(),
      })
  }

  /// State after step `current` finished with `outcome`.
  pub fn next(&self, current: u32, outcome: Outcome) -> Result<DispatchState, DispatchError> {
    let step = self.step(current)?;
    let routing = match outcome {
      Outcome::Success => step.on_success,
      Outcome::Failure => step.on_failure,
    };

    match routing {
      Routing::Stop => Ok(DispatchState::Terminated),
      Routing::Continue if current as usize >= self.doc.len() => Ok(DispatchState::Terminated),
      Routing::Continue => Ok(DispatchState::At(current + 1)),
      Routing::Jump => {
        let len = self.doc.len();
        match step.jump_target {
          Some(target) if target >= 1 && target as usize <= len => Ok(DispatchState::At(target)),
          Some(target) => Err(DispatchError::DanglingJump {
            step: current,
            target,
            len,
          }),
          None => Err(DispatchError::DanglingJump {
            step: current,
            target: 0,
            len,
          }),
        }
      }
    }
  }
}

/// Visited steps of a scripted traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
  pub visited: Vec<u32>,
  /// Whether the traversal reached a terminating transition.
  pub terminated: bool,
}

/// Preview a traversal of `doc`, feeding `outcomes` to the visited steps in
/// order.
///
/// Stops when the workflow terminates, when the outcomes run out, or after
/// `limit` visits.
pub fn trace(
  doc: &WorkflowDocument,
  outcomes: impl IntoIterator<Item = Outcome>,
  limit: usize,
) -> Result<Trace, DispatchError> {
  let dispatcher = Dispatcher::new(doc);
  let mut outcomes = outcomes.into_iter();
  let mut visited = Vec::new();
  let mut state = dispatcher.start()?;

  while let DispatchState::At(current) = state {
    if visited.len() >= limit {
      break;
    }
    visited.push(current);
    let Some(outcome) = outcomes.next() else {
      break;
    };
    state = dispatcher.next(current, outcome)?;
  }

  Ok(Trace {
    visited,
    terminated: state == DispatchState::Terminated,
  })
}
