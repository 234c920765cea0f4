use std::fmt;

use serde::{Deserialize, Serialize};

/// What happens after a step finishes with a given outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Routing {
  /// Advance to the next step, or terminate after the last one.
  #[default]
  Continue,
  /// Terminate the workflow.
  Stop,
  /// Go to the step's jump target.
  Jump,
}

impl fmt::Display for Routing {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Routing::Continue => f.write_str("continue"),
      Routing::Stop => f.write_str("stop"),
      Routing::Jump => f.write_str("jump"),
    }
  }
}

/// Which of the two routing fields of a step is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
  OnSuccess,
  OnFailure,
}

impl fmt::Display for Directive {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Directive::OnSuccess => f.write_str("onSuccess"),
      Directive::OnFailure => f.write_str("onFailure"),
    }
  }
}

/// A single command invocation with timing and outcome routing.
///
/// The step number is owned by the containing [`StepSequence`](crate::StepSequence)
/// and always equals the step's 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
  pub(crate) number: u32,
  /// Command identifier; empty means unset.
  pub command: String,
  /// Command parameters, opaque to cmdflow.
  pub content: String,
  /// Milliseconds to wait before the command is dispatched.
  pub delay: u64,
  pub on_success: Routing,
  pub on_failure: Routing,
  /// Destination step number used by either directive when it is `jump`.
  pub jump_target: Option<u32>,
}

impl Step {
  pub(crate) fn from_draft(number: u32, draft: StepDraft) -> Self {
    Self {
      number,
      command: draft.command,
      content: draft.content,
      delay: draft.delay,
      on_success: draft.on_success,
      on_failure: draft.on_failure,
      jump_target: draft.jump_target,
    }
  }

  /// 1-based position of this step in its sequence.
  pub fn number(&self) -> u32 {
    self.number
  }

  /// Routing for the given directive.
  pub fn routing(&self, directive: Directive) -> Routing {
    match directive {
      Directive::OnSuccess => self.on_success,
      Directive::OnFailure => self.on_failure,
    }
  }

  /// Field values of this step, without its position.
  pub fn to_draft(&self) -> StepDraft {
    StepDraft {
      command: self.command.clone(),
      content: self.content.clone(),
      delay: self.delay,
      on_success: self.on_success,
      on_failure: self.on_failure,
      jump_target: self.jump_target,
    }
  }
}

/// Field values for a step that has not been placed in a sequence yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDraft {
  pub command: String,
  pub content: String,
  pub delay: u64,
  pub on_success: Routing,
  pub on_failure: Routing,
  pub jump_target: Option<u32>,
}

impl Default for StepDraft {
  fn default() -> Self {
    Self {
      command: String::new(),
      content: String::new(),
      delay: 0,
      on_success: Routing::Continue,
      on_failure: Routing::Stop,
      jump_target: None,
    }
  }
}

impl StepDraft {
  /// A draft for `command` with default timing and routing.
  pub fn new(command: impl Into<String>, content: impl Into<String>) -> Self {
    Self {
      command: command.into(),
      content: content.into(),
      ..Self::default()
    }
  }

  pub fn with_delay(mut self, delay: u64) -> Self {
    self.delay = delay;
    self
  }

  pub fn on_success(mut self, routing: Routing) -> Self {
    self.on_success = routing;
    self
  }

  pub fn on_failure(mut self, routing: Routing) -> Self {
    self.on_failure = routing;
    self
  }

  pub fn jump_to(mut self, target: u32) -> Self {
    self.jump_target = Some(target);
    self
  }
}

/// A partial update of a step's fields, as produced by the editor.
///
/// `None` leaves a field untouched. `jump_target: Some(None)` clears the target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepPatch {
  pub command: Option<String>,
  pub content: Option<String>,
  pub delay: Option<u64>,
  pub on_success: Option<Routing>,
  pub on_failure: Option<Routing>,
  pub jump_target: Option<Option<u32>>,
}

impl StepPatch {
  pub(crate) fn apply_to(self, step: &mut Step) {
    if let Some(command) = self.command {
      step.command = command;
    }
    if let Some(content) = self.content {
      step.content = content;
    }
    if let Some(delay) = self.delay {
      step.delay = delay;
    }
    if let Some(routing) = self.on_success {
      step.on_success = routing;
    }
    if let Some(routing) = self.on_failure {
      step.on_failure = routing;
    }
    if let Some(target) = self.jump_target {
      step.jump_target = target;
    }
  }
}
