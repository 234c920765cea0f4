use std::fmt;

use cmdflow_workflow::{Routing, WorkflowDocument};

use crate::registry::{CommandRegistry, label_for};

/// One display row of a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSummary {
  pub number: u32,
  pub command: String,
  pub label: String,
  pub content: String,
  pub delay: u64,
  pub on_success: Routing,
  pub on_failure: Routing,
  pub jump_target: Option<u32>,
}

/// Resolve labels and rendered content for every step of `doc`.
pub fn describe(doc: &WorkflowDocument, registry: &dyn CommandRegistry) -> Vec<StepSummary> {
  doc
    .steps()
    .iter()
    .map(|step| {
      let content = match registry.resolve(&step.command) {
        Some(descriptor) => descriptor.format_content(&step.content),
        None => step.content.clone(),
      };
      StepSummary {
        number: step.number(),
        command: step.command.clone(),
        label: label_for(registry, &step.command).to_string(),
        content,
        delay: step.delay,
        on_success: step.on_success,
        on_failure: step.on_failure,
        jump_target: step.jump_target,
      }
    })
    .collect()
}

impl fmt::Display for StepSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:>3}. {}", self.number, self.label)?;
    if !self.content.is_empty() {
      write!(f, " ({})", self.content)?;
    }
    if self.delay > 0 {
      write!(f, " after {}ms", self.delay)?;
    }
    write!(
      f,
      " | ok: {} | fail: {}",
      route(self.on_success, self.jump_target),
      route(self.on_failure, self.jump_target)
    )
  }
}

fn route(routing: Routing, target: Option<u32>) -> String {
  match (routing, target) {
    (Routing::Jump, Some(t)) => format!("jump {t}"),
    (Routing::Jump, None) => "jump ?".to_string(),
    (other, _) => other.to_string(),
  }
}
