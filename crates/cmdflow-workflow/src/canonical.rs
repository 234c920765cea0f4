//! Canonical JSON form of a workflow document.
//!
//! This is the shape persisted by template stores and handed to executors:
//!
//! ```json
//! {
//!   "workflowId": "upload_flow",
//!   "steps": [
//!     {
//!       "step": 1,
//!       "command": "UPLOAD",
//!       "content": "f.txt",
//!       "delay": 0,
//!       "onSuccess": "continue",
//!       "onFailure": "jump",
//!       "jumpToStep": 1
//!     }
//!   ]
//! }
//! ```
//!
//! `jumpToStep` is omitted when no target is set. Decoding re-derives step
//! numbers from array position and tolerates targets stored as strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::WorkflowError;
use crate::sequence::StepSequence;
use crate::step::{Routing, Step, StepDraft};
use crate::workflow::WorkflowDocument;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalWorkflow {
  pub workflow_id: String,
  pub steps: Vec<CanonicalStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalStep {
  #[serde(default)]
  pub step: u32,
  pub command: String,
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub delay: u64,
  pub on_success: Routing,
  pub on_failure: Routing,
  #[serde(
    default,
    skip_serializing_if = "Option::is_none",
    deserialize_with = "deserialize_jump_target"
  )]
  pub jump_to_step: Option<u32>,
}

impl From<&Step> for CanonicalStep {
  fn from(step: &Step) -> Self {
    Self {
      step: step.number(),
      command: step.command.clone(),
      content: step.content.clone(),
      delay: step.delay,
      on_success: step.on_success,
      on_failure: step.on_failure,
      jump_to_step: step.jump_target,
    }
  }
}

impl From<CanonicalStep> for StepDraft {
  fn from(step: CanonicalStep) -> Self {
    StepDraft {
      command: step.command,
      content: step.content,
      delay: step.delay,
      on_success: step.on_success,
      on_failure: step.on_failure,
      jump_target: step.jump_to_step,
    }
  }
}

impl CanonicalWorkflow {
  /// Project `doc`, substituting a generated id when its id is blank.
  pub fn from_document(doc: &WorkflowDocument) -> Self {
    Self::from_document_at(doc, Utc::now())
  }

  pub(crate) fn from_document_at(doc: &WorkflowDocument, now: DateTime<Utc>) -> Self {
    let workflow_id = if doc.id.trim().is_empty() {
      generated_id(now)
    } else {
      doc.id.clone()
    };

    Self {
      workflow_id,
      steps: doc.steps().iter().map(CanonicalStep::from).collect(),
    }
  }

  /// Rebuild an editable document. Step numbers follow array order.
  pub fn into_document(self) -> WorkflowDocument {
    let steps = StepSequence::from_drafts(self.steps.into_iter().map(StepDraft::from));
    WorkflowDocument::with_steps(self.workflow_id, steps)
  }
}

/// Identifier used when a document is serialized without one.
pub fn generated_id(now: DateTime<Utc>) -> String {
  format!("workflow_{}", now.timestamp_millis())
}

/// Serialize `doc` to its canonical JSON string.
pub fn to_json(doc: &WorkflowDocument) -> String {
  let canonical = CanonicalWorkflow::from_document(doc);
  serde_json::to_string(&canonical).expect("canonical workflow serializes to JSON")
}

pub fn to_json_pretty(doc: &WorkflowDocument) -> String {
  let canonical = CanonicalWorkflow::from_document(doc);
  serde_json::to_string_pretty(&canonical).expect("canonical workflow serializes to JSON")
}

/// Decode canonical JSON into a document.
pub fn from_json(json: &str) -> Result<WorkflowDocument, WorkflowError> {
  let canonical: CanonicalWorkflow = serde_json::from_str(json)?;
  Ok(canonical.into_document())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTarget {
  Number(u32),
  Text(String),
}

fn deserialize_jump_target<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
  D: Deserializer<'de>,
{
  match Option::<StoredTarget>::deserialize(deserializer)? {
    None => Ok(None),
    Some(StoredTarget::Number(n)) => Ok(Some(n)),
    Some(StoredTarget::Text(text)) => {
      let text = text.trim();
      if text.is_empty() {
        Ok(None)
      } else {
        text
          .parse()
          .map(Some)
          .map_err(|_| serde::de::Error::custom(format!("invalid jumpToStep: {text:?}")))
      }
    }
  }
}
