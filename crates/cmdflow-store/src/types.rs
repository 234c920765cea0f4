use std::fmt;

use chrono::{DateTime, Utc};
use cmdflow_workflow::CanonicalWorkflow;
use serde::{Deserialize, Serialize};

/// Namespace owning a set of templates, typically one device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceScope(String);

impl DeviceScope {
  pub fn new(scope: impl Into<String>) -> Self {
    Self(scope.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for DeviceScope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A stored workflow, keyed by `(scope, document.workflow_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
  pub scope: DeviceScope,
  pub document: CanonicalWorkflow,
  pub saved_at: DateTime<Utc>,
}

impl TemplateRecord {
  pub fn new(scope: DeviceScope, document: CanonicalWorkflow) -> Self {
    Self {
      scope,
      document,
      saved_at: Utc::now(),
    }
  }

  pub fn workflow_id(&self) -> &str {
    &self.document.workflow_id
  }

  pub fn summary(&self) -> TemplateSummary {
    TemplateSummary {
      workflow_id: self.document.workflow_id.clone(),
      step_count: self.document.steps.len(),
      saved_at: self.saved_at,
    }
  }
}

/// Catalog entry for a stored template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSummary {
  pub workflow_id: String,
  pub step_count: usize,
  pub saved_at: DateTime<Utc>,
}

/// Change to the set of stored templates, pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogEvent {
  Upserted {
    scope: DeviceScope,
    summary: TemplateSummary,
  },
  Removed {
    scope: DeviceScope,
    workflow_id: String,
  },
}

impl CatalogEvent {
  pub fn scope(&self) -> &DeviceScope {
    match self {
      CatalogEvent::Upserted { scope, .. } | CatalogEvent::Removed { scope, .. } => scope,
    }
  }
}
