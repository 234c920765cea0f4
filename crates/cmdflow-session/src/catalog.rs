use std::collections::BTreeMap;

use cmdflow_store::{CatalogEvent, DeviceScope, TemplateSummary};
use tracing::debug;

/// The editor's view of saved templates for one scope.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
  scope: DeviceScope,
  entries: BTreeMap<String, TemplateSummary>,
}

impl TemplateCatalog {
  pub fn new(scope: DeviceScope) -> Self {
    Self {
      scope,
      entries: BTreeMap::new(),
    }
  }

  /// Replace the whole view with a fresh listing.
  pub fn replace(&mut self, summaries: Vec<TemplateSummary>) {
    self.entries = summaries
      .into_iter()
      .map(|s| (s.workflow_id.clone(), s))
      .collect();
  }

  /// Apply a remote change. Returns whether the view changed; events for
  /// other scopes are ignored.
  pub fn apply(&mut self, event: &CatalogEvent) -> bool {
    if event.scope() != &self.scope {
      return false;
    }

    let changed = match event {
      CatalogEvent::Upserted { summary, .. } => {
        let previous = self
          .entries
          .insert(summary.workflow_id.clone(), summary.clone());
        previous.as_ref() != Some(summary)
      }
      CatalogEvent::Removed { workflow_id, .. } => self.entries.remove(workflow_id).is_some(),
    };
    debug!(scope = %self.scope, changed, "applied catalog event");
    changed
  }

  pub fn get(&self, workflow_id: &str) -> Option<&TemplateSummary> {
    self.entries.get(workflow_id)
  }

  /// Entries ordered by workflow id.
  pub fn entries(&self) -> impl Iterator<Item = &TemplateSummary> {
    self.entries.values()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
