use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use crate::types::{CatalogEvent, DeviceScope, TemplateRecord, TemplateSummary};
use crate::{EVENT_BUFFER, Error, TemplateStore};

/// Template store held in process memory.
pub struct MemoryStore {
  templates: RwLock<BTreeMap<(DeviceScope, String), TemplateRecord>>,
  events: broadcast::Sender<CatalogEvent>,
}

impl MemoryStore {
  pub fn new() -> Self {
    let (events, _) = broadcast::channel(EVENT_BUFFER);
    Self {
      templates: RwLock::new(BTreeMap::new()),
      events,
    }
  }
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl TemplateStore for MemoryStore {
  async fn save(&self, record: &TemplateRecord) -> Result<(), Error> {
    debug!(scope = %record.scope, workflow_id = %record.workflow_id(), "saving template");
    let key = (record.scope.clone(), record.workflow_id().to_string());
    self.templates.write().await.insert(key, record.clone());

    // No subscribers is fine
    let _ = self.events.send(CatalogEvent::Upserted {
      scope: record.scope.clone(),
      summary: record.summary(),
    });
    Ok(())
  }

  async fn load(&self, scope: &DeviceScope, workflow_id: &str) -> Result<TemplateRecord, Error> {
    self
      .templates
      .read()
      .await
      .get(&(scope.clone(), workflow_id.to_string()))
      .cloned()
      .ok_or_else(|| Error::NotFound {
        scope: scope.clone(),
        workflow_id: workflow_id.to_string(),
      })
  }

  async fn delete(&self, scope: &DeviceScope, workflow_id: &str) -> Result<(), Error> {
    let removed = self
      .templates
      .write()
      .await
      .remove(&(scope.clone(), workflow_id.to_string()));

    if removed.is_none() {
      return Err(Error::NotFound {
        scope: scope.clone(),
        workflow_id: workflow_id.to_string(),
      });
    }

    let _ = self.events.send(CatalogEvent::Removed {
      scope: scope.clone(),
      workflow_id: workflow_id.to_string(),
    });
    Ok(())
  }

  async fn list(&self, scope: &DeviceScope) -> Result<Vec<TemplateSummary>, Error> {
    Ok(
      self
        .templates
        .read()
        .await
        .values()
        .filter(|r| &r.scope == scope)
        .map(TemplateRecord::summary)
        .collect(),
    )
  }

  fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
    self.events.subscribe()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use cmdflow_workflow::{CanonicalWorkflow, StepDraft, StepSequence, WorkflowDocument};

  fn record(scope: &str, id: &str, steps: usize) -> TemplateRecord {
    let drafts = (0..steps).map(|i| StepDraft::new(format!("CMD{i}"), ""));
    let doc = WorkflowDocument::with_steps(id, StepSequence::from_drafts(drafts));
    TemplateRecord::new(DeviceScope::new(scope), CanonicalWorkflow::from_document(&doc))
  }

  #[tokio::test]
  async fn test_save_load_roundtrip() {
    let store = MemoryStore::new();
    let rec = record("device-1", "boot", 2);

    store.save(&rec).await.unwrap();
    let loaded = store.load(&rec.scope, "boot").await.unwrap();

    assert_eq!(loaded, rec);
  }

  #[tokio::test]
  async fn test_save_upserts() {
    let store = MemoryStore::new();
    let scope = DeviceScope::new("device-1");

    store.save(&record("device-1", "boot", 1)).await.unwrap();
    store.save(&record("device-1", "boot", 3)).await.unwrap();

    let list = store.list(&scope).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].step_count, 3);
  }

  #[tokio::test]
  async fn test_scopes_are_separate() {
    let store = MemoryStore::new();
    store.save(&record("device-1", "boot", 1)).await.unwrap();
    store.save(&record("device-2", "boot", 1)).await.unwrap();
    store.save(&record("device-2", "alpha", 1)).await.unwrap();

    let ids: Vec<String> = store
      .list(&DeviceScope::new("device-2"))
      .await
      .unwrap()
      .into_iter()
      .map(|s| s.workflow_id)
      .collect();
    assert_eq!(ids, vec!["alpha", "boot"]);

    store.delete(&DeviceScope::new("device-1"), "boot").await.unwrap();
    assert!(store.load(&DeviceScope::new("device-2"), "boot").await.is_ok());
  }

  #[tokio::test]
  async fn test_missing_template() {
    let store = MemoryStore::new();
    let scope = DeviceScope::new("device-1");

    assert!(matches!(store.load(&scope, "nope").await, Err(Error::NotFound { .. })));
    assert!(matches!(store.delete(&scope, "nope").await, Err(Error::NotFound { .. })));
  }

  #[tokio::test]
  async fn test_events_published() {
    let store = MemoryStore::new();
    let mut events = store.subscribe();
    let rec = record("device-1", "boot", 2);

    store.save(&rec).await.unwrap();
    store.delete(&rec.scope, "boot").await.unwrap();

    assert_eq!(
      events.recv().await.unwrap(),
      CatalogEvent::Upserted {
        scope: rec.scope.clone(),
        summary: rec.summary(),
      }
    );
    assert_eq!(
      events.recv().await.unwrap(),
      CatalogEvent::Removed {
        scope: rec.scope.clone(),
        workflow_id: "boot".to_string(),
      }
    );
  }
}
