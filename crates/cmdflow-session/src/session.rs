use std::sync::Arc;

use cmdflow_dispatch::{Handoff, HandoffReceipt};
use cmdflow_store::{CatalogEvent, DeviceScope, TemplateRecord, TemplateStore, TemplateSummary};
use cmdflow_workflow::{
  CanonicalWorkflow, Operation, ValidationError, ValidationPolicy, WorkflowDocument, to_json,
};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::catalog::TemplateCatalog;
use crate::error::SessionError;

/// One editor's workflow draft and its view of saved templates.
///
/// The session is the only owner of the draft. Store operations never
/// modify it except [`EditingSession::load`], which replaces it.
pub struct EditingSession {
  scope: DeviceScope,
  store: Arc<dyn TemplateStore>,
  policy: ValidationPolicy,
  draft: WorkflowDocument,
  catalog: TemplateCatalog,
}

impl EditingSession {
  /// Start a session with an empty draft.
  pub fn new(scope: DeviceScope, store: Arc<dyn TemplateStore>, policy: ValidationPolicy) -> Self {
    Self {
      catalog: TemplateCatalog::new(scope.clone()),
      scope,
      store,
      policy,
      draft: WorkflowDocument::default(),
    }
  }

  pub fn scope(&self) -> &DeviceScope {
    &self.scope
  }

  pub fn draft(&self) -> &WorkflowDocument {
    &self.draft
  }

  pub fn set_id(&mut self, id: impl Into<String>) {
    self.draft.id = id.into();
  }

  /// Apply a sequencer operation to the draft.
  pub fn apply(&mut self, op: Operation) -> Result<&WorkflowDocument, SessionError> {
    self.draft = self.draft.apply(op)?;
    Ok(&self.draft)
  }

  /// Throw the draft away and start over.
  pub fn discard(&mut self) {
    self.draft = WorkflowDocument::default();
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    self.draft.validate(self.policy)
  }

  /// Validate, then upsert the draft under its id.
  pub async fn save(&mut self) -> Result<TemplateSummary, SessionError> {
    self.validate()?;

    let record = TemplateRecord::new(
      self.scope.clone(),
      CanonicalWorkflow::from_document(&self.draft),
    );
    if let Err(e) = self.store.save(&record).await {
      warn!(scope = %self.scope, workflow_id = %self.draft.id, error = %e, "save failed");
      return Err(e.into());
    }

    info!(scope = %self.scope, workflow_id = %self.draft.id, steps = self.draft.len(), "workflow saved");
    let summary = record.summary();
    self.catalog.apply(&CatalogEvent::Upserted {
      scope: self.scope.clone(),
      summary: summary.clone(),
    });
    Ok(summary)
  }

  /// Replace the draft with a stored template. Unsaved edits are lost.
  pub async fn load(&mut self, workflow_id: &str) -> Result<&WorkflowDocument, SessionError> {
    let record = self.store.load(&self.scope, workflow_id).await?;
    self.draft = record.document.into_document();
    info!(scope = %self.scope, workflow_id = %workflow_id, steps = self.draft.len(), "workflow loaded");
    Ok(&self.draft)
  }

  /// Delete a stored template. The draft is kept even if it came from it.
  pub async fn delete(&mut self, workflow_id: &str) -> Result<(), SessionError> {
    self.store.delete(&self.scope, workflow_id).await?;
    self.catalog.apply(&CatalogEvent::Removed {
      scope: self.scope.clone(),
      workflow_id: workflow_id.to_string(),
    });
    info!(scope = %self.scope, workflow_id = %workflow_id, "workflow deleted");
    Ok(())
  }

  /// Validate, serialize and pass the draft to `handoff`.
  pub async fn execute(&self, handoff: &dyn Handoff) -> Result<HandoffReceipt, SessionError> {
    self.validate()?;
    let receipt = handoff.execute(to_json(&self.draft)).await?;
    info!(workflow_id = %receipt.workflow_id, execution_id = %receipt.execution_id, "workflow handed off");
    Ok(receipt)
  }

  pub fn catalog(&self) -> &TemplateCatalog {
    &self.catalog
  }

  /// Reload the catalog from the store.
  pub async fn refresh_catalog(&mut self) -> Result<&TemplateCatalog, SessionError> {
    let summaries = self.store.list(&self.scope).await?;
    self.catalog.replace(summaries);
    Ok(&self.catalog)
  }

  /// Apply a pushed catalog change. Only the catalog view changes.
  pub fn apply_catalog_event(&mut self, event: &CatalogEvent) -> bool {
    self.catalog.apply(event)
  }

  /// Subscribe to catalog changes; feed them to
  /// [`EditingSession::apply_catalog_event`].
  pub fn subscribe_catalog(&self) -> broadcast::Receiver<CatalogEvent> {
    self.store.subscribe()
  }
}
