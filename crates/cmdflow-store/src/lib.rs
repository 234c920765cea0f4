//! cmdflow Store
//!
//! Storage for named workflow templates. Templates are kept in canonical
//! JSON form and keyed by device scope and workflow id.
//!
//! The [`TemplateStore`] trait defines:
//! - Saving (upsert), loading and deleting a template
//! - Listing the templates of a scope
//! - Subscribing to catalog changes made through the store

mod memory;
mod sqlite;
mod types;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{CatalogEvent, DeviceScope, TemplateRecord, TemplateSummary};

use async_trait::async_trait;
use tokio::sync::broadcast;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested template was not found.
  #[error("template not found: {scope}/{workflow_id}")]
  NotFound {
    scope: DeviceScope,
    workflow_id: String,
  },

  /// A database error occurred.
  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  /// A stored document could not be encoded or decoded.
  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// Storage trait for workflow templates.
#[async_trait]
pub trait TemplateStore: Send + Sync {
  /// Insert or replace the template `record.workflow_id()` in `record.scope`.
  async fn save(&self, record: &TemplateRecord) -> Result<(), Error>;

  /// Get a template by id.
  async fn load(&self, scope: &DeviceScope, workflow_id: &str) -> Result<TemplateRecord, Error>;

  /// Delete a template. Deleting a missing template is `NotFound`.
  async fn delete(&self, scope: &DeviceScope, workflow_id: &str) -> Result<(), Error>;

  /// Summaries of all templates in `scope`, ordered by id.
  async fn list(&self, scope: &DeviceScope) -> Result<Vec<TemplateSummary>, Error>;

  /// Receive catalog changes made through this store.
  fn subscribe(&self) -> broadcast::Receiver<CatalogEvent>;
}

const EVENT_BUFFER: usize = 64;
