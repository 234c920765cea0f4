use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cmdflow_workflow::CanonicalWorkflow;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::types::{CatalogEvent, DeviceScope, TemplateRecord, TemplateSummary};
use crate::{EVENT_BUFFER, Error, TemplateStore};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS workflow_templates (
  scope TEXT NOT NULL,
  workflow_id TEXT NOT NULL,
  document TEXT NOT NULL,
  saved_at TEXT NOT NULL,
  PRIMARY KEY (scope, workflow_id)
)
"#;

#[derive(Debug, FromRow)]
struct TemplateRow {
  scope: String,
  document: String,
  saved_at: DateTime<Utc>,
}

impl TryFrom<TemplateRow> for TemplateRecord {
  type Error = Error;

  fn try_from(row: TemplateRow) -> Result<Self, Error> {
    let document: CanonicalWorkflow = serde_json::from_str(&row.document)?;
    Ok(TemplateRecord {
      scope: DeviceScope::new(row.scope),
      document,
      saved_at: row.saved_at,
    })
  }
}

/// Template store backed by SQLite.
pub struct SqliteStore {
  pool: SqlitePool,
  events: broadcast::Sender<CatalogEvent>,
}

impl SqliteStore {
  /// Open (creating if needed) the database at `url` and ensure the schema.
  ///
  /// `url` is a sqlx SQLite URL such as `sqlite://templates.db` or
  /// `sqlite::memory:`.
  pub async fn connect(url: &str) -> Result<Self, Error> {
    info!(url = %url, "opening template database");

    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    // An in-memory database exists per connection
    let max_connections = if url.contains(":memory:") { 1 } else { 4 };
    let pool = SqlitePoolOptions::new()
      .max_connections(max_connections)
      .connect_with(options)
      .await?;

    sqlx::query(SCHEMA).execute(&pool).await?;

    let (events, _) = broadcast::channel(EVENT_BUFFER);
    Ok(Self { pool, events })
  }

  pub async fn in_memory() -> Result<Self, Error> {
    Self::connect("sqlite::memory:").await
  }
}

#[async_trait]
impl TemplateStore for SqliteStore {
  async fn save(&self, record: &TemplateRecord) -> Result<(), Error> {
    debug!(scope = %record.scope, workflow_id = %record.workflow_id(), "saving template");
    let document = serde_json::to_string(&record.document)?;

    sqlx::query(
      r#"
      INSERT INTO workflow_templates (scope, workflow_id, document, saved_at)
      VALUES (?1, ?2, ?3, ?4)
      ON CONFLICT(scope, workflow_id) DO UPDATE SET
        document = excluded.document,
        saved_at = excluded.saved_at
      "#,
    )
    .bind(record.scope.as_str())
    .bind(record.workflow_id())
    .bind(document)
    .bind(record.saved_at)
    .execute(&self.pool)
    .await?;

    let _ = self.events.send(CatalogEvent::Upserted {
      scope: record.scope.clone(),
      summary: record.summary(),
    });
    Ok(())
  }

  async fn load(&self, scope: &DeviceScope, workflow_id: &str) -> Result<TemplateRecord, Error> {
    let row: Option<TemplateRow> = sqlx::query_as(
      r#"
      SELECT scope, document, saved_at
      FROM workflow_templates
      WHERE scope = ?1 AND workflow_id = ?2
      "#,
    )
    .bind(scope.as_str())
    .bind(workflow_id)
    .fetch_optional(&self.pool)
    .await?;

    let row = row.ok_or_else(|| Error::NotFound {
      scope: scope.clone(),
      workflow_id: workflow_id.to_string(),
    })?;
    TemplateRecord::try_from(row)
  }

  async fn delete(&self, scope: &DeviceScope, workflow_id: &str) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM workflow_templates WHERE scope = ?1 AND workflow_id = ?2")
      .bind(scope.as_str())
      .bind(workflow_id)
      .execute(&self.pool)
      .await?;

    if result.rows_affected() == 0 {
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
    let rows: Vec<TemplateRow> = sqlx::query_as(
      r#"
      SELECT scope, document, saved_at
      FROM workflow_templates
      WHERE scope = ?1
      ORDER BY workflow_id
      "#,
    )
    .bind(scope.as_str())
    .fetch_all(&self.pool)
    .await?;

    rows
      .into_iter()
      .map(|row| TemplateRecord::try_from(row).map(|record| record.summary()))
      .collect()
  }

  fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
    self.events.subscribe()
  }
}
