use std::collections::BTreeMap;
use std::path::Path;

use minijinja::Environment;
use tokio::fs;
use tracing::info;

use crate::descriptor::{CatalogCommand, CommandDescriptor};
use crate::error::RegistryError;
use crate::registry::CommandRegistry;

/// In-memory command registry, usually loaded from a JSON file:
///
/// ```json
/// {
///   "UPLOAD": { "label": "Upload file", "format": "path", "template": "upload {{ content }}" },
///   "REBOOT": { "label": "Reboot", "format": "" }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CommandCatalog {
  commands: BTreeMap<String, CatalogCommand>,
}

impl CommandCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Parse a catalog, rejecting entries whose template does not compile.
  pub fn from_json(json: &str) -> Result<Self, RegistryError> {
    let commands: BTreeMap<String, CatalogCommand> = serde_json::from_str(json)?;

    let env = Environment::new();
    for (id, command) in &commands {
      if let Some(template) = &command.template {
        env
          .template_from_str(template)
          .map_err(|e| RegistryError::InvalidTemplate {
            id: id.clone(),
            message: e.to_string(),
          })?;
      }
    }

    Ok(Self { commands })
  }

  /// Read a catalog file.
  pub async fn load(path: &Path) -> Result<Self, RegistryError> {
    let content = fs::read_to_string(path).await?;
    let catalog = Self::from_json(&content)?;
    info!(path = %path.display(), commands = catalog.len(), "loaded command catalog");
    Ok(catalog)
  }

  pub fn insert(&mut self, id: impl Into<String>, command: CatalogCommand) {
    self.commands.insert(id.into(), command);
  }

  pub fn len(&self) -> usize {
    self.commands.len()
  }

  pub fn is_empty(&self) -> bool {
    self.commands.is_empty()
  }
}

impl CommandRegistry for CommandCatalog {
  fn resolve(&self, id: &str) -> Option<&dyn CommandDescriptor> {
    self
      .commands
      .get(id)
      .map(|c| c as &dyn CommandDescriptor)
  }

  fn ids(&self) -> Vec<&str> {
    self.commands.keys().map(String::as_str).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::registry::label_for;

  const CATALOG: &str = r#"{
    "UPLOAD": { "label": "Upload file", "format": "path", "template": "upload {{ content }}" },
    "REBOOT": { "label": "Reboot" }
  }"#;

  #[test]
  fn test_resolve_known_and_unknown() {
    let catalog = CommandCatalog::from_json(CATALOG).unwrap();

    assert_eq!(catalog.ids(), vec!["REBOOT", "UPLOAD"]);
    let upload = catalog.resolve("UPLOAD").unwrap();
    assert_eq!(upload.label(), "Upload file");
    assert_eq!(upload.format(), "path");
    assert_eq!(catalog.resolve("REBOOT").unwrap().format(), "");
    assert!(catalog.resolve("WIPE").is_none());

    assert_eq!(label_for(&catalog, "WIPE"), "WIPE");
    assert_eq!(label_for(&catalog, "REBOOT"), "Reboot");
  }

  #[test]
  fn test_bad_template_rejected() {
    let err = CommandCatalog::from_json(r#"{"X": {"label": "x", "template": "{{ unclosed"}}"#)
      .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidTemplate { ref id, .. } if id == "X"));
  }

  #[tokio::test]
  async fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("commands.json");
    tokio::fs::write(&path, CATALOG).await.unwrap();

    let catalog = CommandCatalog::load(&path).await.unwrap();
    assert_eq!(catalog.len(), 2);

    let missing = CommandCatalog::load(&dir.path().join("nope.json")).await;
    assert!(matches!(missing, Err(RegistryError::Io(_))));
  }
}
