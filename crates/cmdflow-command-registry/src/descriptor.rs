use minijinja::{Environment, Value};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Display metadata for a command identifier.
pub trait CommandDescriptor: Send + Sync {
  /// Human readable name shown in place of the identifier.
  fn label(&self) -> &str;

  /// Description of what the content string should contain.
  fn format(&self) -> &str;

  /// Render step content for display. Defaults to the raw content.
  fn format_content(&self, params: &str) -> String {
    params.to_string()
  }
}

/// A command entry of a JSON catalog.
///
/// The optional `template` is rendered with minijinja. The raw step content is
/// available as `content`; when the content is a JSON object its fields are
/// in scope as well.
///
/// ```json
/// { "label": "Send SMS", "format": "{\"to\": ..., \"body\": ...}", "template": "SMS to {{ to }}" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCommand {
  pub label: String,
  #[serde(default)]
  pub format: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub template: Option<String>,
}

impl CatalogCommand {
  pub fn new(label: impl Into<String>, format: impl Into<String>) -> Self {
    Self {
      label: label.into(),
      format: format.into(),
      template: None,
    }
  }

  pub fn with_template(mut self, template: impl Into<String>) -> Self {
    self.template = Some(template.into());
    self
  }
}

impl CommandDescriptor for CatalogCommand {
  fn label(&self) -> &str {
    &self.label
  }

  fn format(&self) -> &str {
    &self.format
  }

  fn format_content(&self, params: &str) -> String {
    let Some(template) = &self.template else {
      return params.to_string();
    };

    let mut context = match serde_json::from_str::<serde_json::Value>(params) {
      Ok(serde_json::Value::Object(fields)) => fields,
      _ => serde_json::Map::new(),
    };
    context.insert(
      "content".to_string(),
      serde_json::Value::String(params.to_string()),
    );

    let env = Environment::new();
    match env.render_str(template, Value::from_serialize(&context)) {
      Ok(rendered) => rendered,
      Err(e) => {
        warn!(label = %self.label, error = %e, "failed to render command template");
        params.to_string()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_without_template_returns_content() {
    let cmd = CatalogCommand::new("Reboot", "none");
    assert_eq!(cmd.format_content("now"), "now");
  }

  #[test]
  fn test_template_sees_json_fields() {
    let cmd = CatalogCommand::new("Send SMS", "{to, body}").with_template("SMS to {{ to }}: {{ body | upper }}");
    assert_eq!(
      cmd.format_content(r#"{"to": "+100", "body": "hi"}"#),
      "SMS to +100: HI"
    );
  }

  #[test]
  fn test_template_sees_raw_content() {
    let cmd = CatalogCommand::new("Upload", "path").with_template("upload {{ content }}");
    assert_eq!(cmd.format_content("f.txt"), "upload f.txt");
  }

  #[test]
  fn test_render_error_falls_back_to_content() {
    let cmd = CatalogCommand::new("Broken", "").with_template("{{ content | nosuchfilter }}");
    assert_eq!(cmd.format_content("raw"), "raw");
  }
}
