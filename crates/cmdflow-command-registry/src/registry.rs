use crate::descriptor::CommandDescriptor;

/// Lookup of command descriptors by identifier.
///
/// Identifiers come from workflow steps and are not guaranteed to be known,
/// so resolution is always optional.
pub trait CommandRegistry: Send + Sync {
  fn resolve(&self, id: &str) -> Option<&dyn CommandDescriptor>;

  /// All known identifiers, sorted.
  fn ids(&self) -> Vec<&str>;
}

/// Display label for `id`, falling back to the identifier itself.
pub fn label_for<'a>(registry: &'a dyn CommandRegistry, id: &'a str) -> &'a str {
  registry.resolve(id).map(|d| d.label()).unwrap_or(id)
}
