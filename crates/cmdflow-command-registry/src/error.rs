use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid command catalog: {0}")]
  Json(#[from] serde_json::Error),

  #[error("command '{id}' has an invalid content template: {message}")]
  InvalidTemplate { id: String, message: String },
}
