//! cmdflow Command Registry
//!
//! Workflow steps reference commands by an opaque identifier. This crate
//! resolves those identifiers to display metadata through an injected
//! [`CommandRegistry`]. Apart from [`DryRunExecutor`], which only logs
//! rendered commands, nothing here affects how a step runs.

mod catalog;
mod describe;
mod descriptor;
mod dry_run;
mod error;
mod registry;

pub use catalog::CommandCatalog;
pub use describe::{StepSummary, describe};
pub use descriptor::{CatalogCommand, CommandDescriptor};
pub use dry_run::DryRunExecutor;
pub use error::RegistryError;
pub use registry::{CommandRegistry, label_for};
