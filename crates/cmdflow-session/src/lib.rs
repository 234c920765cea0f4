//! cmdflow Session
//!
//! An [`EditingSession`] owns a single workflow draft for one device scope.
//! Edits go through the sequencer, and save and execute validate the draft
//! before anything leaves the process, so a store or executor failure never
//! leaves an invalid workflow looking saved. Catalog updates pushed by the
//! store only refresh the [`TemplateCatalog`].

mod catalog;
mod error;
mod session;

pub use catalog::TemplateCatalog;
pub use error::SessionError;
pub use session::EditingSession;
