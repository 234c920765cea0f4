//! cmdflow Workflow
//!
//! This crate provides the workflow document model for cmdflow: an ordered
//! list of remote-command steps, each routing to the next step, a stop, or a
//! jump on success and on failure.
//!
//! - [`StepSequence`] applies editing operations as pure reducers and keeps
//!   step numbers equal to positions
//! - [`validate`] gates save and execute, reporting the first problem
//! - [`canonical`] holds the JSON projection used for persistence and
//!   executor hand-off

pub mod canonical;
mod error;
mod sequence;
mod step;
mod validator;
mod workflow;

pub use canonical::{CanonicalStep, CanonicalWorkflow, from_json, to_json, to_json_pretty};
pub use error::{SequenceError, ValidationError, WorkflowError};
pub use sequence::{Direction, Operation, StepSequence};
pub use step::{Directive, Routing, Step, StepDraft, StepPatch};
pub use validator::{ValidationPolicy, validate};
pub use workflow::WorkflowDocument;
