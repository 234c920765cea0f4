//! cmdflow Dispatch
//!
//! The contract an executor follows when stepping through a workflow, plus
//! an in-process runner that honors it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Handoff                             │
//! │  - execute(workflow_json) → HandoffReceipt                  │
//! │  - ChannelHandoff: queue for an external executor           │
//! │  - RunnerHandoff: decode and run in-process                 │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowRunner                         │
//! │  - delay, dispatch, route; cancellable                      │
//! │  - emits ExecutionEvents                                    │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Dispatcher                            │
//! │  - start() → At(1)                                          │
//! │  - next(step, outcome) → At(n) | Terminated                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod dispatcher;
mod error;
mod events;
mod executor;
mod handoff;
mod runner;

pub use dispatcher::{DispatchState, Dispatcher, Outcome, Trace, trace};
pub use error::DispatchError;
pub use events::{ChannelNotifier, ExecutionEvent, ExecutionNotifier, NoopNotifier};
pub use executor::{StepExecutor, StepFailure, StepInvocation};
pub use handoff::{ChannelHandoff, Handoff, HandoffReceipt, QueuedWorkflow, RunnerHandoff};
pub use runner::{DEFAULT_HISTORY, RunReport, RunnerConfig, Visit, WorkflowRunner};
