//! pymx Gate - Gate task execution
//!
//! This crate provides the tag vocabulary, the gate task registry with its
//! log-marker reporting, and the staleness check deciding whether a native
//! build has to run.

pub mod error;
pub mod registry;
pub mod reporter;
pub mod staleness;
pub mod tags;
pub mod task;

pub use error::GateError;
pub use registry::GateRegistry;
pub use reporter::{
    CollectingReporter, GateEvent, GateReporter, GateReporterRegistry, LogMarkerReporter,
    TracingReporter,
};
pub use staleness::{is_stale, FileStamp, Staleness};
pub use tags::{GateTag, TagSelection};
pub use task::{GateAction, GateSummary, GateTask, TaskOutcome, TaskReport};
