//! Gate errors

use pymx_core::PymxError;
use thiserror::Error;

/// Errors ending a gate run
#[derive(Debug, Error)]
pub enum GateError {
    /// A selected task's action failed; later tasks did not run
    #[error("Gate task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: PymxError,
    },
}

impl GateError {
    /// Name of the task that stopped the run
    pub fn task(&self) -> &str {
        match self {
            Self::TaskFailed { task, .. } => task,
        }
    }
}
