//! Exit codes for the CLI

use pymx_core::{ConfigError, PymxError, UsageError};
use pymx_gate::GateError;

/// Success
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Usage or configuration error
pub const USAGE_ERROR: i32 = 2;

/// A gate task failed
pub const GATE_FAILURE: i32 = 3;

/// A build or external tool failed
pub const TOOL_FAILURE: i32 = 4;

/// The staleness check could not be completed
pub const STALENESS_FAILURE: i32 = 5;

/// Exit code for an error returned by a command
pub fn for_error(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<GateError>().is_some() {
        return GATE_FAILURE;
    }
    if err.downcast_ref::<UsageError>().is_some() || err.downcast_ref::<ConfigError>().is_some() {
        return USAGE_ERROR;
    }
    match err.downcast_ref::<PymxError>() {
        Some(PymxError::Config(_)) | Some(PymxError::Usage(_)) => USAGE_ERROR,
        Some(PymxError::Tool(_)) => TOOL_FAILURE,
        Some(PymxError::Staleness(_)) => STALENESS_FAILURE,
        _ => ERROR,
    }
}
