//! pymx Core - Core library for the pymx suite orchestrator
//!
//! This crate provides error handling, configuration, scoped environment
//! overrides and the interface to external tools (`mx`, `git`, launchers).

pub mod config;
pub mod env;
pub mod error;
pub mod mx;
pub mod tool;
pub mod vc;

pub use config::Config;
pub use env::{with_env, EnvChange, EnvOverrides};
pub use error::{ConfigError, PymxError, Result, StalenessError, ToolError, UsageError};
pub use mx::Mx;
pub use tool::{OutputMode, ProcessRunner, RecordingRunner, ToolInvocation, ToolOutput, ToolRunner};
pub use vc::Git;
