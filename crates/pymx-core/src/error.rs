//! Error types for pymx

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using PymxError
pub type Result<T> = std::result::Result<T, PymxError>;

/// Main error type for pymx operations
#[derive(Debug, Error)]
pub enum PymxError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Malformed or conflicting invocation
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// External tool invocation errors
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Build staleness check errors
    #[error(transparent)]
    Staleness(#[from] StalenessError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Usage errors, reported before any work starts
#[derive(Debug, Error)]
pub enum UsageError {
    /// Mutually exclusive flags were given together
    #[error("Only one of {} can be specified", .flags.join(", "))]
    ConflictingFlags { flags: Vec<String> },

    /// A required argument is missing
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    /// Anything else wrong with the invocation
    #[error("Invalid invocation: {0}")]
    Invalid(String),
}

/// Errors from invoking external tools (mx, git, compilers, launchers)
#[derive(Debug, Error)]
pub enum ToolError {
    /// The process could not be started
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited with a non-zero status
    #[error("Command '{command}' exited with {}", exit_detail(.code, .stderr))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The captured output did not contain what was expected
    #[error("Output of '{command}' did not match: expected {expected:?}")]
    OutputMismatch { command: String, expected: String },

    /// The captured output could not be interpreted
    #[error("Unexpected output from '{command}': {message}")]
    UnexpectedOutput { command: String, message: String },
}

/// Errors from walking source/output trees during a staleness check
#[derive(Debug, Error)]
pub enum StalenessError {
    /// A directory could not be walked
    #[error("Cannot walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file's metadata could not be read
    #[error("Cannot read modification time of {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn exit_detail(code: &Option<i32>, stderr: &str) -> String {
    let status = match code {
        Some(code) => format!("code {code}"),
        None => "a signal".to_string(),
    };
    let stderr = stderr.trim_end();
    if stderr.is_empty() {
        status
    } else {
        format!("{status}: {stderr}")
    }
}

impl PymxError {
    /// Create a new "other" error with a message
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Self::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicting_flags_message() {
        let err = UsageError::ConflictingFlags {
            flags: vec!["--full".to_string(), "--graalvm".to_string()],
        };
        assert_eq!(err.to_string(), "Only one of --full, --graalvm can be specified");
    }

    #[test]
    fn test_non_zero_exit_message() {
        let err = ToolError::NonZeroExit {
            command: "mx build".to_string(),
            code: Some(1),
            stderr: "boom\n".to_string(),
        };
        assert_eq!(err.to_string(), "Command 'mx build' exited with code 1: boom");

        let signalled = ToolError::NonZeroExit {
            command: "mx build".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert_eq!(signalled.to_string(), "Command 'mx build' exited with a signal");
    }

    #[test]
    fn test_transparent_conversion() {
        let err: PymxError = UsageError::MissingArgument("--msg".to_string()).into();
        assert!(matches!(err, PymxError::Usage(_)));
        assert_eq!(err.to_string(), "Missing required argument: --msg");
    }
}
