//! Error types for droid-e2e
//!
//! Centralized error handling using thiserror.

use std::process::ExitStatus;

use thiserror::Error;

/// An external tool that ran to completion but did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{tool} {}", exit_description(.code))]
pub struct ToolFailure {
    /// Name of the tool as it was invoked (e.g. `adb`, `sdkmanager`)
    pub tool: String,
    /// Exit code, `None` when the process was terminated by a signal
    pub code: Option<i32>,
}

impl ToolFailure {
    /// Build a failure record from a finished process status
    pub fn from_status(tool: impl Into<String>, status: ExitStatus) -> Self {
        Self {
            tool: tool.into(),
            code: status.code(),
        }
    }

    /// `Ok(())` when the status is a success, otherwise the failure record
    pub fn check(tool: &str, status: ExitStatus) -> std::result::Result<(), ToolFailure> {
        if status.success() {
            Ok(())
        } else {
            Err(Self::from_status(tool, status))
        }
    }
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

/// Main error type for droid-e2e
#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("{0}")]
    SdkRoot(String),

    #[error("{0}")]
    Tool(#[from] ToolFailure),

    #[error("Emulator error: {0}")]
    Emulator(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for droid-e2e operations
pub type Result<T> = std::result::Result<T, E2eError>;

impl E2eError {
    /// Process exit status this error should terminate the run with.
    ///
    /// Tool failures propagate the tool's own code; everything else is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            E2eError::Tool(failure) => match failure.code {
                Some(code) if code != 0 => code,
                _ => 1,
            },
            _ => 1,
        }
    }
}
