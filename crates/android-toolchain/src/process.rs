//! External tool execution
//!
//! Every step of a run shells out to some tool and stops at the first
//! non-zero exit. These helpers spawn, log and check those invocations.

use std::io::ErrorKind;
use std::process::Stdio;

use droid_e2e_core::{E2eError, ToolFailure};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Errors from running an external tool
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Failed(#[from] ToolFailure),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProcessError> for E2eError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Failed(failure) => E2eError::Tool(failure),
            ProcessError::Io(e) => E2eError::Io(e),
            spawn @ ProcessError::Spawn { .. } => {
                E2eError::Io(std::io::Error::new(ErrorKind::Other, spawn.to_string()))
            }
        }
    }
}

/// Render a command line for logging
pub fn describe(cmd: &Command) -> String {
    let std_cmd = cmd.as_std();
    std::iter::once(std_cmd.get_program())
        .chain(std_cmd.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

fn spawn_error(tool: &str) -> impl FnOnce(std::io::Error) -> ProcessError + '_ {
    move |source| ProcessError::Spawn {
        tool: tool.to_string(),
        source,
    }
}

/// Run a command with inherited stdio and fail on a non-zero exit
pub async fn run(tool: &str, cmd: &mut Command) -> Result<(), ProcessError> {
    debug!("exec: {}", describe(cmd));
    let status = cmd.status().await.map_err(spawn_error(tool))?;
    ToolFailure::check(tool, status)?;
    Ok(())
}

/// Run a command capturing stdout and stderr; stderr is only logged
pub async fn run_captured(tool: &str, cmd: &mut Command) -> Result<String, ProcessError> {
    debug!("exec: {}", describe(cmd));
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(spawn_error(tool))?;

    if !output.status.success() {
        debug!("{} stderr: {}", tool, String::from_utf8_lossy(&output.stderr).trim());
    }
    ToolFailure::check(tool, output.status)?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run an interactive tool, feeding `answer` to its stdin up to `repeat` times.
///
/// Stops writing as soon as the tool closes its input.
pub async fn run_answering(
    tool: &str,
    cmd: &mut Command,
    answer: &[u8],
    repeat: usize,
) -> Result<(), ProcessError> {
    debug!("exec: {} (answering {:?})", describe(cmd), String::from_utf8_lossy(answer).trim());

    let mut child = cmd.stdin(Stdio::piped()).spawn().map_err(spawn_error(tool))?;

    if let Some(mut stdin) = child.stdin.take() {
        for _ in 0..repeat {
            match stdin.write_all(answer).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::BrokenPipe => break,
                Err(e) => return Err(e.into()),
            }
        }
        // Dropping stdin sends EOF
    }

    let status = child.wait().await?;
    ToolFailure::check(tool, status)?;
    Ok(())
}
