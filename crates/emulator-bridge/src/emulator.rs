//! Emulator Launcher
//!
//! Launches the emulator in the background with its output captured in a
//! log file, keeps the process handle, and polls until Android has booted.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use droid_e2e_android_toolchain::process::describe;
use droid_e2e_android_toolchain::{locate_tool, SdkTool};
use droid_e2e_core::{E2eError, EmulatorSettings, ToolFailure};
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::adb::AdbClient;

/// Emulator errors
#[derive(Debug, thiserror::Error)]
pub enum EmulatorError {
    #[error("cannot open emulator log {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to start emulator: {0}")]
    StartFailed(#[source] std::io::Error),
    #[error("emulator exited before boot completed ({0})")]
    Exited(ToolFailure),
    #[error("{serial} did not finish booting within {timeout:?}")]
    BootTimeout { serial: String, timeout: Duration },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<EmulatorError> for E2eError {
    fn from(err: EmulatorError) -> Self {
        match err {
            EmulatorError::Exited(failure) => E2eError::Tool(failure),
            timeout @ EmulatorError::BootTimeout { .. } => E2eError::Timeout(timeout.to_string()),
            EmulatorError::Io(e) => E2eError::Io(e),
            other => E2eError::Emulator(other.to_string()),
        }
    }
}

/// Emulator launch options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorOptions {
    /// Enable/disable audio
    pub no_audio: bool,
    /// Enable/disable window
    pub no_window: bool,
    /// Enable/disable boot animation
    pub no_boot_anim: bool,
    /// System partition size in MB
    pub partition_size_mb: u32,
    /// Port for console
    pub port: u16,
}

impl EmulatorOptions {
    /// Options for headless/CI environments
    pub fn headless(port: u16, partition_size_mb: u32) -> Self {
        Self {
            no_audio: true,
            no_window: true,
            no_boot_anim: true,
            partition_size_mb,
            port,
        }
    }

    /// Convert to command line arguments
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-port".to_string(), self.port.to_string()];

        if self.no_window {
            args.push("-no-window".to_string());
        }

        if self.no_audio {
            args.push("-no-audio".to_string());
        }

        if self.no_boot_anim {
            args.push("-no-boot-anim".to_string());
        }

        args.push("-partition-size".to_string());
        args.push(self.partition_size_mb.to_string());

        args
    }
}

/// Exponential backoff between readiness polls
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { next: initial, max }
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = (current * 2).min(self.max);
        Some(current)
    }
}

/// How long and how often to poll for boot completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub timeout: Duration,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl From<&EmulatorSettings> for ReadinessPolicy {
    fn from(settings: &EmulatorSettings) -> Self {
        let (initial_interval, max_interval) = settings.poll_bounds();
        Self {
            timeout: settings.boot_timeout(),
            initial_interval,
            max_interval,
        }
    }
}

/// Running emulator instance
#[derive(Debug)]
pub struct EmulatorInstance {
    pub avd_name: String,
    pub port: u16,
    pub log_file: PathBuf,
    process: Child,
}

impl EmulatorInstance {
    /// Get the serial for ADB
    pub fn serial(&self) -> String {
        crate::emulator_serial(self.port)
    }

    /// OS process id, `None` once the process has been reaped
    pub fn pid(&self) -> Option<u32> {
        self.process.id()
    }

    /// Check if the emulator process is still running
    pub fn is_running(&mut self) -> bool {
        matches!(self.process.try_wait(), Ok(None))
    }

    /// Kill the emulator
    pub async fn kill(&mut self) -> Result<(), EmulatorError> {
        self.process.kill().await?;
        info!("Killed emulator: {}", self.avd_name);
        Ok(())
    }

    /// Record the pid so a later process can stop the emulator
    pub async fn write_pid_file(&self, path: &Path) -> Result<(), EmulatorError> {
        if let Some(pid) = self.pid() {
            tokio::fs::write(path, format!("{}\n", pid)).await?;
            debug!("Wrote emulator pid {} to {:?}", pid, path);
        }
        Ok(())
    }

    /// Everything the emulator has written so far
    pub async fn read_log(&self) -> Result<Vec<u8>, EmulatorError> {
        Ok(tokio::fs::read(&self.log_file).await?)
    }

    /// Poll until Android reports boot completion.
    ///
    /// Fails as soon as the emulator process exits, or when the policy's
    /// timeout elapses.
    pub async fn wait_until_ready(
        &mut self,
        adb: &AdbClient,
        policy: &ReadinessPolicy,
    ) -> Result<(), EmulatorError> {
        // A timeout too large to represent means no deadline
        let deadline = Instant::now().checked_add(policy.timeout);
        let mut backoff = Backoff::new(policy.initial_interval, policy.max_interval);

        info!("Waiting for {} to boot (timeout {:?})", adb.serial(), policy.timeout);

        loop {
            if let Some(status) = self.process.try_wait()? {
                warn!("Emulator exited with {}", status);
                return Err(EmulatorError::Exited(ToolFailure::from_status(
                    SdkTool::Emulator.name(),
                    status,
                )));
            }

            if adb.is_boot_completed().await {
                info!("Emulator booted successfully");
                return Ok(());
            }

            let mut delay = backoff.next().unwrap_or(policy.max_interval);
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return Err(EmulatorError::BootTimeout {
                        serial: adb.serial().to_string(),
                        timeout: policy.timeout,
                    });
                }
                delay = delay.min(deadline - now);
            }
            debug!("Boot not complete, next poll in {:?}", delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Stop tracking the process; the emulator keeps running after we exit
    pub fn detach(self) -> Option<u32> {
        self.pid()
    }
}

/// Emulator launcher
pub struct EmulatorLauncher {
    emulator_path: PathBuf,
}

impl EmulatorLauncher {
    /// Create a new emulator launcher
    pub fn new(sdk_root: &Path) -> Self {
        Self {
            emulator_path: locate_tool(sdk_root, SdkTool::Emulator),
        }
    }

    /// Launch an emulator in the background, sending stdout and stderr to
    /// `log_file` (truncated first).
    pub async fn launch(
        &self,
        avd_name: &str,
        options: &EmulatorOptions,
        log_file: &Path,
    ) -> Result<EmulatorInstance, EmulatorError> {
        let port = options.port;

        let log = tokio::fs::File::create(log_file)
            .await
            .map_err(|source| EmulatorError::LogFile {
                path: log_file.to_path_buf(),
                source,
            })?
            .into_std()
            .await;
        let log_err = log.try_clone()?;

        let mut cmd = Command::new(&self.emulator_path);
        cmd.arg("-avd").arg(avd_name).args(options.to_args());
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err));

        info!("Launching emulator {} on port {}", avd_name, port);
        debug!("exec: {}", describe(&cmd));

        let process = cmd.spawn().map_err(EmulatorError::StartFailed)?;
        info!("Emulator pid: {:?}", process.id());

        Ok(EmulatorInstance {
            avd_name: avd_name.to_string(),
            port,
            log_file: log_file.to_path_buf(),
            process,
        })
    }
}
