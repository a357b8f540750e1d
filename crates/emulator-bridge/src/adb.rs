//! ADB (Android Debug Bridge) Client
//!
//! Runs `adb` against the single emulator a run manages.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use droid_e2e_android_toolchain::process::{self, ProcessError};
use droid_e2e_android_toolchain::{locate_tool, SdkTool};
use droid_e2e_core::E2eError;
use tokio::process::Command;
use tracing::{debug, info};

use crate::device::DeviceState;

/// ADB errors
#[derive(Debug, thiserror::Error)]
pub enum AdbError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("cannot write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<AdbError> for E2eError {
    fn from(err: AdbError) -> Self {
        match err {
            AdbError::Process(e) => e.into(),
            AdbError::Output { source, .. } => E2eError::Io(source),
        }
    }
}

/// ADB Client bound to one device serial
#[derive(Debug, Clone)]
pub struct AdbClient {
    adb_path: PathBuf,
    serial: String,
}

impl AdbClient {
    /// Create a client using the SDK's platform-tools
    pub fn new(sdk_root: &Path, serial: &str) -> Self {
        Self::with_executable(locate_tool(sdk_root, SdkTool::Adb), serial)
    }

    /// Create a client for an explicit adb binary
    pub fn with_executable(adb_path: PathBuf, serial: &str) -> Self {
        Self {
            adb_path,
            serial: serial.to_string(),
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Base command targeting this client's device
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.adb_path);
        cmd.arg("-s").arg(&self.serial);
        cmd
    }

    /// Run a query whose output is parsed; both streams are captured so
    /// polling does not spam the console with "device not found".
    async fn probe(&self, args: &[&str]) -> Result<String, AdbError> {
        let mut cmd = self.command();
        cmd.args(args);
        Ok(process::run_captured(SdkTool::Adb.name(), &mut cmd).await?)
    }

    /// Current device state
    pub async fn get_state(&self) -> Result<DeviceState, AdbError> {
        let output = self.probe(&["get-state"]).await?;
        Ok(DeviceState::from_adb(&output))
    }

    /// Get device property
    pub async fn get_prop(&self, prop: &str) -> Result<String, AdbError> {
        let output = self.probe(&["shell", "getprop", prop]).await?;
        Ok(output.trim().to_string())
    }

    /// Whether the device is attached and Android has finished booting
    pub async fn is_boot_completed(&self) -> bool {
        match self.get_state().await {
            Ok(state) if state.is_usable() => {}
            Ok(state) => {
                debug!("{} is {}", self.serial, state.as_str());
                return false;
            }
            Err(e) => {
                debug!("{} not reachable yet: {}", self.serial, e);
                return false;
            }
        }

        match self.get_prop("sys.boot_completed").await {
            Ok(value) => value == "1",
            Err(_) => false,
        }
    }

    /// Reverse a port (device connects to the same port on the host)
    pub async fn reverse(&self, port: u16) -> Result<(), AdbError> {
        let spec = format!("tcp:{}", port);
        info!("Reversing {} on {}", spec, self.serial);
        let mut cmd = self.command();
        cmd.arg("reverse").arg(&spec).arg(&spec);
        process::run(SdkTool::Adb.name(), &mut cmd).await?;
        Ok(())
    }

    /// Stream `adb bugreport` output into a file (created or truncated)
    pub async fn bugreport_to(&self, output: &Path) -> Result<(), AdbError> {
        let file = tokio::fs::File::create(output)
            .await
            .map_err(|source| AdbError::Output {
                path: output.to_path_buf(),
                source,
            })?
            .into_std()
            .await;

        info!("Collecting bug report into {:?}", output);
        let mut cmd = self.command();
        cmd.arg("bugreport").stdout(Stdio::from(file));
        process::run(SdkTool::Adb.name(), &mut cmd).await?;
        Ok(())
    }

    /// Run a shell command on the device with output passed through
    pub async fn shell(&self, args: &[&str]) -> Result<(), AdbError> {
        let mut cmd = self.command();
        cmd.arg("shell").args(args);
        process::run(SdkTool::Adb.name(), &mut cmd).await?;
        Ok(())
    }

    /// Pull a file or directory from the device
    pub async fn pull(&self, remote: &str, local: &Path) -> Result<(), AdbError> {
        info!("Pulling {} to {:?}", remote, local);
        let mut cmd = self.command();
        cmd.arg("pull").arg(remote).arg(local);
        process::run(SdkTool::Adb.name(), &mut cmd).await?;
        Ok(())
    }
}
