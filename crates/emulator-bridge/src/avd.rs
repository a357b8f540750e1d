//! AVD (Android Virtual Device) Manager
//!
//! Creates the Android Virtual Device the emulator boots.

use std::path::{Path, PathBuf};

use droid_e2e_android_toolchain::process::{self, ProcessError};
use droid_e2e_android_toolchain::{locate_tool, SdkComponent, SdkTool};
use droid_e2e_core::E2eError;
use tokio::process::Command;
use tracing::info;

/// AVD Manager errors
#[derive(Debug, thiserror::Error)]
pub enum AvdError {
    #[error("Failed to create AVD {name}: {source}")]
    CreateFailed {
        name: String,
        #[source]
        source: ProcessError,
    },
}

impl From<AvdError> for E2eError {
    fn from(err: AvdError) -> Self {
        match err {
            AvdError::CreateFailed { source, .. } => source.into(),
        }
    }
}

/// AVD configuration for creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvdConfig {
    pub name: String,
    pub package: String, // system image package
    pub device: String,  // device profile
    pub force: bool,
}

impl AvdConfig {
    /// Config for an AVD booting `image` on the `device` hardware profile,
    /// replacing any AVD of the same name.
    pub fn new(name: &str, image: &SdkComponent, device: &str) -> Self {
        Self {
            name: name.to_string(),
            package: image.package_name(),
            device: device.to_string(),
            force: true,
        }
    }

    /// `avdmanager` arguments for this config
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "create".to_string(),
            "avd".to_string(),
            "-n".to_string(),
            self.name.clone(),
            "-k".to_string(),
            self.package.clone(),
            "-d".to_string(),
            self.device.clone(),
        ];
        if self.force {
            args.push("--force".to_string());
        }
        args
    }
}

/// AVD Manager
pub struct AvdManager {
    avdmanager_path: PathBuf,
}

impl AvdManager {
    /// Create a new AVD manager
    pub fn new(sdk_root: &Path) -> Self {
        Self {
            avdmanager_path: locate_tool(sdk_root, SdkTool::AvdManager),
        }
    }

    /// Create a new AVD
    pub async fn create_avd(&self, config: &AvdConfig) -> Result<(), AvdError> {
        info!("Creating AVD {} ({} on {})", config.name, config.package, config.device);

        let mut cmd = Command::new(&self.avdmanager_path);
        cmd.args(config.to_args());

        // Decline the "custom hardware profile" question
        process::run_answering(SdkTool::AvdManager.name(), &mut cmd, b"no\n", 1)
            .await
            .map_err(|source| AvdError::CreateFailed {
                name: config.name.clone(),
                source,
            })?;

        info!("AVD created successfully: {}", config.name);
        Ok(())
    }
}
