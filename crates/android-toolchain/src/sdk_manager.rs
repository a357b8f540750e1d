//! SDK Manager
//!
//! Wraps the Android SDK manager to accept licenses and install the
//! packages the test emulator needs.

use std::path::{Path, PathBuf};

use droid_e2e_core::E2eError;
use tokio::process::Command;
use tracing::info;

use crate::env::{locate_tool, SdkTool};
use crate::process::{self, ProcessError};

/// `y` answers fed to `sdkmanager`; enough for every license it knows about
const LICENSE_ANSWERS: usize = 100;

/// SDK component types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkComponent {
    Emulator,      // emulator
    PlatformTools, // platform-tools
    SystemImage {
        api_level: String,
        tag: String,
        abi: String,
    }, // system-images;android-XX;tag;abi
}

impl SdkComponent {
    /// The x86_64 default-flavour system image for an API level
    pub fn system_image(api_level: &str) -> Self {
        SdkComponent::SystemImage {
            api_level: api_level.to_string(),
            tag: crate::SYSTEM_IMAGE_TAG.to_string(),
            abi: crate::SYSTEM_IMAGE_ABI.to_string(),
        }
    }

    /// Get the SDK manager package name
    pub fn package_name(&self) -> String {
        match self {
            SdkComponent::Emulator => "emulator".to_string(),
            SdkComponent::PlatformTools => "platform-tools".to_string(),
            SdkComponent::SystemImage { api_level, tag, abi } => {
                format!("system-images;android-{};{};{}", api_level, tag, abi)
            }
        }
    }
}

/// SDK Manager errors
#[derive(Debug, thiserror::Error)]
pub enum SdkManagerError {
    #[error("license acceptance failed: {0}")]
    Licenses(#[source] ProcessError),
    #[error("installing {packages:?} failed: {source}")]
    Install {
        packages: Vec<String>,
        #[source]
        source: ProcessError,
    },
}

impl From<SdkManagerError> for E2eError {
    fn from(err: SdkManagerError) -> Self {
        match err {
            SdkManagerError::Licenses(source) | SdkManagerError::Install { source, .. } => source.into(),
        }
    }
}

/// Android SDK Manager wrapper
pub struct SdkManager {
    sdk_root: PathBuf,
    sdkmanager_path: PathBuf,
}

impl SdkManager {
    /// Create a new SDK manager for an SDK root
    pub fn new(sdk_root: &Path) -> Self {
        Self {
            sdk_root: sdk_root.to_path_buf(),
            sdkmanager_path: locate_tool(sdk_root, SdkTool::SdkManager),
        }
    }

    /// Create the base command with environment variables
    fn create_command(&self) -> Command {
        let mut cmd = Command::new(&self.sdkmanager_path);
        cmd.env("ANDROID_SDK_ROOT", &self.sdk_root);
        cmd.env("ANDROID_HOME", &self.sdk_root);
        cmd
    }

    /// Accept all licenses
    pub async fn accept_licenses(&self) -> Result<(), SdkManagerError> {
        info!("Accepting Android SDK licenses...");

        let mut cmd = self.create_command();
        cmd.arg("--licenses");

        process::run_answering(SdkTool::SdkManager.name(), &mut cmd, b"y\n", LICENSE_ANSWERS)
            .await
            .map_err(SdkManagerError::Licenses)?;

        info!("Licenses accepted");
        Ok(())
    }

    /// Install SDK components, in the order given
    pub async fn install(&self, components: &[SdkComponent]) -> Result<(), SdkManagerError> {
        let packages: Vec<String> = components.iter().map(|c| c.package_name()).collect();

        info!("Installing SDK packages: {:?}", packages);

        let mut cmd = self.create_command();
        cmd.args(&packages);

        process::run_answering(SdkTool::SdkManager.name(), &mut cmd, b"y\n", LICENSE_ANSWERS)
            .await
            .map_err(|source| SdkManagerError::Install {
                packages: packages.clone(),
                source,
            })?;

        info!("SDK packages installed successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_package_name() {
        assert_eq!(SdkComponent::Emulator.package_name(), "emulator");
        assert_eq!(SdkComponent::PlatformTools.package_name(), "platform-tools");
        assert_eq!(
            SdkComponent::system_image("33").package_name(),
            "system-images;android-33;default;x86_64"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_install_passes_packages_in_order() {
        use std::os::unix::fs::PermissionsExt;

        let sdk = tempfile::tempdir().unwrap();
        let bin = sdk.path().join("cmdline-tools").join("latest").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let record = sdk.path().join("args.txt");
        let script = bin.join("sdkmanager");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho \"$@\" > {}\n", record.display()),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let manager = SdkManager::new(sdk.path());
        manager
            .install(&[
                SdkComponent::Emulator,
                SdkComponent::system_image("30"),
                SdkComponent::PlatformTools,
            ])
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(record).unwrap().trim(),
            "emulator system-images;android-30;default;x86_64 platform-tools"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_license_failure_keeps_exit_code() {
        use std::os::unix::fs::PermissionsExt;

        let sdk = tempfile::tempdir().unwrap();
        let bin = sdk.path().join("cmdline-tools").join("latest").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let script = bin.join("sdkmanager");
        std::fs::write(&script, "#!/bin/sh\nexit 7\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = SdkManager::new(sdk.path()).accept_licenses().await.unwrap_err();
        assert_eq!(E2eError::from(err).exit_code(), 7);
    }
}
