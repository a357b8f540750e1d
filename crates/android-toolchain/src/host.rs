//! Host preparation
//!
//! The emulator needs hardware acceleration and PulseAudio's client
//! library on a Linux CI host. Both steps assume the process already runs
//! with the privileges to write under /etc and install packages.

use std::path::Path;

use droid_e2e_core::{E2eError, HostSettings};
use tokio::process::Command;
use tracing::info;

use crate::process::{self, ProcessError};

/// udev rule making /dev/kvm usable by every user
pub const KVM_UDEV_RULE: &str =
    "KERNEL==\"kvm\", GROUP=\"kvm\", MODE=\"0666\", OPTIONS+=\"static_node=kvm\"\n";

/// Host preparation errors
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("cannot write udev rule {path}: {source}")]
    WriteRule {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Process(#[from] ProcessError),
}

impl From<HostError> for E2eError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Process(e) => e.into(),
            write @ HostError::WriteRule { .. } => {
                E2eError::Io(std::io::Error::new(std::io::ErrorKind::Other, write.to_string()))
            }
        }
    }
}

/// Applies host-level setup before the SDK steps
pub struct HostPreparer {
    settings: HostSettings,
}

impl HostPreparer {
    pub fn new(settings: HostSettings) -> Self {
        Self { settings }
    }

    /// Write the KVM rule, then reload and trigger udev
    pub async fn install_kvm_rule(&self) -> Result<(), HostError> {
        let path = &self.settings.kvm_rule_path;
        info!("Writing KVM udev rule to {:?}", path);
        write_rule(path).await?;

        process::run(
            "udevadm",
            Command::new("udevadm").args(["control", "--reload-rules"]),
        )
        .await?;
        process::run(
            "udevadm",
            Command::new("udevadm").args(["trigger", "--name-match=kvm"]),
        )
        .await?;
        Ok(())
    }

    /// Install the configured system packages with apt-get
    pub async fn install_system_packages(&self) -> Result<(), HostError> {
        if self.settings.system_packages.is_empty() {
            return Ok(());
        }

        info!("Installing system packages: {:?}", self.settings.system_packages);
        process::run(
            "apt-get",
            Command::new("apt-get")
                .env("DEBIAN_FRONTEND", "noninteractive")
                .args(["install", "-y"])
                .args(&self.settings.system_packages),
        )
        .await?;
        Ok(())
    }
}

async fn write_rule(path: &Path) -> Result<(), HostError> {
    tokio::fs::write(path, KVM_UDEV_RULE)
        .await
        .map_err(|source| HostError::WriteRule {
            path: path.display().to_string(),
            source,
        })
}
