//! Command handlers
//!
//! Each handler is a fixed sequence of external tool invocations. The first
//! failing step ends the run; nothing is retried or rolled back.

use std::path::PathBuf;

use droid_e2e_android_toolchain::{HostPreparer, SdkComponent, SdkManager};
use droid_e2e_core::{EnvironmentContext, Result};
use droid_e2e_emulator_bridge::{
    AdbClient, AvdConfig, AvdManager, EmulatorLauncher, EmulatorOptions, ReadinessPolicy,
};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// File name of the report inside the bugreport output directory
pub const BUGREPORT_FILE: &str = "bugreport";

/// `createAndStart` options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAndStartOptions {
    pub api_level: String,
    pub device: String,
}

impl CreateAndStartOptions {
    /// Prepare the host, install the SDK pieces, create the AVD, launch the
    /// emulator and wait for it to finish booting.
    pub async fn execute(&self, ctx: &EnvironmentContext) -> Result<()> {
        info!(
            "Creating emulator {} (API {}, device {})",
            ctx.emulator().name,
            self.api_level,
            self.device
        );

        let host = HostPreparer::new(ctx.host().clone());
        host.install_kvm_rule().await?;
        host.install_system_packages().await?;

        let sdk = SdkManager::new(ctx.sdk_root());
        sdk.accept_licenses().await?;

        let image = SdkComponent::system_image(&self.api_level);
        sdk.install(&[
            SdkComponent::Emulator,
            image.clone(),
            SdkComponent::PlatformTools,
        ])
        .await?;

        let avd = AvdConfig::new(&ctx.emulator().name, &image, &self.device);
        AvdManager::new(ctx.sdk_root()).create_avd(&avd).await?;

        let settings = ctx.emulator();
        let options = EmulatorOptions::headless(settings.port, settings.partition_size_mb);
        let mut instance = EmulatorLauncher::new(ctx.sdk_root())
            .launch(&settings.name, &options, &settings.log_file)
            .await?;
        if let Err(e) = instance.write_pid_file(&settings.pid_file).await {
            warn!("Cannot record emulator pid in {:?}: {}", settings.pid_file, e);
        }

        let adb = AdbClient::new(ctx.sdk_root(), ctx.serial());
        let ready = instance
            .wait_until_ready(&adb, &ReadinessPolicy::from(settings))
            .await;

        // The log is shown whether or not the boot succeeded
        match instance.read_log().await {
            Ok(log) => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(&log).await?;
                stdout.flush().await?;
            }
            Err(e) => warn!("Cannot read emulator log {:?}: {}", settings.log_file, e),
        }

        ready?;

        let pid = instance.detach();
        info!("Emulator {} is ready (pid {:?})", ctx.serial(), pid);
        Ok(())
    }
}

/// `setupReversePort` options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReversePortOptions {
    pub port: u16,
}

impl ReversePortOptions {
    pub async fn execute(&self, ctx: &EnvironmentContext) -> Result<()> {
        AdbClient::new(ctx.sdk_root(), ctx.serial())
            .reverse(self.port)
            .await?;
        Ok(())
    }
}

/// `bugreport` options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BugreportOptions {
    pub output_directory: PathBuf,
}

impl BugreportOptions {
    /// Path the report is written to
    pub fn report_path(&self) -> PathBuf {
        self.output_directory.join(BUGREPORT_FILE)
    }

    pub async fn execute(&self, ctx: &EnvironmentContext) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_directory).await?;
        AdbClient::new(ctx.sdk_root(), ctx.serial())
            .bugreport_to(&self.report_path())
            .await?;
        Ok(())
    }
}

/// `copyAppData` has no options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyAppDataOptions;

impl CopyAppDataOptions {
    /// Copy the app's private directory to shared storage as the app user,
    /// then pull it to the local data directory.
    pub async fn execute(&self, ctx: &EnvironmentContext) -> Result<()> {
        let app = ctx.app();
        let private_dir = format!("/data/data/{}", app.bundle_id);
        let adb = AdbClient::new(ctx.sdk_root(), ctx.serial());

        info!("Copying {} to {}", private_dir, app.device_data_path);
        adb.shell(&[
            "run-as",
            app.bundle_id.as_str(),
            "cp",
            "-r",
            private_dir.as_str(),
            app.device_data_path.as_str(),
        ])
        .await?;

        adb.pull(&app.device_data_path, &app.local_data_dir).await?;
        Ok(())
    }
}
