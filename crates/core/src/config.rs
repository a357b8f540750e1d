//! Run Configuration
//!
//! Settings for a droid-e2e run:
//! - Emulator identity, launch flags and readiness polling
//! - Application whose data is copied off the device
//! - Host preparation (KVM udev rule, system packages)
//!
//! Every field has a default, so a config file only needs the keys it changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{E2eError, Result};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "DROID_E2E_CONFIG";

/// Config file picked up from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "droid-e2e.toml";

/// Emulator configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmulatorSettings {
    /// AVD name created and launched
    pub name: String,
    /// Console port; the ADB serial is derived from it
    pub port: u16,
    /// Value for `-partition-size`, in MB
    pub partition_size_mb: u32,
    /// Combined stdout/stderr of the emulator process
    pub log_file: PathBuf,
    /// Where the launched emulator's pid is recorded
    pub pid_file: PathBuf,
    /// Upper bound on waiting for boot completion
    pub boot_timeout_secs: u64,
    /// First readiness poll interval
    pub poll_initial_ms: u64,
    /// Readiness poll interval ceiling
    pub poll_max_ms: u64,
}

impl Default for EmulatorSettings {
    fn default() -> Self {
        Self {
            name: "e2e_emulator".to_string(),
            port: 5554,
            partition_size_mb: 4096,
            log_file: PathBuf::from("emulator-logs.txt"),
            pid_file: PathBuf::from("emulator.pid"),
            boot_timeout_secs: 600,
            poll_initial_ms: 1000,
            poll_max_ms: 10_000,
        }
    }
}

/// Application under test
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppSettings {
    /// Package name (bundle identifier)
    pub bundle_id: String,
    /// Shared-storage path the private data directory is copied to
    pub device_data_path: String,
    /// Local directory the data is pulled into
    pub local_data_dir: PathBuf,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            bundle_id: "com.example.e2e".to_string(),
            device_data_path: "/sdcard/appData".to_string(),
            local_data_dir: PathBuf::from("appData"),
        }
    }
}

/// Host preparation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HostSettings {
    /// udev rule file granting access to /dev/kvm
    pub kvm_rule_path: PathBuf,
    /// Packages installed with apt-get before the SDK steps
    pub system_packages: Vec<String>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            kvm_rule_path: PathBuf::from("/etc/udev/rules.d/99-kvm4all.rules"),
            system_packages: vec!["libpulse0".to_string()],
        }
    }
}

/// Main run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct E2eConfig {
    /// Emulator settings
    pub emulator: EmulatorSettings,
    /// Application settings
    pub app: AppSettings,
    /// Host settings
    pub host: HostSettings,
}

impl E2eConfig {
    /// Locate the config file: `$DROID_E2E_CONFIG`, then `./droid-e2e.toml`
    pub fn config_file() -> Option<PathBuf> {
        Self::config_file_from(std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
    }

    fn config_file_from(explicit: Option<PathBuf>) -> Option<PathBuf> {
        match explicit {
            Some(path) if !path.as_os_str().is_empty() => Some(path),
            _ => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.exists().then_some(local)
            }
        }
    }

    /// Load configuration, falling back to defaults when no file is found
    pub fn load() -> Result<Self> {
        match Self::config_file() {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading config from {:?}", path);
        let contents = std::fs::read_to_string(path).map_err(|e| {
            E2eError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: E2eConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<()> {
        if self.emulator.name.trim().is_empty() {
            return Err(E2eError::Config("emulator.name must not be empty".into()));
        }
        if self.emulator.port == 0 {
            return Err(E2eError::Config("emulator.port must be non-zero".into()));
        }
        if self.app.bundle_id.trim().is_empty() {
            return Err(E2eError::Config("app.bundle_id must not be empty".into()));
        }
        if self.emulator.poll_initial_ms == 0 || self.emulator.poll_max_ms < self.emulator.poll_initial_ms {
            return Err(E2eError::Config(
                "emulator.poll_initial_ms must be non-zero and not exceed emulator.poll_max_ms".into(),
            ));
        }
        Ok(())
    }
}

impl EmulatorSettings {
    /// Boot wait bound as a duration
    pub fn boot_timeout(&self) -> Duration {
        Duration::from_secs(self.boot_timeout_secs)
    }

    /// Initial and ceiling readiness poll intervals
    pub fn poll_bounds(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.poll_initial_ms),
            Duration::from_millis(self.poll_max_ms),
        )
    }
}
