//! Run context
//!
//! Everything a handler needs to know about the environment, resolved once
//! at startup and read-only afterwards.

use std::path::{Path, PathBuf};

use crate::config::{AppSettings, E2eConfig, EmulatorSettings, HostSettings};

/// Immutable per-run context passed to every command handler
#[derive(Debug, Clone)]
pub struct EnvironmentContext {
    sdk_root: PathBuf,
    serial: String,
    config: E2eConfig,
}

impl EnvironmentContext {
    /// Create the context from a resolved SDK root and loaded configuration
    pub fn new(sdk_root: PathBuf, config: E2eConfig) -> Self {
        let serial = format!("emulator-{}", config.emulator.port);
        Self {
            sdk_root,
            serial,
            config,
        }
    }

    /// Android SDK root
    pub fn sdk_root(&self) -> &Path {
        &self.sdk_root
    }

    /// ADB serial of the managed emulator
    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn emulator(&self) -> &EmulatorSettings {
        &self.config.emulator
    }

    pub fn app(&self) -> &AppSettings {
        &self.config.app
    }

    pub fn host(&self) -> &HostSettings {
        &self.config.host
    }
}
