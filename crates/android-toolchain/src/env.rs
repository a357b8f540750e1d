//! SDK Environment
//!
//! Resolves the Android SDK root and the paths of the command-line tools
//! inside it.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use droid_e2e_core::E2eError;
use tracing::{debug, warn};

/// Environment variable naming the SDK root
pub const ANDROID_HOME_VAR: &str = "ANDROID_HOME";

/// Default SDK root on Linux hosts (GitHub-hosted runner layout)
pub const LINUX_DEFAULT_SDK: &str = "/usr/local/lib/android/sdk";

/// SDK root resolution errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SdkRootError {
    #[error("{} environment variable is required", ANDROID_HOME_VAR)]
    Unresolved,
    #[error("cannot determine the home directory for the default macOS SDK location; set {}", ANDROID_HOME_VAR)]
    NoHomeDir,
}

impl From<SdkRootError> for E2eError {
    fn from(err: SdkRootError) -> Self {
        E2eError::SdkRoot(err.to_string())
    }
}

/// Host platform families with a known default SDK location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    Linux,
    MacOs,
    Other,
}

impl HostPlatform {
    /// Platform this binary was built for
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            HostPlatform::Linux
        } else if cfg!(target_os = "macos") {
            HostPlatform::MacOs
        } else {
            HostPlatform::Other
        }
    }
}

/// Resolve the SDK root from an `ANDROID_HOME` value, the host platform and
/// the user's home directory.
pub fn resolve_sdk_root(
    android_home: Option<OsString>,
    platform: HostPlatform,
    home: Option<PathBuf>,
) -> Result<PathBuf, SdkRootError> {
    if let Some(value) = android_home.filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(value));
    }

    match platform {
        HostPlatform::Linux => Ok(PathBuf::from(LINUX_DEFAULT_SDK)),
        HostPlatform::MacOs => home
            .map(|h| h.join("Library").join("Android").join("sdk"))
            .ok_or(SdkRootError::NoHomeDir),
        HostPlatform::Other => Err(SdkRootError::Unresolved),
    }
}

/// Resolve the SDK root from the process environment
pub fn sdk_root_from_env() -> Result<PathBuf, SdkRootError> {
    let root = resolve_sdk_root(
        std::env::var_os(ANDROID_HOME_VAR),
        HostPlatform::current(),
        dirs::home_dir(),
    )?;
    debug!("Android SDK root: {:?}", root);
    Ok(root)
}

/// Tools shipped with the Android SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkTool {
    SdkManager,
    AvdManager,
    Emulator,
    Adb,
}

impl SdkTool {
    /// Bare executable name
    pub fn name(&self) -> &'static str {
        match self {
            SdkTool::SdkManager => "sdkmanager",
            SdkTool::AvdManager => "avdmanager",
            SdkTool::Emulator => "emulator",
            SdkTool::Adb => "adb",
        }
    }

    fn file_name(&self) -> String {
        match self {
            SdkTool::SdkManager | SdkTool::AvdManager if cfg!(windows) => format!("{}.bat", self.name()),
            SdkTool::Emulator | SdkTool::Adb if cfg!(windows) => format!("{}.exe", self.name()),
            _ => self.name().to_string(),
        }
    }

    /// Directories under the SDK root the tool may live in, most preferred first
    fn search_dirs(&self, sdk_root: &Path) -> Vec<PathBuf> {
        match self {
            SdkTool::SdkManager | SdkTool::AvdManager => {
                let cmdline_tools = sdk_root.join("cmdline-tools");
                let mut dirs = vec![cmdline_tools.join("latest").join("bin")];

                // Versioned installs (cmdline-tools/12.0/bin), newest name first
                if let Ok(entries) = std::fs::read_dir(&cmdline_tools) {
                    let mut versioned: Vec<PathBuf> = entries
                        .flatten()
                        .map(|e| e.path())
                        .filter(|p| p.file_name().map(|n| n != "latest").unwrap_or(false))
                        .map(|p| p.join("bin"))
                        .collect();
                    versioned.sort();
                    versioned.reverse();
                    dirs.extend(versioned);
                }

                dirs.push(sdk_root.join("tools").join("bin"));
                dirs
            }
            SdkTool::Emulator => vec![sdk_root.join("emulator")],
            SdkTool::Adb => vec![sdk_root.join("platform-tools")],
        }
    }
}

/// Find a tool: inside the SDK first, then on `PATH`, else the bare name so
/// that spawning reports the missing binary.
pub fn locate_tool(sdk_root: &Path, tool: SdkTool) -> PathBuf {
    let file_name = tool.file_name();

    if let Some(path) = tool
        .search_dirs(sdk_root)
        .into_iter()
        .map(|dir| dir.join(&file_name))
        .find(|p| p.is_file())
    {
        return path;
    }

    match which::which(tool.name()) {
        Ok(path) => {
            debug!("{} not under {:?}, using {:?} from PATH", tool.name(), sdk_root, path);
            path
        }
        Err(_) => {
            warn!("{} not found under {:?} or on PATH", tool.name(), sdk_root);
            PathBuf::from(tool.name())
        }
    }
}
