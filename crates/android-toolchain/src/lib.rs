//! Android Toolchain Management
//!
//! Handles everything below the emulator itself:
//! - Locating the Android SDK root and the tools inside it
//! - Driving `sdkmanager` (licenses, package installation)
//! - Preparing the host (KVM udev rule, system packages)
//! - Running external tools with fail-fast status checking

pub mod env;
pub mod host;
pub mod process;
pub mod sdk_manager;

pub use env::{locate_tool, resolve_sdk_root, sdk_root_from_env, HostPlatform, SdkRootError, SdkTool};
pub use host::{HostError, HostPreparer, KVM_UDEV_RULE};
pub use process::ProcessError;
pub use sdk_manager::{SdkComponent, SdkManager, SdkManagerError};

/// System image flavour installed for the test emulator
pub const SYSTEM_IMAGE_TAG: &str = "default";

/// System image ABI installed for the test emulator
pub const SYSTEM_IMAGE_ABI: &str = "x86_64";
