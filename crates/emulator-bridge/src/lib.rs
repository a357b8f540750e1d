//! Android Emulator Bridge
//!
//! Creates the test AVD, launches the emulator headless and talks to the
//! booted device through ADB.

pub mod adb;
pub mod avd;
pub mod device;
pub mod emulator;

pub use adb::{AdbClient, AdbError};
pub use avd::{AvdConfig, AvdError, AvdManager};
pub use device::DeviceState;
pub use emulator::{Backoff, EmulatorError, EmulatorInstance, EmulatorLauncher, EmulatorOptions, ReadinessPolicy};

/// ADB serial of the emulator listening on a console port
pub fn emulator_serial(port: u16) -> String {
    format!("emulator-{}", port)
}
