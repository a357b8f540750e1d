//! droid-e2e - Android emulator helpers for end-to-end test infrastructure
//!
//! A small command-line front end over the Android SDK tools:
//!
//! - `createAndStart`: prepare the host, install SDK packages, create an AVD
//!   and boot it headless
//! - `setupReversePort`: reverse-forward a TCP port from the emulator
//! - `bugreport`: collect a device bug report into a directory
//! - `copyAppData`: copy the application's private data off the device
//!
//! ## Architecture
//!
//! - `droid-e2e-core`: configuration, run context, errors
//! - `droid-e2e-android-toolchain`: SDK location, sdkmanager, host setup
//! - `droid-e2e-emulator-bridge`: adb, avdmanager, emulator process

#![warn(clippy::all)]

pub mod cli;
pub mod commands;

pub use droid_e2e_android_toolchain as toolchain;
pub use droid_e2e_core as e2e_core;
pub use droid_e2e_emulator_bridge as emulator;

use droid_e2e_core::{E2eConfig, EnvironmentContext};
use tracing::debug;

use crate::cli::{Invocation, Parsed, UsageError, USAGE};

impl Invocation {
    /// Run the selected command
    pub async fn execute(&self, ctx: &EnvironmentContext) -> droid_e2e_core::Result<()> {
        match self {
            Invocation::CreateAndStart(options) => options.execute(ctx).await,
            Invocation::SetupReversePort(options) => options.execute(ctx).await,
            Invocation::Bugreport(options) => options.execute(ctx).await,
            Invocation::CopyAppData(options) => options.execute(ctx).await,
        }
    }
}

fn report_usage_error(err: &UsageError) {
    if !matches!(err, UsageError::NoCommand) {
        eprintln!("{}", err);
        eprintln!();
    }
    print!("{}", USAGE);
}

/// Parse `args` (without the program name), run the command and return the
/// process exit status.
pub async fn run<I, S>(args: I) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let invocation = match cli::parse(args) {
        Ok(Parsed::Run(invocation)) => invocation,
        Ok(Parsed::Help) => {
            print!("{}", USAGE);
            return 0;
        }
        Ok(Parsed::Version) => {
            println!("{} {}", droid_e2e_core::APP_NAME, droid_e2e_core::VERSION);
            return 0;
        }
        Err(err) => {
            report_usage_error(&err);
            return 1;
        }
    };

    let ctx = match build_context() {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("{}", err);
            return err.exit_code();
        }
    };
    debug!("Running {:?} against {}", invocation, ctx.serial());

    match invocation.execute(&ctx).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err);
            err.exit_code()
        }
    }
}

/// Load the configuration and resolve the SDK root, once per run
fn build_context() -> droid_e2e_core::Result<EnvironmentContext> {
    let config = E2eConfig::load()?;
    let sdk_root = toolchain::sdk_root_from_env()?;
    Ok(EnvironmentContext::new(sdk_root, config))
}
