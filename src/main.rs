//! droid-e2e entry point
//!
//! Initializes logging, hands the arguments to the dispatcher and exits with
//! the status it returns.

use std::io::IsTerminal;
use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_logging() {
        eprintln!("warning: {:#}", e);
    }

    let code = droid_e2e::run(std::env::args().skip(1)).await;
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`)
fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install log subscriber: {}", e))?;

    Ok(())
}
