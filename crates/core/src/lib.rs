//! Droid E2E Core - configuration and shared types
//!
//! This crate holds the settings a run is configured with, the immutable
//! context handed to every command handler, and the error type all
//! operations report through.

pub mod config;
pub mod context;
pub mod error;

pub use config::{AppSettings, E2eConfig, EmulatorSettings, HostSettings};
pub use context::EnvironmentContext;
pub use error::{E2eError, Result, ToolFailure};

/// Droid E2E version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "droid-e2e";
