//! Command dispatch and option parsing
//!
//! The first argument selects the command; the rest are parsed by that
//! command's own clap definition. Required options are declared as
//! `Option<String>` and checked afterwards so that a missing one is reported
//! by label and flag instead of by clap.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::error::ErrorKind;
use clap::Parser;

use crate::commands::{BugreportOptions, CopyAppDataOptions, CreateAndStartOptions, ReversePortOptions};

/// Usage text printed on every usage error and for `--help`
pub const USAGE: &str = "\
Usage: droid-e2e <command> [options]

Commands:
  createAndStart -a API-LEVEL -d DEVICE
      Prepare the host, install SDK packages, create the AVD and boot the
      emulator headless. Waits until Android reports boot completion.
  setupReversePort PORT
      Make tcp:PORT on the emulator reach tcp:PORT on the host.
  bugreport -o OUTPUT-DIRECTORY
      Write a device bug report to OUTPUT-DIRECTORY/bugreport.
  copyAppData
      Copy the application's private data directory to ./appData.

Environment:
  ANDROID_HOME       Android SDK root (platform default when unset)
  DROID_E2E_CONFIG   Path to a TOML config file (default ./droid-e2e.toml)
  RUST_LOG           Log filter (default info)
";

/// The fixed set of commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandName {
    CreateAndStart,
    SetupReversePort,
    Bugreport,
    CopyAppData,
}

impl CommandName {
    pub const ALL: [CommandName; 4] = [
        CommandName::CreateAndStart,
        CommandName::SetupReversePort,
        CommandName::Bugreport,
        CommandName::CopyAppData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::CreateAndStart => "createAndStart",
            CommandName::SetupReversePort => "setupReversePort",
            CommandName::Bugreport => "bugreport",
            CommandName::CopyAppData => "copyAppData",
        }
    }
}

impl FromStr for CommandName {
    type Err = UsageError;

    /// Exact, case-sensitive match
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UsageError::UnknownCommand(s.to_string()))
    }
}

/// An option a command cannot run without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredOption {
    pub label: &'static str,
    /// Short flag, `None` for a positional argument
    pub flag: Option<char>,
}

impl RequiredOption {
    pub const API_LEVEL: RequiredOption = RequiredOption { label: "API-LEVEL", flag: Some('a') };
    pub const DEVICE: RequiredOption = RequiredOption { label: "DEVICE", flag: Some('d') };
    pub const OUTPUT_DIRECTORY: RequiredOption = RequiredOption { label: "OUTPUT-DIRECTORY", flag: Some('o') };
    pub const PORT: RequiredOption = RequiredOption { label: "PORT", flag: None };
}

impl fmt::Display for RequiredOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.flag {
            Some(flag) => write!(f, "{} (-{})", self.label, flag),
            None => write!(f, "{}", self.label),
        }
    }
}

/// Every required option that was absent or empty, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingOptions(pub Vec<RequiredOption>);

/// Collects required values, remembering which were missing
#[derive(Default)]
struct Requirements {
    missing: Vec<RequiredOption>,
}

impl Requirements {
    fn take(&mut self, value: &Option<String>, option: RequiredOption) -> String {
        match value.as_deref() {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => {
                self.missing.push(option);
                String::new()
            }
        }
    }

    fn finish<T>(self, value: T) -> Result<T, MissingOptions> {
        if self.missing.is_empty() {
            Ok(value)
        } else {
            Err(MissingOptions(self.missing))
        }
    }
}

/// Usage errors: always reported with the usage text and exit status 1
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("No command given")]
    NoCommand,
    #[error("Unknown command {0}")]
    UnknownCommand(String),
    #[error("{0} is required and was not provided")]
    Missing(RequiredOption),
    #[error("{0}")]
    InvalidArguments(String),
    #[error("PORT must be a number between 1 and 65535, got {0:?}")]
    InvalidPort(String),
}

impl From<MissingOptions> for UsageError {
    fn from(missing: MissingOptions) -> Self {
        // The first declared option is the one reported
        match missing.0.first() {
            Some(option) => UsageError::Missing(*option),
            None => UsageError::InvalidArguments("missing options".to_string()),
        }
    }
}

/// `createAndStart` flags
#[derive(Parser, Debug, Default)]
#[command(name = "createAndStart")]
pub struct CreateAndStartArgs {
    /// Android API level of the system image (e.g. 33)
    #[arg(short = 'a', value_name = "API-LEVEL")]
    pub api_level: Option<String>,

    /// AVD device profile (e.g. pixel_5)
    #[arg(short = 'd', value_name = "DEVICE")]
    pub device: Option<String>,
}

impl CreateAndStartArgs {
    pub fn validate(&self) -> Result<CreateAndStartOptions, MissingOptions> {
        let mut req = Requirements::default();
        let api_level = req.take(&self.api_level, RequiredOption::API_LEVEL);
        let device = req.take(&self.device, RequiredOption::DEVICE);
        req.finish(CreateAndStartOptions { api_level, device })
    }
}

/// `setupReversePort` arguments
#[derive(Parser, Debug, Default)]
#[command(name = "setupReversePort")]
pub struct SetupReversePortArgs {
    /// TCP port to reverse-forward
    #[arg(value_name = "PORT")]
    pub port: Option<String>,
}

impl SetupReversePortArgs {
    pub fn validate(&self) -> Result<String, MissingOptions> {
        let mut req = Requirements::default();
        let port = req.take(&self.port, RequiredOption::PORT);
        req.finish(port)
    }
}

/// `bugreport` flags
#[derive(Parser, Debug, Default)]
#[command(name = "bugreport")]
pub struct BugreportArgs {
    /// Directory the bug report is written into
    #[arg(short = 'o', value_name = "OUTPUT-DIRECTORY")]
    pub output_directory: Option<String>,
}

impl BugreportArgs {
    pub fn validate(&self) -> Result<BugreportOptions, MissingOptions> {
        let mut req = Requirements::default();
        let dir = req.take(&self.output_directory, RequiredOption::OUTPUT_DIRECTORY);
        req.finish(BugreportOptions {
            output_directory: PathBuf::from(dir),
        })
    }
}

/// `copyAppData` takes no options
#[derive(Parser, Debug, Default)]
#[command(name = "copyAppData")]
pub struct CopyAppDataArgs {}

/// A validated command ready to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    CreateAndStart(CreateAndStartOptions),
    SetupReversePort(ReversePortOptions),
    Bugreport(BugreportOptions),
    CopyAppData(CopyAppDataOptions),
}

/// Outcome of parsing the process arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Run(Invocation),
    Help,
    Version,
}

/// Run a command's clap parser over its arguments
fn parse_command_args<T: Parser>(name: CommandName, rest: &[String]) -> Result<Option<T>, UsageError> {
    let argv = std::iter::once(name.as_str().to_string()).chain(rest.iter().cloned());
    match T::try_parse_from(argv) {
        Ok(args) => Ok(Some(args)),
        Err(err) if err.kind() == ErrorKind::DisplayHelp => Ok(None),
        Err(err) => {
            let rendered = err.to_string();
            let first_line = rendered.lines().next().unwrap_or_default();
            Err(UsageError::InvalidArguments(
                first_line.trim_start_matches("error: ").to_string(),
            ))
        }
    }
}

fn parse_port(raw: &str) -> Result<u16, UsageError> {
    match raw.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(UsageError::InvalidPort(raw.to_string())),
    }
}

/// Select the command named by the first argument and parse the rest
pub fn parse<I, S>(args: I) -> Result<Parsed, UsageError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();
    let Some((first, rest)) = args.split_first() else {
        return Err(UsageError::NoCommand);
    };

    match first.as_str() {
        "-h" | "--help" => return Ok(Parsed::Help),
        "-V" | "--version" => return Ok(Parsed::Version),
        _ => {}
    }

    let name: CommandName = first.parse()?;
    let invocation = match name {
        CommandName::CreateAndStart => {
            let Some(args) = parse_command_args::<CreateAndStartArgs>(name, rest)? else {
                return Ok(Parsed::Help);
            };
            Invocation::CreateAndStart(args.validate()?)
        }
        CommandName::SetupReversePort => {
            let Some(args) = parse_command_args::<SetupReversePortArgs>(name, rest)? else {
                return Ok(Parsed::Help);
            };
            let port = parse_port(&args.validate()?)?;
            Invocation::SetupReversePort(ReversePortOptions { port })
        }
        CommandName::Bugreport => {
            let Some(args) = parse_command_args::<BugreportArgs>(name, rest)? else {
                return Ok(Parsed::Help);
            };
            Invocation::Bugreport(args.validate()?)
        }
        CommandName::CopyAppData => {
            if parse_command_args::<CopyAppDataArgs>(name, rest)?.is_none() {
                return Ok(Parsed::Help);
            }
            Invocation::CopyAppData(CopyAppDataOptions)
        }
    };

    Ok(Parsed::Run(invocation))
}
