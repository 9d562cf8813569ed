//! CLI front-end: command parsing, registry, and dispatch helpers used by the `cppmangle` binary.

mod commands;
mod help;

use std::env;
use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use crate::logging::{LogFormat, LogLevel, LogOptions, LogSettings};
use crate::target::Target;
use commands::common::is_help_flag;

pub mod dispatch;

pub(crate) type CommandParser = fn(Vec<String>) -> Result<Cli, CliError>;

#[derive(Clone, Copy)]
pub(crate) struct CommandDescriptor {
    name: &'static str,
    aliases: &'static [&'static str],
    parser: CommandParser,
}

impl CommandDescriptor {
    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn aliases(&self) -> &'static [&'static str] {
        self.aliases
    }

    pub(crate) fn parse(&self, args: Vec<String>) -> Result<Cli, CliError> {
        (self.parser)(args)
    }

    fn matches(&self, name: &str) -> bool {
        self.name() == name || self.aliases().iter().any(|alias| *alias == name)
    }
}

pub(crate) struct CommandRegistry {
    entries: &'static [CommandDescriptor],
}

impl CommandRegistry {
    pub(crate) fn new(entries: &'static [CommandDescriptor]) -> Self {
        Self { entries }
    }

    pub(crate) fn resolve(&self, name: &str) -> Option<&'static CommandDescriptor> {
        self.entries.iter().find(|descriptor| descriptor.matches(name))
    }
}

pub(crate) fn registry() -> CommandRegistry {
    CommandRegistry::new(commands::descriptors())
}

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One `<symbol> <mangled>` pair per line.
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.to_ascii_lowercase().as_str() {
            "text" | "plain" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        }
    }
}

/// Top-level commands supported by the `cppmangle` CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Mangle every C++ symbol of a JSON descriptor.
    Mangle {
        descriptor: PathBuf,
        /// `None` mangles for the host.
        target: Option<Target>,
        format: OutputFormat,
    },
    /// Print the mangling configuration of every known target.
    Targets { format: OutputFormat },
    Help { topic: Option<String> },
    Version,
}

impl Command {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::Mangle { .. } => "mangle",
            Command::Targets { .. } => "targets",
            Command::Help { .. } => "help",
            Command::Version => "version",
        }
    }
}

/// A parsed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub command: Command,
    pub log_options: LogOptions,
}

impl Cli {
    fn with_env_logging(command: Command) -> Self {
        Self {
            command,
            log_options: LogOptions::from_env(),
        }
    }
}

/// Error emitted while parsing command-line arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliError {
    message: String,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn with_usage(message: impl Into<String>) -> Self {
        let mut owned = message.into();
        owned.push_str("\n\n");
        owned.push_str(&Cli::usage());
        Self::new(owned)
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for CliError {}

impl Cli {
    /// Parse arguments from the environment.
    ///
    /// # Errors
    /// Returns a [`CliError`] when the arguments cannot be interpreted as a supported command.
    pub fn parse() -> Result<Self, CliError> {
        Self::parse_from(env::args().skip(1))
    }

    /// Parse arguments from an iterator (useful for testing).
    ///
    /// # Errors
    /// Returns a [`CliError`] when the provided iterator does not describe a valid invocation.
    pub fn parse_from<I, T>(args: I) -> Result<Self, CliError>
    where
        I: Iterator<Item = T>,
        T: Into<String>,
    {
        let mut iter = args.map(Into::<String>::into).peekable();
        let mut log_settings = LogSettings::default();
        while let Some(flag) = iter.peek().cloned() {
            if !flag.starts_with('-') || flag == "--" {
                break;
            }
            if is_help_flag(&flag) || matches!(flag.as_str(), "--version" | "-V") {
                break;
            }
            if consume_global_option(&mut iter, &mut log_settings)? {
                continue;
            }
            return Err(CliError::with_usage(format!(
                "unsupported global option '{flag}'"
            )));
        }

        let mut cli = Self::parse_command(iter)?;
        if !log_settings.is_empty() {
            cli.log_options = LogOptions::with_overrides(cli.log_options, log_settings);
        }
        Ok(cli)
    }

    fn parse_command<I>(mut iter: std::iter::Peekable<I>) -> Result<Self, CliError>
    where
        I: Iterator<Item = String>,
    {
        let Some(raw_command) = iter.next() else {
            return Err(CliError::with_usage("missing command"));
        };

        match raw_command.as_str() {
            "--help" | "-h" | "help" => {
                let topic = iter
                    .next()
                    .filter(|value| !is_help_flag(value))
                    .map(|value| value.to_ascii_lowercase());
                return Ok(Cli::with_env_logging(Command::Help { topic }));
            }
            "--version" | "-V" | "version" => {
                if let Some(flag) = iter.next() {
                    if is_help_flag(&flag) {
                        return Ok(Cli::with_env_logging(Command::Help {
                            topic: Some("version".into()),
                        }));
                    }
                    return Err(CliError::with_usage(format!(
                        "unsupported option '{flag}' for command"
                    )));
                }
                return Ok(Cli::with_env_logging(Command::Version));
            }
            _ => {}
        }

        if let Some(descriptor) = registry().resolve(&raw_command) {
            return descriptor.parse(iter.collect());
        }

        Err(CliError::with_usage(format!(
            "unknown command '{raw_command}'"
        )))
    }

    /// Return formatted general help text.
    #[must_use]
    pub fn usage() -> String {
        help::render_general_help()
    }

    /// Return help text for a specific command.
    ///
    /// # Errors
    /// Returns a [`CliError`] when the requested topic is unknown.
    pub fn help_for(topic: &str) -> Result<String, CliError> {
        help::render_command_help(topic)
            .ok_or_else(|| CliError::with_usage(help::format_unknown_topic(topic)))
    }
}

/// Consume `--log-format`/`--log-level` (space or `=` separated). Returns
/// `false` when the next argument is not a global option.
fn consume_global_option<I>(
    iter: &mut std::iter::Peekable<I>,
    settings: &mut LogSettings,
) -> Result<bool, CliError>
where
    I: Iterator<Item = String>,
{
    let Some(flag) = iter.peek().cloned() else {
        return Ok(false);
    };
    let (name, inline) = match flag.split_once('=') {
        Some((name, value)) => (name.to_string(), Some(value.to_string())),
        None => (flag.clone(), None),
    };
    if !matches!(name.as_str(), "--log-format" | "--log-level") {
        return Ok(false);
    }
    iter.next();
    let value = match inline {
        Some(value) => value,
        None => iter
            .next()
            .ok_or_else(|| CliError::with_usage(format!("expected value after {name}")))?,
    };
    if name == "--log-format" {
        let format = LogFormat::parse(&value).ok_or_else(|| {
            CliError::with_usage(format!(
                "unsupported log format '{value}'; expected auto, text, or json"
            ))
        })?;
        settings.format = Some(format);
    } else {
        let level = LogLevel::parse(&value).ok_or_else(|| {
            CliError::with_usage(format!(
                "unsupported log level '{value}'; expected error, warn, info, debug, or trace"
            ))
        })?;
        settings.level = Some(level);
    }
    Ok(true)
}
