use std::time::Duration;

use crate::cli::Command;
use crate::logging::{LogFormat, LogOptions};

pub(super) fn init_logging(options: &LogOptions) {
    use std::io::IsTerminal;
    use std::sync::OnceLock;
    use tracing_subscriber::{EnvFilter, fmt};

    static INITIALISED: OnceLock<()> = OnceLock::new();

    let _ = INITIALISED.get_or_init(|| {
        let use_ansi = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
        let make_filter = || {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(options.filter_directive()))
        };

        match options.format {
            LogFormat::Json => {
                let subscriber = fmt::fmt()
                    .with_env_filter(make_filter())
                    .with_ansi(false)
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .json()
                    .finish();
                let _ = tracing::subscriber::set_global_default(subscriber);
            }
            _ => {
                let subscriber = fmt::fmt()
                    .with_env_filter(make_filter())
                    .with_ansi(use_ansi)
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .compact()
                    .finish();
                let _ = tracing::subscriber::set_global_default(subscriber);
            }
        }
    });
}

pub(super) fn log_run_start(command: &Command, options: &LogOptions) {
    let metadata = CommandLogMetadata::of(command);
    tracing::info!(
        target: "cli",
        stage = "cli.run.start",
        command = command.name(),
        log_level = %options.level,
        log_format = %options.format,
        descriptor = metadata.descriptor(),
        target_triple = metadata.target(),
        output = metadata.output(),
    );
}

pub(super) fn log_run_complete(
    command: &Command,
    elapsed: Duration,
    result: &crate::error::Result<()>,
) {
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    match result {
        Ok(()) => tracing::info!(
            target: "cli",
            stage = "cli.run.footer",
            command = command.name(),
            status = "ok",
            elapsed_ms
        ),
        Err(err) => tracing::error!(
            target: "cli",
            stage = "cli.run.footer",
            command = command.name(),
            status = "error",
            elapsed_ms,
            error = %err
        ),
    }
}

/// Fields logged alongside the command name.
struct CommandLogMetadata {
    descriptor: Option<String>,
    target: Option<String>,
    output: Option<&'static str>,
}

impl CommandLogMetadata {
    fn of(command: &Command) -> Self {
        match command {
            Command::Mangle {
                descriptor,
                target,
                format,
            } => Self {
                descriptor: Some(descriptor.display().to_string()),
                target: Some(
                    target
                        .as_ref()
                        .map_or_else(|| "host".to_string(), |target| target.triple().to_string()),
                ),
                output: Some(format.as_str()),
            },
            Command::Targets { format } => Self {
                descriptor: None,
                target: None,
                output: Some(format.as_str()),
            },
            Command::Help { .. } | Command::Version => Self {
                descriptor: None,
                target: None,
                output: None,
            },
        }
    }

    fn descriptor(&self) -> &str {
        self.descriptor.as_deref().unwrap_or("n/a")
    }

    fn target(&self) -> &str {
        self.target.as_deref().unwrap_or("n/a")
    }

    fn output(&self) -> &str {
        self.output.unwrap_or("n/a")
    }
}
