//! Execute a parsed [`Cli`]: install logging, run the command, log the outcome.

use std::io::{self, Write};
use std::time::Instant;

use crate::cli::Cli;
use crate::error::{Error, Result};

mod commands;
mod logging;
mod reporting;

/// Run `cli`, writing command output to stdout.
///
/// # Errors
/// Propagates I/O, descriptor and mangling failures of the command.
pub fn run(cli: Cli) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with_writer(cli, &mut out)
}

/// Run `cli`, writing command output to `out`.
///
/// # Errors
/// Propagates I/O, descriptor and mangling failures of the command.
pub fn run_with_writer(cli: Cli, out: &mut dyn Write) -> Result<()> {
    let log_options = cli.log_options.resolved();
    logging::init_logging(&log_options);
    let start = Instant::now();
    logging::log_run_start(&cli.command, &log_options);
    let result = commands::dispatch_command(&cli.command, out);
    logging::log_run_complete(&cli.command, start.elapsed(), &result);
    result
}

pub fn report_error(err: &Error) {
    reporting::report_error(err);
}
