use std::io::{self, Write};

use crate::error::Error;

pub(super) fn report_error(err: &Error) {
    let mut out = io::stderr();
    if let Err(io_err) = report_error_to(err, &mut out) {
        let _ = writeln!(io::stderr(), "failed to report error: {io_err}");
    }
}

/// `error: <message>`, with the failure kind for mangling errors.
pub(super) fn report_error_to(err: &Error, out: &mut dyn Write) -> io::Result<()> {
    match err {
        Error::Mangle(mangle) => writeln!(out, "error[{}]: {mangle}", mangle.kind()),
        Error::Internal {
            backtrace: Some(backtrace),
            ..
        } => {
            writeln!(out, "error: {err}")?;
            writeln!(out, "{backtrace}")
        }
        _ => writeln!(out, "error: {err}"),
    }
}
