use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::io;

use crate::abi::MangleError;
use crate::cli::CliError;
use crate::symbols::DescriptorError;

/// Unified error type for the `cppmangle` binary and its drivers.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Cli(CliError),
    /// The descriptor file is not valid JSON or violates the symbol model.
    Descriptor(DescriptorError),
    Mangle(MangleError),
    Internal {
        message: String,
        backtrace: Option<Backtrace>,
    },
}

/// Convenience result alias used by the drivers.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Construct a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            backtrace: capture_backtrace(),
        }
    }

    /// Return the captured backtrace, if any.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            Error::Internal { backtrace, .. } => backtrace.as_ref(),
            _ => None,
        }
    }
}

fn capture_backtrace() -> Option<Backtrace> {
    if cfg!(debug_assertions) {
        Some(Backtrace::force_capture())
    } else {
        None
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::Cli(err) => write!(f, "{err}"),
            Error::Descriptor(err) => write!(f, "invalid descriptor: {err}"),
            Error::Mangle(err) => write!(f, "{err}"),
            Error::Internal { message, .. } => write!(f, "internal error: {message}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Cli(err) => Some(err),
            Error::Descriptor(err) => Some(err),
            Error::Mangle(err) => Some(err),
            Error::Internal { .. } => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<CliError> for Error {
    fn from(error: CliError) -> Self {
        Error::Cli(error)
    }
}

impl From<DescriptorError> for Error {
    fn from(error: DescriptorError) -> Self {
        Error::Descriptor(error)
    }
}

impl From<MangleError> for Error {
    fn from(error: MangleError) -> Self {
        Error::Mangle(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Descriptor(DescriptorError::new(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::MangleErrorKind;

    #[test]
    fn display_formats_variants() {
        let io_error = Error::from(io::Error::other("disk error"));
        assert_eq!(io_error.to_string(), "I/O error: disk error");

        let cli_error = Error::from(CliError::new("bad args"));
        assert_eq!(cli_error.to_string(), "bad args");

        let descriptor_error = Error::from(DescriptorError::new("dangling parent #7"));
        assert_eq!(
            descriptor_error.to_string(),
            "invalid descriptor: dangling parent #7"
        );

        let mangle_error = Error::from(MangleError::new(
            MangleErrorKind::UnsupportedType,
            "`int[]` cannot be mapped to C++",
        ));
        assert_eq!(mangle_error.to_string(), "`int[]` cannot be mapped to C++");

        let internal_error = Error::internal("panic");
        assert_eq!(internal_error.to_string(), "internal error: panic");
    }

    #[test]
    fn source_exposes_wrapped_errors() {
        let io_error = Error::from(io::Error::other("boom"));
        let source = io_error.source();
        assert!(source.is_some_and(|err| err.downcast_ref::<io::Error>().is_some()));

        let mangle_error = Error::from(MangleError::new(MangleErrorKind::NotMangleable, "nope"));
        let source = mangle_error.source();
        assert!(source.is_some_and(|err| err.downcast_ref::<MangleError>().is_some()));

        assert!(Error::internal("internal").source().is_none());
    }

    #[test]
    fn malformed_json_is_a_descriptor_error() {
        let parsed = serde_json::from_str::<serde_json::Value>("{");
        let err = match parsed {
            Ok(value) => panic!("expected Err, found Ok: {value}"),
            Err(err) => Error::from(err),
        };
        assert!(matches!(err, Error::Descriptor(_)));
    }

    #[test]
    fn debug_builds_capture_backtrace() {
        if cfg!(debug_assertions) {
            let err = Error::internal("capture");
            assert!(err.backtrace().is_some());
        }
    }
}
