use crate::target::Target;

use super::super::{CliError, OutputFormat};

pub(crate) fn is_help_flag(value: &str) -> bool {
    matches!(value, "-h" | "--help")
}

/// Split `--flag=value` or take the next argument as the value.
pub(crate) fn take_value<I>(
    flag: &str,
    inline: Option<&str>,
    iter: &mut I,
) -> Result<String, CliError>
where
    I: Iterator<Item = String>,
{
    match inline {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        Some(_) => Err(CliError::with_usage(format!("expected value after {flag}"))),
        None => iter
            .next()
            .ok_or_else(|| CliError::with_usage(format!("expected value after {flag}"))),
    }
}

pub(crate) fn parse_output_format(value: &str) -> Result<OutputFormat, CliError> {
    OutputFormat::parse(value).ok_or_else(|| {
        CliError::with_usage(format!(
            "unsupported output format '{value}'; expected text or json"
        ))
    })
}

pub(crate) fn parse_target(value: &str) -> Result<Target, CliError> {
    Target::parse(value).map_err(|err| CliError::with_usage(err.to_string()))
}
