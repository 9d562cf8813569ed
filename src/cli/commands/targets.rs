use super::super::{Cli, CliError, Command, OutputFormat};
use super::common::{is_help_flag, parse_output_format, take_value};

pub(super) fn parse(args: Vec<String>) -> Result<Cli, CliError> {
    let mut format = OutputFormat::default();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if is_help_flag(&arg) {
            return Ok(Cli::with_env_logging(Command::Help {
                topic: Some("targets".into()),
            }));
        }
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg.clone(), None),
        };
        if flag != "--format" {
            return Err(CliError::with_usage(format!(
                "unsupported argument '{arg}' for targets"
            )));
        }
        let value = take_value(&flag, inline.as_deref(), &mut iter)?;
        format = parse_output_format(&value)?;
    }
    Ok(Cli::with_env_logging(Command::Targets { format }))
}
