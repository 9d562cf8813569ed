use super::super::{Cli, CliError, Command, OutputFormat};
use super::common::{is_help_flag, parse_output_format, parse_target, take_value};

pub(super) fn parse(args: Vec<String>) -> Result<Cli, CliError> {
    if args.iter().any(|value| is_help_flag(value)) {
        return Ok(Cli::with_env_logging(Command::Help {
            topic: Some("mangle".into()),
        }));
    }

    let mut descriptor = None;
    let mut target = None;
    let mut format = OutputFormat::default();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if arg.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        match flag.as_str() {
            "-t" | "--target" => {
                let value = take_value(&flag, inline.as_deref(), &mut iter)?;
                target = Some(parse_target(&value)?);
            }
            "--format" => {
                let value = take_value(&flag, inline.as_deref(), &mut iter)?;
                format = parse_output_format(&value)?;
            }
            other if other.starts_with('-') => {
                return Err(CliError::with_usage(format!(
                    "unsupported option '{other}' for mangle"
                )));
            }
            _ if descriptor.is_some() => {
                return Err(CliError::with_usage(
                    "mangle accepts exactly one <descriptor.json> argument",
                ));
            }
            _ => {
                if arg.trim().is_empty() {
                    return Err(CliError::with_usage("descriptor path must not be empty"));
                }
                descriptor = Some(arg.into());
            }
        }
    }

    let Some(descriptor) = descriptor else {
        return Err(CliError::with_usage(
            "mangle requires <descriptor.json> argument",
        ));
    };
    Ok(Cli::with_env_logging(Command::Mangle {
        descriptor,
        target,
        format,
    }))
}
