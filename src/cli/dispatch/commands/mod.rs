use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::abi::{self, CppAbi, MangleConfig};
use crate::cli::{Cli, Command, OutputFormat};
use crate::error::{Error, Result};
use crate::symbols::SymbolTable;
use crate::target::Target;

pub(super) fn dispatch_command(command: &Command, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Mangle {
            descriptor,
            target,
            format,
        } => {
            let config = target
                .as_ref()
                .map_or_else(MangleConfig::default, MangleConfig::for_target);
            run_mangle(descriptor, &config, *format, out)
        }
        Command::Targets { format } => run_targets(*format, out),
        Command::Help { topic } => {
            let text = match topic {
                Some(topic) => Cli::help_for(topic)?,
                None => Cli::usage(),
            };
            write!(out, "{text}")?;
            Ok(())
        }
        Command::Version => {
            writeln!(out, "{}", crate::version::formatted())?;
            Ok(())
        }
    }
}

#[derive(Debug, Serialize)]
struct MangledSymbol {
    symbol: String,
    mangled: String,
}

/// Load, validate and mangle a descriptor. Nothing is written unless every
/// candidate mangles.
pub(super) fn run_mangle(
    descriptor: &Path,
    config: &MangleConfig,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    let text = fs::read_to_string(descriptor)?;
    let table: SymbolTable = serde_json::from_str(&text)?;
    table.validate()?;
    tracing::debug!(
        target: "cli",
        descriptor = %descriptor.display(),
        symbols = table.len(),
        abi = config.abi.as_str(),
        "loaded descriptor"
    );
    let symbols = abi::mangle_all(&table, config)?
        .into_iter()
        .map(|(id, mangled)| MangledSymbol {
            symbol: table.qualified_name(id),
            mangled,
        })
        .collect::<Vec<_>>();
    match format {
        OutputFormat::Text => {
            for entry in &symbols {
                writeln!(out, "{} {}", entry.symbol, entry.mangled)?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &symbols).map_err(io::Error::from)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct TargetRow {
    triple: &'static str,
    #[serde(flatten)]
    config: MangleConfig,
}

pub(super) fn run_targets(format: OutputFormat, out: &mut dyn Write) -> Result<()> {
    let mut rows = Vec::with_capacity(Target::KNOWN.len());
    for &triple in Target::KNOWN {
        let target = Target::parse(triple)
            .map_err(|err| Error::internal(format!("{triple}: {err}")))?;
        rows.push(TargetRow {
            triple,
            config: MangleConfig::for_target(&target),
        });
    }
    match format {
        OutputFormat::Text => {
            for row in &rows {
                writeln!(out, "{}", describe_target(row.triple, &row.config))?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &rows).map_err(io::Error::from)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// One table row: triple, ABI, pointer width, `long` and `long double` widths, symbol prefix.
pub(super) fn describe_target(triple: &str, config: &MangleConfig) -> String {
    let long_bits = if config.c_long_is_64 { 64 } else { 32 };
    let (long_double_bits, prefix) = match config.abi {
        CppAbi::Itanium => (
            if config.real_is_128 { 128 } else { 80 },
            if config.is_darwin { "__Z" } else { "_Z" },
        ),
        CppAbi::Msvc { .. } => (64, "?"),
    };
    format!(
        "{triple:26} {:8} {}-bit  long={long_bits:<3} long double={long_double_bits:<3} prefix={prefix}",
        config.abi.as_str(),
        config.pointer_width.bits(),
    )
}
