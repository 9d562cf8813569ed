//! Log configuration for the `cppmangle` binary.
//!
//! Encoders log under the `mangle.itanium` and `mangle.msvc` targets; the
//! CLI logs its run header and footer under `cli`.

use std::env;
use std::fmt::{self, Write};

/// Targets the encoders emit back-reference and result events under.
pub const MANGLE_TARGETS: &[&str] = &["mangle.itanium", "mangle.msvc"];

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Auto,
    Text,
    Json,
}

impl LogFormat {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "text" | "plain" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LogFormat::Auto => "auto",
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        };
        f.write_str(text)
    }
}

/// Logging verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.to_ascii_lowercase().as_str() {
            "error" | "err" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" | "verbose" => Some(Self::Trace),
            _ => None,
        }
    }

    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(text)
    }
}

/// Resolved log configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl LogOptions {
    pub const DEFAULT: Self = Self {
        format: LogFormat::Auto,
        level: LogLevel::Warn,
    };

    #[must_use]
    pub fn with_overrides(base: Self, overrides: LogSettings) -> Self {
        Self {
            format: overrides.format.unwrap_or(base.format),
            level: overrides.level.unwrap_or(base.level),
        }
    }

    /// Read `CPPMANGLE_LOG_FORMAT` and `CPPMANGLE_LOG_LEVEL`.
    #[must_use]
    pub fn from_env() -> Self {
        let format =
            env::var_os("CPPMANGLE_LOG_FORMAT").map(|value| value.to_string_lossy().to_string());
        let level =
            env::var_os("CPPMANGLE_LOG_LEVEL").map(|value| value.to_string_lossy().to_string());
        apply_env_overrides(Self::DEFAULT, format.as_deref(), level.as_deref())
    }

    #[must_use]
    pub fn resolved(self) -> Self {
        let format = match self.format {
            LogFormat::Auto => LogFormat::Text,
            other => other,
        };
        Self { format, ..self }
    }

    /// `EnvFilter` directive used when `RUST_LOG` is unset. Encoder events
    /// follow the requested level; everything else stays at `info` or quieter.
    #[must_use]
    pub fn filter_directive(&self) -> String {
        let base = self.level.min(LogLevel::Info);
        let mut directive = base.to_string();
        if self.level > base {
            for target in MANGLE_TARGETS {
                let _ = write!(directive, ",{target}={}", self.level);
            }
        }
        directive
    }
}

impl Default for LogOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Logging flags given on the command line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub format: Option<LogFormat>,
    pub level: Option<LogLevel>,
}

impl LogSettings {
    pub fn is_empty(&self) -> bool {
        self.format.is_none() && self.level.is_none()
    }

    #[must_use]
    pub fn merged_with_env(self) -> LogOptions {
        LogOptions::with_overrides(LogOptions::from_env(), self)
    }
}

fn apply_env_overrides(
    mut options: LogOptions,
    format: Option<&str>,
    level: Option<&str>,
) -> LogOptions {
    if let Some(spec) = format.and_then(LogFormat::parse) {
        options.format = spec;
    }
    if let Some(spec) = level.and_then(LogLevel::parse) {
        options.level = spec;
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_and_level_parse_expected_values() {
        assert_eq!(LogFormat::parse("text"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("invalid"), None);

        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("INFO"), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse("verbose"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("noop"), None);
    }

    #[test]
    fn env_values_override_defaults() {
        let opts = apply_env_overrides(LogOptions::DEFAULT, Some("json"), Some("debug"));
        assert_eq!(opts.format, LogFormat::Json);
        assert_eq!(opts.level, LogLevel::Debug);

        let ignored = apply_env_overrides(LogOptions::DEFAULT, Some("yaml"), None);
        assert_eq!(ignored, LogOptions::DEFAULT);
    }

    #[test]
    fn cli_settings_override_env() {
        let env_opts = apply_env_overrides(LogOptions::DEFAULT, Some("text"), Some("error"));
        let merged = LogOptions::with_overrides(
            env_opts,
            LogSettings {
                format: Some(LogFormat::Json),
                level: None,
            },
        );

        assert_eq!(merged.format, LogFormat::Json, "cli format overrides env");
        assert_eq!(merged.level, LogLevel::Error, "env level is preserved");
    }

    #[test]
    fn auto_format_resolves_to_text() {
        assert_eq!(LogOptions::DEFAULT.resolved().format, LogFormat::Text);
    }

    #[test]
    fn verbose_levels_only_widen_encoder_targets() {
        let trace = LogOptions {
            format: LogFormat::Text,
            level: LogLevel::Trace,
        };
        assert_eq!(
            trace.filter_directive(),
            "info,mangle.itanium=trace,mangle.msvc=trace"
        );
        assert_eq!(LogOptions::DEFAULT.filter_directive(), "warn");
    }
}
