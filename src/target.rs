//! Target triples and the properties of them that affect C++ symbol names.

use std::env;
use std::fmt;

/// Supported architecture families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetArch {
    X86,
    X86_64,
    Aarch64,
}

impl TargetArch {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "x86" | "i386" | "i486" | "i586" | "i686" => Some(TargetArch::X86),
            "x86_64" | "amd64" => Some(TargetArch::X86_64),
            "aarch64" | "arm64" => Some(TargetArch::Aarch64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TargetArch::X86 => "i686",
            TargetArch::X86_64 => "x86_64",
            TargetArch::Aarch64 => "aarch64",
        }
    }
}

/// Supported operating systems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOs {
    Macos,
    Linux,
    FreeBsd,
    Windows,
    None,
    Other(String),
}

impl TargetOs {
    pub fn parse(token: &str) -> Self {
        match token {
            "darwin" | "macos" | "ios" => TargetOs::Macos,
            "linux" => TargetOs::Linux,
            "freebsd" => TargetOs::FreeBsd,
            "windows" | "win32" | "win" => TargetOs::Windows,
            "none" | "unknown" => TargetOs::None,
            other => TargetOs::Other(other.to_string()),
        }
    }

    fn triple_component(&self) -> &str {
        match self {
            TargetOs::Macos => "darwin",
            TargetOs::Linux => "linux",
            TargetOs::FreeBsd => "freebsd",
            TargetOs::Windows => "windows",
            TargetOs::None => "none",
            TargetOs::Other(value) => value.as_str(),
        }
    }
}

/// Toolchain environment, the fourth triple component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetEnv {
    Gnu,
    Msvc,
    /// Digital Mars C++ (OMF object files).
    Dmc,
    None,
    Other(String),
}

impl TargetEnv {
    pub fn parse(token: &str) -> Self {
        match token {
            "gnu" | "gnueabihf" | "musl" => TargetEnv::Gnu,
            "msvc" => TargetEnv::Msvc,
            "dmc" | "omf" => TargetEnv::Dmc,
            "" | "none" => TargetEnv::None,
            other => TargetEnv::Other(other.to_string()),
        }
    }

    fn triple_component(&self) -> Option<&str> {
        match self {
            TargetEnv::Gnu => Some("gnu"),
            TargetEnv::Msvc => Some("msvc"),
            TargetEnv::Dmc => Some("dmc"),
            TargetEnv::None => None,
            TargetEnv::Other(value) => Some(value.as_str()),
        }
    }
}

/// Target triple description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    arch: TargetArch,
    os: TargetOs,
    env: TargetEnv,
    triple: String,
}

impl Target {
    /// Triples listed by `cppmangle targets`.
    pub const KNOWN: &'static [&'static str] = &[
        "x86_64-unknown-linux-gnu",
        "aarch64-unknown-linux-gnu",
        "x86_64-unknown-freebsd",
        "x86_64-apple-darwin",
        "aarch64-apple-darwin",
        "x86_64-pc-windows-msvc",
        "i686-pc-windows-msvc",
        "i686-pc-windows-dmc",
    ];

    /// Construct the target representing the current host.
    #[must_use]
    pub fn host() -> Self {
        let arch = TargetArch::parse(env::consts::ARCH).unwrap_or(TargetArch::X86_64);
        let os = TargetOs::parse(env::consts::OS);
        let env = match os {
            TargetOs::Windows => TargetEnv::Msvc,
            TargetOs::Linux => TargetEnv::Gnu,
            _ => TargetEnv::None,
        };
        Self::from_components(arch, os, env)
    }

    /// Parse a target triple or bare architecture name.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::Empty`] when the input is blank or comprised of
    /// whitespace, and [`TargetError::UnsupportedArch`] when the architecture
    /// prefix is not recognised.
    pub fn parse(spec: &str) -> Result<Self, TargetError> {
        let trimmed = spec.trim().to_ascii_lowercase();
        if trimmed.is_empty() {
            return Err(TargetError::Empty);
        }

        let mut parts = trimmed.splitn(2, '-');
        let arch_token = parts.next().unwrap_or_default();
        let arch = TargetArch::parse(arch_token)
            .ok_or_else(|| TargetError::UnsupportedArch(arch_token.to_string()))?;

        let Some(rest) = parts.next() else {
            return Ok(Self::from_components(arch, TargetOs::None, TargetEnv::None));
        };
        let mut rest_iter = rest.split('-');
        let vendor = rest_iter.next().unwrap_or_default();
        let os_token = rest_iter.next().unwrap_or("none");
        let mut env_token = rest_iter.next();
        let os = TargetOs::parse(os_token);
        if env_token.is_none() && matches!(os, TargetOs::Linux) {
            env_token = Some("gnu");
        }
        let env = env_token.map_or(TargetEnv::None, TargetEnv::parse);
        let triple = if let Some(env) = env_token {
            format!("{arch_token}-{vendor}-{os_token}-{env}")
        } else {
            format!("{arch_token}-{vendor}-{os_token}")
        };
        Ok(Self {
            arch,
            os,
            env,
            triple,
        })
    }

    /// Construct a target from explicit components.
    #[must_use]
    pub fn from_components(arch: TargetArch, os: TargetOs, env: TargetEnv) -> Self {
        let vendor = match os {
            TargetOs::Macos => "apple",
            TargetOs::Windows => "pc",
            TargetOs::Linux | TargetOs::FreeBsd | TargetOs::None | TargetOs::Other(_) => "unknown",
        };
        let os_component = os.triple_component();
        let triple = if let Some(env) = env.triple_component() {
            format!("{}-{}-{}-{}", arch.as_str(), vendor, os_component, env)
        } else {
            format!("{}-{}-{}", arch.as_str(), vendor, os_component)
        };
        Self {
            arch,
            os,
            env,
            triple,
        }
    }

    /// Return the architecture family.
    #[must_use]
    pub fn arch(&self) -> TargetArch {
        self.arch
    }

    /// Return the target operating system.
    #[must_use]
    pub fn os(&self) -> &TargetOs {
        &self.os
    }

    /// Return the toolchain environment.
    #[must_use]
    pub fn env(&self) -> &TargetEnv {
        &self.env
    }

    /// Return the canonical triple for this target.
    #[must_use]
    pub fn triple(&self) -> &str {
        &self.triple
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::host()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.triple)
    }
}

/// Errors encountered while parsing a target specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    Empty,
    UnsupportedArch(String),
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetError::Empty => write!(f, "target string must not be empty"),
            TargetError::UnsupportedArch(arch) => {
                write!(
                    f,
                    "unsupported architecture '{arch}'; expected one of i686, x86_64, amd64, aarch64, arm64"
                )
            }
        }
    }
}

impl std::error::Error for TargetError {}
