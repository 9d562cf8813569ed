use std::fmt;

use serde::Serialize;

use crate::target::{Target, TargetArch, TargetEnv, TargetOs};

/// C++ ABI family the encoder targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "family")]
pub enum CppAbi {
    Itanium,
    /// Microsoft Visual C++; `dmc` selects the Digital Mars dialect.
    Msvc { dmc: bool },
}

impl CppAbi {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CppAbi::Itanium => "itanium",
            CppAbi::Msvc { dmc: false } => "msvc",
            CppAbi::Msvc { dmc: true } => "dmc",
        }
    }
}

impl fmt::Display for CppAbi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerWidth {
    Bits32,
    Bits64,
}

impl PointerWidth {
    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            PointerWidth::Bits32 => 32,
            PointerWidth::Bits64 => 64,
        }
    }
}

/// Static, per-target mangling configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MangleConfig {
    pub abi: CppAbi,
    pub pointer_width: PointerWidth,
    /// Native `long` is 64 bits wide (`l`/`m` instead of `x`/`y`).
    pub c_long_is_64: bool,
    /// Native `long double` is a 128-bit quad (`g` instead of `e`).
    pub real_is_128: bool,
    /// Mach-O symbols carry an extra leading underscore.
    pub is_darwin: bool,
}

impl MangleConfig {
    #[must_use]
    pub fn itanium_linux64() -> Self {
        Self {
            abi: CppAbi::Itanium,
            pointer_width: PointerWidth::Bits64,
            c_long_is_64: true,
            real_is_128: false,
            is_darwin: false,
        }
    }

    #[must_use]
    pub fn msvc64() -> Self {
        Self {
            abi: CppAbi::Msvc { dmc: false },
            pointer_width: PointerWidth::Bits64,
            c_long_is_64: false,
            real_is_128: false,
            is_darwin: false,
        }
    }

    #[must_use]
    pub fn msvc32() -> Self {
        Self {
            pointer_width: PointerWidth::Bits32,
            ..Self::msvc64()
        }
    }

    #[must_use]
    pub fn dmc32() -> Self {
        Self {
            abi: CppAbi::Msvc { dmc: true },
            ..Self::msvc32()
        }
    }

    /// Derive the configuration a compiler for `target` would use.
    #[must_use]
    pub fn for_target(target: &Target) -> Self {
        let pointer_width = match target.arch() {
            TargetArch::X86 => PointerWidth::Bits32,
            TargetArch::X86_64 | TargetArch::Aarch64 => PointerWidth::Bits64,
        };
        let windows = matches!(target.os(), TargetOs::Windows);
        let abi = if windows {
            CppAbi::Msvc {
                dmc: matches!(target.env(), TargetEnv::Dmc),
            }
        } else {
            CppAbi::Itanium
        };
        let is_darwin = matches!(target.os(), TargetOs::Macos);
        Self {
            abi,
            pointer_width,
            c_long_is_64: pointer_width == PointerWidth::Bits64 && !windows,
            real_is_128: target.arch() == TargetArch::Aarch64 && !windows && !is_darwin,
            is_darwin,
        }
    }

    #[must_use]
    pub fn is_64bit(&self) -> bool {
        self.pointer_width == PointerWidth::Bits64
    }

    #[must_use]
    pub fn is_dmc(&self) -> bool {
        matches!(self.abi, CppAbi::Msvc { dmc: true })
    }
}

impl Default for MangleConfig {
    fn default() -> Self {
        Self::for_target(&Target::host())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(triple: &str) -> MangleConfig {
        match Target::parse(triple) {
            Ok(target) => MangleConfig::for_target(&target),
            Err(err) => panic!("expected Ok target for {triple}, found Err: {err}"),
        }
    }

    #[test]
    fn linux_x86_64_uses_itanium_with_64bit_long() {
        assert_eq!(config("x86_64-unknown-linux-gnu"), MangleConfig::itanium_linux64());
    }

    #[test]
    fn darwin_keeps_itanium_but_flags_prefix() {
        let cfg = config("aarch64-apple-darwin");
        assert_eq!(cfg.abi, CppAbi::Itanium);
        assert!(cfg.is_darwin);
        assert!(!cfg.real_is_128);
    }

    #[test]
    fn aarch64_linux_has_quad_long_double() {
        assert!(config("aarch64-unknown-linux-gnu").real_is_128);
    }

    #[test]
    fn windows_targets_select_msvc_flavours() {
        assert_eq!(config("x86_64-pc-windows-msvc"), MangleConfig::msvc64());
        assert_eq!(config("i686-pc-windows-msvc"), MangleConfig::msvc32());
        assert_eq!(config("i686-pc-windows-dmc"), MangleConfig::dmc32());
        assert_eq!(config("x86-pc-windows-omf").abi.as_str(), "dmc");
    }
}
