//! Build-time metadata reported by `cppmangle --version`.

/// Short git hash determined at compile time when available.
#[must_use]
pub fn commit_hash() -> &'static str {
    option_env!("CPPMANGLE_GIT_HASH").unwrap_or("unknown")
}

/// Cargo build profile associated with the binary.
#[must_use]
pub fn build_profile() -> &'static str {
    option_env!("CPPMANGLE_BUILD_PROFILE").unwrap_or("unknown")
}

/// Triple the binary was compiled for.
#[must_use]
pub fn build_target() -> &'static str {
    option_env!("CPPMANGLE_BUILD_TARGET").unwrap_or("unknown")
}

/// Render a scripting-friendly version string.
#[must_use]
pub fn formatted() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!(
        "cppmangle {version}\ncommit: {}\nprofile: {}\ntarget: {}",
        commit_hash(),
        build_profile(),
        build_target()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_includes_required_fields() {
        let version = formatted();
        assert!(version.starts_with("cppmangle "));
        assert!(version.contains("\ncommit: "));
        assert!(version.contains("\nprofile: "));
        assert!(version.contains("\ntarget: "));
    }
}
