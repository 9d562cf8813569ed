use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=GITHUB_SHA");

    if let Some(hash) = git_short_hash().or_else(env_git_hash) {
        println!("cargo:rustc-env=CPPMANGLE_GIT_HASH={hash}");
    }

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".into());
    println!("cargo:rustc-env=CPPMANGLE_BUILD_PROFILE={profile}");
    if let Ok(target) = env::var("TARGET") {
        println!("cargo:rustc-env=CPPMANGLE_BUILD_TARGET={target}");
    }
}

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    let trimmed = hash.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// CI checkouts without `.git` still export the commit.
fn env_git_hash() -> Option<String> {
    let full = env::var("GITHUB_SHA").ok()?;
    let short: String = full.trim().chars().take(9).collect();
    (!short.is_empty()).then_some(short)
}
