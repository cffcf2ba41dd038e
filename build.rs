//! Build script for taskfabric
//!
//! Embeds the git commit, build timestamp, target triple and profile so that
//! `taskfabric version` can report exactly what is running.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let git_hash = git_output(&["rev-parse", "--short=8", "HEAD"]);
    let git_dirty = git_output(&["status", "--porcelain"]);
    let git_dirty = if git_hash == "unknown" {
        "unknown"
    } else if git_dirty == "unknown" || git_dirty.is_empty() {
        "false"
    } else {
        "true"
    };

    let build_timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=FABRIC_GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=FABRIC_GIT_DIRTY={}", git_dirty);
    println!("cargo:rustc-env=FABRIC_BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=FABRIC_TARGET={}", target);
    println!("cargo:rustc-env=FABRIC_PROFILE={}", profile);
}

/// Run git with the given arguments and return trimmed stdout
fn git_output(args: &[&str]) -> String {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
