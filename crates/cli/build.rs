use std::env;
use std::process::Command;

/// Revision string for `hearth --version`.
///
/// Release tarballs carry no `.git`, so packagers can pin it with
/// `HEARTH_GIT_HASH`; otherwise ask git, marking dirty trees.
fn revision() -> String {
    if let Ok(pinned) = env::var("HEARTH_GIT_HASH") {
        if !pinned.trim().is_empty() {
            return pinned.trim().to_string();
        }
    }

    Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=7"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    println!("cargo:rerun-if-env-changed=HEARTH_GIT_HASH");
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/index");

    println!("cargo:rustc-env=GIT_COMMIT_HASH={}", revision());
    println!(
        "cargo:rustc-env=HEARTH_BUILD_PROFILE={}",
        env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string())
    );
}
