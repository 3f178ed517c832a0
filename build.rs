use std::{env, process::Command};
use vergen::EmitBuilder;

fn main() {
    // Build & cargo info always; git metadata only inside a worktree with a HEAD
    let mut emit_builder = EmitBuilder::builder();
    emit_builder.all_build().all_cargo();

    let has_head = Command::new("git")
        .args(["rev-parse", "--verify", "HEAD"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    if has_head {
        emit_builder.all_git();
    }

    if let Err(err) = emit_builder.emit() {
        println!("cargo:warning=build info unavailable: {err}");
    }

    if let Ok(desc) = env::var("CARGO_PKG_DESCRIPTION") {
        println!("cargo:rustc-env=APP_PKG_DESCRIPTION={desc}");
    }

    let os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    println!("cargo:rustc-env=APP_BUILD_TARGET={os}-{arch}");
}
