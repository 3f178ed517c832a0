use std::io;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    prelude::*,
    EnvFilter,
};

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug,clinic_booking_backend=trace,actix_web=debug,sled=info"
    } else {
        "info,clinic_booking_backend=info,actix_web=info,sled=warn"
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the verbosity flag.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(verbose)))?;

    let use_ansi = atty::is(atty::Stream::Stdout);
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_ansi(use_ansi)
        .with_file(true)
        .with_line_number(true)
        .with_writer(io::stdout);

    // actix's request logger emits `log` records
    let _ = tracing_log::LogTracer::init();

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();

    tracing::info!("PID={} starting up", std::process::id());
    Ok(())
}

/// Values baked in by the build script; absent when built without it.
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub timestamp: &'static str,
    pub git_branch: &'static str,
    pub git_sha: &'static str,
    pub rustc: &'static str,
    pub target: &'static str,
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        description: option_env!("APP_PKG_DESCRIPTION").unwrap_or(""),
        timestamp: option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
        git_branch: option_env!("VERGEN_GIT_BRANCH").unwrap_or("no-git"),
        git_sha: option_env!("VERGEN_GIT_SHA").unwrap_or("00000000"),
        rustc: option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown"),
        target: option_env!("APP_BUILD_TARGET").unwrap_or("unknown"),
    }
}

pub fn print_build_info() {
    let info = build_info();
    let commit: String = info.git_sha.chars().take(8).collect();

    println!("{}", "═".repeat(60));
    println!("{} v{}", info.name, info.version);
    if !info.description.is_empty() {
        println!("Description: {}", info.description);
    }
    println!("{}", "─".repeat(60));
    println!("Build: {} ({})", info.timestamp, info.target);
    println!("Git: {} ({})", info.git_branch, commit);
    println!("Rust: {}", info.rustc);
    println!("{}", "═".repeat(60));
    println!();
}

pub fn log_server_startup(host: &str, port: u16, environment: &str) {
    tracing::info!("🚀 Server starting on http://{}:{} ({})", host, port, environment);
}

pub fn log_command_start(command: &str, description: &str) {
    tracing::info!("⚡ Executing: {} ({})", command, description);
}

pub fn log_command_complete(command: &str, success: bool, duration: std::time::Duration) {
    if success {
        tracing::info!("✅ Command '{}' completed in {:.2?}", command, duration);
    } else {
        tracing::error!("❌ Command '{}' failed after {:.2?}", command, duration);
    }
}
