//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout stays clean for answers and search results.
//! The level comes from `[logging].level`; `RUST_LOG` overrides it.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Call once, early in `main`.
pub fn init(level: &str) -> Result<()> {
    let default_level = parse_log_level(level)?;

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {}", level),
    }
}
