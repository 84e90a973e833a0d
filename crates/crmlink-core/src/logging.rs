//! Structured logging for crmlink: an append-only file in the XDG state
//! directory, with stderr as the fallback when the file cannot be opened.
//!
//! The filter comes from `CRMLINK_LOG`, then `RUST_LOG`, then
//! [`DEFAULT_FILTER`]. Webhook URLs carry a secret token, so nothing in the
//! crate logs them whole; only hosts and method names appear.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a crmlink-specific filter directive.
pub const LOG_ENV: &str = "CRMLINK_LOG";

pub const DEFAULT_FILTER: &str = "info,crmlink=debug,crmlink_core=debug";

/// Path of the log file: `~/.local/state/crmlink/crmlink.log`.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("crmlink")?;
    Ok(xdg_dirs.get_state_home().join("crmlink").join("crmlink.log"))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the file subscriber. Returns Err if the log file cannot be opened
/// or a subscriber is already installed; callers then use
/// [`init_logging_stderr`].
pub fn init_logging() -> Result<()> {
    let path = log_file_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create log dir: {}", dir.display()))?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file: {}", path.display()))?;

    // Mutex<File> is a MakeWriter; every event takes the lock for one write.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_names(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install subscriber: {e}"))?;

    tracing::info!(path = %path.display(), "crmlink logging initialized");
    Ok(())
}

/// Log to stderr only. Never fails; a second install is ignored.
pub fn init_logging_stderr() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_lives_under_crmlink_state_dir() {
        let path = log_file_path().unwrap();
        assert!(path.ends_with("crmlink/crmlink.log"));
    }

    #[test]
    fn default_filter_parses() {
        assert!(DEFAULT_FILTER.parse::<EnvFilter>().is_ok());
    }
}
