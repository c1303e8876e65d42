use std::path::{Path, PathBuf};
use std::sync::Once;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "pluginmgr=info";

pub fn log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "pluginmgr")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("pluginmgr"))
}

/// Logs to a daily rolling file; the terminal belongs to the UI.
///
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn init_file_logging(dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::daily(dir, "pluginmgr.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(env_filter())
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install logger: {err}"))?;

    Ok(guard)
}

pub fn initialize_for_tests() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(env_filter())
            .try_init();
    });
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
