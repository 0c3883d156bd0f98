use std::fs;

use anyhow::{Context, Result};
use core_types::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `cfg.level`. When `cfg.file` is set a second,
/// non-blocking writer appends to it; keep the returned guard alive for the
/// life of the process or buffered lines are lost.
pub fn init_tracing_with_config(cfg: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.level))
        .with_context(|| format!("invalid log filter `{}`", cfg.level))?;

    let (file_writer, guard) = match &cfg.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            fs::create_dir_all(dir)
                .with_context(|| format!("creating log dir {}", dir.display()))?;
            let name = path
                .file_name()
                .with_context(|| format!("log file {} has no file name", path.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = if cfg.json {
        registry
            .with(fmt::layer().json())
            .with(file_writer.map(|w| fmt::layer().json().with_writer(w)))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false))
            .with(file_writer.map(|w| fmt::layer().with_ansi(false).with_writer(w)))
            .try_init()
    };
    installed.context("installing tracing subscriber")?;
    Ok(guard)
}
