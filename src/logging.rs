use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

pub const LOG_FILE: &str = "holotape.log";

/// Console level for the `-q`/`-v` count. Results go to stdout, so the
/// console only shows warnings unless asked for more.
pub fn console_level(verbosity: i8) -> LevelFilter {
    match verbosity {
        i8::MIN..=-1 => LevelFilter::ERROR,
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Console output on stderr filtered by verbosity (`RUST_LOG` wins when
/// set), plus a debug-level log appended under `log_dir`.
pub fn init(log_dir: &Path, verbosity: i8) -> Result<PathBuf> {
    fs::create_dir_all(log_dir).context("create log dir")?;
    let log_path = log_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("open log file")?;

    let console_filter = EnvFilter::builder()
        .with_default_directive(console_level(verbosity).into())
        .from_env_lossy();
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(console_filter);
    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_filter(EnvFilter::new("holotape=debug"));

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .context("install log subscriber")?;
    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(console_level(-1), LevelFilter::ERROR);
        assert_eq!(console_level(0), LevelFilter::WARN);
        assert_eq!(console_level(1), LevelFilter::INFO);
        assert_eq!(console_level(2), LevelFilter::DEBUG);
        assert_eq!(console_level(9), LevelFilter::TRACE);
    }
}
