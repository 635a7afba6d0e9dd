use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::model::LogConfig;

// Stdout belongs to the terminal UI, so logs go to a daily rolling file.
// Keep the guard alive for as long as logs should be flushed.
pub fn init_logging(cfg: &LogConfig) -> Result<WorkerGuard> {
    let dir = PathBuf::from(&cfg.dir);
    std::fs::create_dir_all(&dir).with_context(|| format!("creating log dir {dir:?}"))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(cfg.file_prefix.as_str())
        .filename_suffix("log")
        .build(&dir)
        .context("creating log file appender")?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let directive =
        Directive::from_str(&cfg.level).with_context(|| format!("invalid log level {}", cfg.level))?;
    let filter = EnvFilter::from_default_env().add_directive(directive);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .context("installing tracing subscriber")?;
    Ok(guard)
}
