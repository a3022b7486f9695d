use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

use crate::errors::{ErrorType, PlaygroundError, Result};

const LOG_RETENTION_DAYS: i64 = 30;

/// Installs the global subscriber. With a log directory, events go to a
/// timestamped bunyan JSON file there; otherwise they are printed to stderr.
/// `RUST_LOG` overrides the default level. Keep the returned guard alive until
/// exit or buffered lines are lost.
pub fn init_logging(log_dir: Option<&Path>, debug: bool) -> Result<WorkerGuard> {
    LogTracer::init().map_err(|e| {
        PlaygroundError::new(ErrorType::ConfigError, format!("Could not bridge log records: {}", e))
    })?;

    let default_level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let guard = match log_dir {
        Some(dir) => {
            let log_file = get_log_location(dir)?;
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_file)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let formatter = BunyanFormattingLayer::new("playbox".into(), non_blocking);
            let subscriber = Registry::default()
                .with(env_filter)
                .with(JsonStorageLayer)
                .with(formatter);
            tracing::subscriber::set_global_default(subscriber).map_err(subscriber_error)?;
            guard
        }
        None => {
            let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
            let subscriber = Registry::default().with(env_filter).with(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_target(false),
            );
            tracing::subscriber::set_global_default(subscriber).map_err(subscriber_error)?;
            guard
        }
    };
    Ok(guard)
}

fn subscriber_error(e: tracing::subscriber::SetGlobalDefaultError) -> PlaygroundError {
    PlaygroundError::new(ErrorType::ConfigError, format!("Could not install logger: {}", e))
}

fn get_log_location(log_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)?;
    clean_logfiles(log_dir)?;
    let timestamp = Utc::now().format("%Y-%m-%d-%H-%M-%S");
    Ok(log_dir.join(format!("playbox-{}.log", timestamp)))
}

fn clean_logfiles(log_dir: &Path) -> Result<()> {
    // Only our own logs; the directory may be shared.
    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !(name.starts_with("playbox-") && name.ends_with(".log")) {
            continue;
        }
        let modified: chrono::DateTime<Utc> = entry.metadata()?.modified()?.into();
        if Utc::now().signed_duration_since(modified).num_days() > LOG_RETENTION_DAYS {
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}
