use asset_relocator::config::AppConfig;
use std::env;
use std::path::Path;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Builds the filter from `TRACING_LEVEL` when set, otherwise from the configured level. The
/// configured level applies to this crate's targets; everything else logs warnings.
fn build_filter(config: &AppConfig) -> EnvFilter {
    match env::var("TRACING_LEVEL") {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => EnvFilter::new(format!("warn,asset_relocator={}", config.log_level)),
    }
}

pub fn init_logger(config: &AppConfig) -> WorkerGuard {
    let log_file = env::var("LOG_FILE_PATH").unwrap_or_else(|_| config.log_file.clone());
    let log_path = Path::new(&log_file);
    let directory = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "relocator.log".into());

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false)
                .without_time()
                .with_ansi(true),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(build_filter(config))
        .init();

    info!("Relocator log file: {}", log_file);

    guard
}
