//! Logging initialization
//!
//! Console output is JSON or human-readable; an optional rotating file layer
//! uses a non-blocking writer. `RUST_LOG` overrides the configured level.

use std::fs;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Keeps the file writer flushing until dropped.
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<LoggingGuard> {
    let subscriber = tracing_subscriber::registry().with(build_env_filter(config));

    let file_guard = if config.json {
        let console_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stdout);

        if config.file_enabled {
            let (writer, guard) = create_file_appender(config)?;
            let file_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(writer);
            subscriber.with(console_layer).with(file_layer).try_init()?;
            Some(guard)
        } else {
            subscriber.with(console_layer).try_init()?;
            None
        }
    } else {
        let console_layer = fmt::layer().with_target(true).with_writer(std::io::stdout);

        if config.file_enabled {
            let (writer, guard) = create_file_appender(config)?;
            let file_layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer);
            subscriber.with(console_layer).with(file_layer).try_init()?;
            Some(guard)
        } else {
            subscriber.with(console_layer).try_init()?;
            None
        }
    };

    tracing::info!(
        service_name = %config.service_name,
        environment = %config.deployment_environment,
        json = config.json,
        file = config.file_enabled,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn build_env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "school_health={},school_health_server={},tower_http=info,sqlx=warn",
            config.level, config.level
        ))
    })
}

fn create_file_appender(config: &LoggingConfig) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&config.file_directory)?;

    let appender = match config.file_rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.file_directory, &config.file_prefix),
        "minutely" => {
            tracing_appender::rolling::minutely(&config.file_directory, &config.file_prefix)
        }
        "never" => tracing_appender::rolling::never(
            &config.file_directory,
            format!("{}.log", config.file_prefix),
        ),
        _ => tracing_appender::rolling::daily(&config.file_directory, &config.file_prefix),
    };

    Ok(tracing_appender::non_blocking(appender))
}
