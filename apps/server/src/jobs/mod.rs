//! Scheduled maintenance jobs
//!
//! Each job is an explicit task with an injected clock and storage handles,
//! driven by [`spawn_scheduled`] until the shutdown channel flips.

mod cleanup;
mod keep_alive;
mod runner;
mod schedule;

pub use cleanup::CleanupJob;
pub use keep_alive::KeepAliveJob;
pub use runner::{run_once, spawn_scheduled, ScheduledJob};
pub use schedule::{Clock, FixedClock, Schedule, ScheduleError, SystemClock};

use chrono::FixedOffset;
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle};

use crate::{config::MaintenanceConfig, state::AppState, Error, Result};

/// Spawn the configured maintenance jobs. Returns their handles.
pub fn spawn_maintenance(
    state: &AppState,
    config: &MaintenanceConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<Vec<JoinHandle<()>>> {
    if !config.enabled {
        tracing::info!("Scheduled maintenance disabled");
        return Ok(Vec::new());
    }

    let offset = FixedOffset::east_opt(config.timezone_offset_hours * 3600).ok_or_else(|| {
        Error::BadRequest(format!(
            "Invalid timezone offset: {} hours",
            config.timezone_offset_hours
        ))
    })?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let parse = |expr: &str| {
        Schedule::parse(expr).map_err(|e| Error::BadRequest(format!("Invalid schedule '{expr}': {e}")))
    };

    let mut handles = Vec::new();

    let cleanup = CleanupJob::new(
        state.notification_store.clone(),
        state.audit_store.clone(),
        config.retention_days,
        parse(&config.cleanup_schedule)?,
    );
    handles.push(spawn_scheduled(
        Arc::new(cleanup),
        clock.clone(),
        offset,
        shutdown.clone(),
    ));

    if config.keep_alive_enabled && !config.keep_alive_url.trim().is_empty() {
        let keep_alive = KeepAliveJob::new(
            config.keep_alive_url.clone(),
            Duration::from_secs(config.keep_alive_timeout_seconds),
            parse(&config.keep_alive_schedule)?,
        )?;
        handles.push(spawn_scheduled(
            Arc::new(keep_alive),
            clock,
            offset,
            shutdown,
        ));
    }

    tracing::info!(jobs = handles.len(), "Scheduled maintenance started");
    Ok(handles)
}
