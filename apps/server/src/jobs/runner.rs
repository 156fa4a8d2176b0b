//! Timer loop that drives a scheduled job until shutdown

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;
use tokio::{sync::watch, task::JoinHandle};

use super::schedule::{Clock, Schedule};
use crate::{metrics::JOB_RUNS_TOTAL, Result};

#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// Job name for logging and metrics
    fn name(&self) -> &str;

    fn schedule(&self) -> Schedule;

    /// Execute one tick. Errors are logged by the runner and never retried.
    async fn run(&self, now: DateTime<Utc>) -> Result<()>;
}

/// Run one tick and record its outcome.
pub async fn run_once(job: &dyn ScheduledJob, now: DateTime<Utc>) -> bool {
    match job.run(now).await {
        Ok(()) => {
            JOB_RUNS_TOTAL.with_label_values(&[job.name(), "ok"]).inc();
            tracing::debug!(job = job.name(), "Scheduled job finished");
            true
        }
        Err(e) => {
            JOB_RUNS_TOTAL.with_label_values(&[job.name(), "error"]).inc();
            tracing::error!(job = job.name(), "Scheduled job failed: {}", e);
            false
        }
    }
}

/// Spawn a loop that sleeps until each next firing and runs the job.
///
/// Runs are sequential per job: a run that outlasts the interval delays the
/// next computed tick.
pub fn spawn_scheduled(
    job: Arc<dyn ScheduledJob>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let schedule = job.schedule();
        tracing::info!(job = job.name(), schedule = %schedule, "Scheduled job registered");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = clock.now();
            let next = schedule.next_after(now, offset);
            let delay = (next - now).to_std().unwrap_or_default();
            tracing::debug!(job = job.name(), next = %next, "Waiting for next tick");

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            run_once(job.as_ref(), clock.now()).await;
        }

        tracing::info!(job = job.name(), "Scheduled job stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::schedule::FixedClock;
    use std::time::Duration;
    use tokio::sync::mpsc;

    struct Ticker {
        ticks: mpsc::UnboundedSender<DateTime<Utc>>,
        fail: bool,
    }

    #[async_trait]
    impl ScheduledJob for Ticker {
        fn name(&self) -> &str {
            "ticker"
        }

        fn schedule(&self) -> Schedule {
            Schedule::EveryMinutes(1)
        }

        async fn run(&self, now: DateTime<Utc>) -> Result<()> {
            let _ = self.ticks.send(now);
            if self.fail {
                Err(crate::Error::Internal("boom".to_string()))
            } else {
                Ok(())
            }
        }
    }

    /// 20ms before a minute boundary, so the first tick is almost immediate.
    fn clock() -> Arc<dyn Clock> {
        let now = DateTime::parse_from_rfc3339("2024-03-09T10:13:59.980Z")
            .unwrap()
            .with_timezone(&Utc);
        Arc::new(FixedClock(now))
    }

    #[tokio::test]
    async fn runs_ticks_and_stops_on_shutdown() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = spawn_scheduled(
            Arc::new(Ticker {
                ticks: tx,
                fail: true,
            }),
            clock(),
            FixedOffset::east_opt(0).unwrap(),
            stop_rx,
        );

        // Failures are swallowed: the loop keeps ticking.
        for _ in 0..2 {
            tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("tick within timeout")
                .expect("channel open");
        }

        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("runner stops")
            .unwrap();
    }

    #[tokio::test]
    async fn run_once_reports_outcome() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let ok = Ticker {
            ticks: tx.clone(),
            fail: false,
        };
        let failing = Ticker {
            ticks: tx,
            fail: true,
        };
        assert!(run_once(&ok, Utc::now()).await);
        assert!(!run_once(&failing, Utc::now()).await);
    }
}
