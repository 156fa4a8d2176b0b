//! Periodic self-ping that keeps an idling host awake

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use super::{runner::ScheduledJob, schedule::Schedule};
use crate::{Error, Result};

pub struct KeepAliveJob {
    client: reqwest::Client,
    url: String,
    schedule: Schedule,
}

impl KeepAliveJob {
    pub fn new(url: String, timeout: Duration, schedule: Schedule) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("school-health/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build keep-alive client: {e}")))?;
        Ok(Self {
            client,
            url,
            schedule,
        })
    }
}

#[async_trait]
impl ScheduledJob for KeepAliveJob {
    fn name(&self) -> &str {
        "keep_alive"
    }

    fn schedule(&self) -> Schedule {
        self.schedule
    }

    async fn run(&self, _now: DateTime<Utc>) -> Result<()> {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    tracing::info!(url = %self.url, status = status.as_u16(), "Keep-alive ping");
                } else {
                    tracing::warn!(url = %self.url, status = status.as_u16(), "Keep-alive ping returned non-success");
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(url = %self.url, "Keep-alive ping failed: {}", e);
                Err(Error::Internal(format!("keep-alive request failed: {e}")))
            }
        }
    }
}
