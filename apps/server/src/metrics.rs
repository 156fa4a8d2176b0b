//! Prometheus metrics for the health records server

use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static! {
    /// Total HTTP requests by method, route, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "shr_http_requests_total",
        "Total number of HTTP requests",
        &["method", "route", "status"]
    )
    .expect("Failed to register HTTP_REQUESTS_TOTAL");

    /// Record mutations by collection and action
    pub static ref RECORD_MUTATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "shr_record_mutations_total",
        "Total number of record mutations",
        &["collection", "action"]
    )
    .expect("Failed to register RECORD_MUTATIONS_TOTAL");

    /// Notifications emitted, by kind and delivery outcome
    pub static ref NOTIFICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "shr_notifications_total",
        "Total number of notifications emitted",
        &["kind", "outcome"]
    )
    .expect("Failed to register NOTIFICATIONS_TOTAL");

    /// Scheduled job runs by job name and outcome
    pub static ref JOB_RUNS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "shr_job_runs_total",
        "Total number of scheduled job runs",
        &["job", "outcome"]
    )
    .expect("Failed to register JOB_RUNS_TOTAL");

    /// Rows removed by the retention cleanup, by table
    pub static ref PURGED_ROWS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "shr_purged_rows_total",
        "Total number of rows purged by retention cleanup",
        &["table"]
    )
    .expect("Failed to register PURGED_ROWS_TOTAL");
}

/// Collapse concrete ids into a route template so label cardinality stays bounded.
///
/// `/api/referral-slips/RS-20240115-AB12CD/restore` → `/api/referral-slips/:id/restore`
pub fn route_template(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            // Third segment under /api/<kind>/ is the record id unless it is a known sub-route.
            if i == 3
                && segments.get(1) == Some(&"api")
                && !matches!(
                    *segment,
                    "search"
                        | "stats"
                        | "date-range"
                        | "bulk"
                        | "mine"
                        | "deleted"
                        | "pending-return"
                        | "completed"
                        | "referrer"
                        | "auto-generate"
                )
            {
                ":id"
            } else if i == 4 && segments.get(3) == Some(&"referrer") {
                ":name"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_record_ids() {
        assert_eq!(
            route_template("/api/referral-slips/RS-20240115-AB12CD/restore"),
            "/api/referral-slips/:id/restore"
        );
        assert_eq!(
            route_template("/api/referral-slips/search"),
            "/api/referral-slips/search"
        );
        assert_eq!(
            route_template("/api/referral-slips/referrer/Dr.%20Santos"),
            "/api/referral-slips/referrer/:name"
        );
        assert_eq!(route_template("/health"), "/health");
    }
}
