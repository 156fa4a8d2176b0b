//! Record collection routes
//!
//! Static sub-routes (`/search`, `/stats/count`, ...) take precedence over
//! `/:id` in the router, so record ids never shadow them.

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::api::handlers::{annual_reports, prescriptions, records, referral_slips};
use crate::models::{
    AnnualReports, HealthExaminations, PersonnelHealthCards, Prescriptions, RecordKind,
    ReferralSlips, SchoolHealthSurveys,
};
use crate::state::AppState;

/// Routes every collection shares.
pub fn record_routes<K: RecordKind>() -> Router<AppState> {
    Router::new()
        .route("/", post(records::create::<K>).get(records::list::<K>))
        .route("/mine", get(records::list_mine::<K>))
        .route("/deleted", get(records::list_deleted::<K>))
        .route("/search", get(records::search::<K>))
        .route("/stats/count", get(records::count::<K>))
        .route("/date-range", get(records::date_range::<K>))
        .route("/bulk", delete(records::bulk_delete::<K>))
        .route(
            "/:id",
            get(records::get::<K>)
                .put(records::update::<K>)
                .patch(records::update::<K>)
                .delete(records::delete::<K>),
        )
        .route("/:id/restore", patch(records::restore::<K>))
        .route("/:id/history", get(records::history::<K>))
}

pub fn referral_slip_routes() -> Router<AppState> {
    record_routes::<ReferralSlips>()
        .route("/pending-return", get(referral_slips::pending_return))
        .route("/completed", get(referral_slips::completed))
        .route("/referrer/:name", get(referral_slips::by_referrer))
        .route("/:id/return-slip", put(referral_slips::update_return_slip))
}

pub fn prescription_routes() -> Router<AppState> {
    record_routes::<Prescriptions>().route("/:id/export", get(prescriptions::export))
}

pub fn annual_report_routes() -> Router<AppState> {
    record_routes::<AnnualReports>().route("/auto-generate", post(annual_reports::auto_generate))
}

/// Every collection mounted under its URL segment.
pub fn collection_routes() -> Router<AppState> {
    Router::new()
        .nest("/referral-slips", referral_slip_routes())
        .nest("/prescriptions", prescription_routes())
        .nest("/health-examinations", record_routes::<HealthExaminations>())
        .nest("/personnel-health-cards", record_routes::<PersonnelHealthCards>())
        .nest("/school-health-surveys", record_routes::<SchoolHealthSurveys>())
        .nest("/annual-accomplishment-reports", annual_report_routes())
}
