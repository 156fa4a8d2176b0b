//! Business logic services

pub mod annual_reports;
pub mod audit;
pub mod export;
pub mod notifications;
pub mod records;
pub mod referral_slips;

pub use annual_reports::ReportSources;
pub use audit::AuditService;
pub use export::{render_prescription, RenderedPdf};
pub use notifications::NotificationService;
pub use records::{BulkDeleteOutcome, RecordService};
