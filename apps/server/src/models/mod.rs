//! Domain models for the health-records service

pub mod annual_report;
pub mod audit;
pub mod common;
pub mod health_examination;
pub mod kind;
pub mod notification;
pub mod personnel_health_card;
pub mod prescription;
pub mod record;
pub mod referral_slip;
pub mod school_health_survey;

pub use annual_report::{AnnualReport, AnnualReports, AutoGenerateReportInput, HealthServices};
pub use audit::{AuditAction, AuditEntry};
pub use common::{Gender, GenderTally};
pub use health_examination::{HealthExamination, HealthExaminations};
pub use kind::RecordKind;
pub use notification::{Notification, NotificationInput, NotificationKind, Priority};
pub use personnel_health_card::{PersonnelHealthCard, PersonnelHealthCards};
pub use prescription::{Medication, Prescription, Prescriptions};
pub use record::{sanitize_patch, Lifecycle, LifecycleFilter, StoredRecord, UserRef};
pub use referral_slip::{ReferralSlip, ReferralSlips, ReturnDetails, ReturnSlipStatus};
pub use school_health_survey::{SchoolHealthSurvey, SchoolHealthSurveys, SurveyStatus};
