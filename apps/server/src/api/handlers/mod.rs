//! Request handlers for API endpoints
//!
//! Handlers extract the principal and request data, call the services and
//! wrap results in the response envelope. Business rules live in `services`.

pub mod annual_reports;
pub mod metrics;
pub mod notifications;
pub mod prescriptions;
pub mod records;
pub mod referral_slips;
pub mod system;
