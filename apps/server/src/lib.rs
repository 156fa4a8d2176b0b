//! School health records server
//!
//! Backend for school clinics and district health offices:
//! - Clinical and administrative records with ownership and soft delete
//! - Role-based access over HS256 bearer tokens
//! - Notification fan-out and an audit trail for every mutation
//! - Scheduled retention cleanup and keep-alive jobs
//! - Prescription PDF export

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod ids;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod validation;

pub use config::Config;
pub use error::{Error, Result};
pub use state::AppState;
