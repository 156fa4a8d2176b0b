//! Route tables

pub mod metrics;
pub mod notifications;
pub mod records;
