//! Freshness monitor for the CONDUSEF SOFIPO credit portfolio portal.
//!
//! A run pulls the portal listing for every tracked institution, extracts the
//! reporting periods it mentions, and fires a single alert when a period newer
//! than the stored marker appears. The marker only advances after the alert
//! has been delivered.

pub mod config;
pub mod error;
pub mod monitor;
pub mod telemetry;
