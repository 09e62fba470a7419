//! CV Matcher
//!
//! Matches scraped CVs against client hiring profiles. Scans are matched
//! inline by the scan endpoint; the resulting matches are deduplicated,
//! persisted and dispatched to hooks and e-mail by a background worker.

pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
