//! MF Core - matched-filter template search engine.
//!
//! This crate contains the numeric engine and the batch job protocol with
//! zero UI dependencies. It can be driven in-process, by the `mf-runner`
//! binary, or by any bridge that can hand it a serialized job request.
//!
//! The two entry points are the bank sweep (`orchestrator::BankSweepController`)
//! and the template batch build (`orchestrator::TemplateBatchBuilder`).

pub mod analysis;
pub mod bank;
pub mod config;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod synthesis;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
