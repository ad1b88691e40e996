#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Parcel fact collection for zoning reports.
//!
//! Each upstream source (the NYC Geoclient geocoder, the PLUTO tax lot
//! registry, a transit zone map) implements the [`Step`] trait. The
//! [`FactsPipeline`] runs them in order, caching each step's output in a
//! [`ReportStore`], and merges the results into the [`ParcelFacts`] the
//! zoning engine evaluates.
//!
//! [`ParcelFacts`]: nyc_zoning_models::ParcelFacts

pub mod geoclient;
pub mod pipeline;
pub mod pluto;
pub mod retry;
pub mod services;
pub mod step;
pub mod store;
pub mod transit;

pub use pipeline::{CollectedFacts, FactsPipeline};
pub use step::Step;
pub use store::{MemoryReportStore, ReportStore};

/// Errors that can occur while collecting parcel facts.
#[derive(Debug, thiserror::Error)]
pub enum FactsError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (file read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An upstream response did not have the expected shape.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of what went wrong.
        message: String,
    },

    /// The upstream service has no record for the request.
    #[error("Not found: {message}")]
    NotFound {
        /// What was looked up.
        message: String,
    },

    /// Missing or invalid configuration (API keys, endpoints).
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// A pipeline step failed.
    #[error("Step '{step}' failed: {source}")]
    Step {
        /// Name of the failing step.
        step: String,
        /// The underlying error.
        source: Box<Self>,
    },
}
