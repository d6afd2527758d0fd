//! Cohort Engine - deterministic weekly user analytics
//!
//! The engine turns a flat table of `(user_id, created_at)` events into weekly
//! aggregate tables: cohort retention, growth, engagement, churn risk,
//! lifecycle transitions, stickiness and engagement depth.
//!
//! ## Pipeline
//!
//! - **Boundary**: JSON/NDJSON records are validated into an `EventTable`
//! - **Cohorts**: activation weeks and cohort ages feed retention and cohort-age engagement
//! - **Metric families**: each computed independently from the same read-only table
//! - **Encoding**: families are bundled into an `AnalyticsReport` with producer metadata

pub mod churn;
pub mod cohort;
pub mod config;
pub mod depth;
pub mod encoder;
pub mod engagement;
pub mod error;
pub mod growth;
pub mod lifecycle;
pub mod pipeline;
pub mod retention;
pub mod schema;
pub mod stickiness;
pub mod table;
pub mod tier;
pub mod types;
pub mod week;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{GapPolicy, MetricsConfig};
pub use error::ComputeError;
pub use pipeline::{events_to_report_json, MetricsEngine};
pub use table::EventTable;
pub use types::AnalyticsReport;

// Schema exports
pub use schema::{EventAdapter, EventRecord, ValidationError};

/// Engine version embedded in every report
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "cohort-engine";
