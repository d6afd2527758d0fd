//! Event input schema
//!
//! This module defines the loosely-typed event record accepted at the engine
//! boundary and the adapter that validates records into an `EventTable`.
//! Validation happens here once; metric components only ever see typed events.

mod adapter;
mod record;

pub use adapter::*;
pub use record::*;
