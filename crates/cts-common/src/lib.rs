//! cts-common — shared foundation for the CTS aggregation gateway.
//! - Error taxonomy (`CtsError`)
//! - Environment configuration (`CtsConfig`)
//! - The single HTTP-with-retry primitive (`UpstreamClient`)
//! - The data model crossing crate boundaries (identities, requests,
//!   result envelopes, metabolite trees)

pub mod client;
pub mod config;
pub mod error;
pub mod models;

pub use error::{CtsError, Result};

/// Sentinel for fields no upstream could supply.
pub const NA: &str = "N/A";
