//! cts-jchem — client for the ChemAxon JChem webservices.
//!
//! Two layers:
//! - structure utilities (type detection, structure checking, format
//!   conversion, standardizer actions) behind the `StructureService` trait
//!   so dependent crates can mock them;
//! - typed property endpoints (`util/calculate/{pKa, logP, logD, ...}`)
//!   with the defaults the gateway uses everywhere.

pub mod client;
pub mod properties;
pub mod service;
pub mod speciation;

pub use client::JchemClient;
pub use service::{MockStructureService, StructureService};
