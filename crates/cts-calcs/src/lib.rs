//! cts-calcs — one adapter per prediction upstream.
//!
//! Every adapter maps the internal property vocabulary to its upstream's
//! identifiers, converts units, and shapes results into `PchemResult`
//! envelopes. The common interface is `CalculatorAdapter`.

pub mod adapters;
pub mod propmap;

use async_trait::async_trait;

use cts_common::error::Result;
use cts_common::models::{Calculator, PchemRequest, PchemResult, Prop};

/// Common contract for every predictor upstream.
#[async_trait]
pub trait CalculatorAdapter: Send + Sync {
    fn calc(&self) -> Calculator;

    /// The internal properties this upstream serves.
    fn props(&self) -> &'static [Prop];

    /// Dispatch the request upstream and shape the response into one
    /// envelope per requested property.
    async fn run(&self, req: &PchemRequest) -> Result<Vec<PchemResult>>;
}

/// Source of a melting-point estimate used to prime EPI's water-solubility
/// and vapor-pressure models.
#[async_trait]
pub trait MeltingPointSource: Send + Sync {
    async fn melting_point(&self, smiles: &str) -> Option<f64>;
}
