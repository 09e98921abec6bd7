//! TEST (Toxicity Estimation Software Tool) adapter.
//!
//! Per-property endpoints under `/api/TEST/{method}/{propKey}`. The upstream
//! encodes missing predictions as `-9999`, and water solubility comes back
//! as -log10(mol/L).

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::instrument;

use cts_common::client::UpstreamClient;
use cts_common::error::{CtsError, Result};
use cts_common::models::{Calculator, PchemRequest, PchemResult, Prop, PropData};

use cts_jchem::properties::ws_mg_per_l;

use crate::propmap::{find, Extract, PropMapping};
use crate::{CalculatorAdapter, MeltingPointSource};

use std::time::Duration;

const TEST_TIMEOUT: Duration = Duration::from_secs(30);
const SENTINEL: f64 = -9999.0;

/// Estimation methods TEST supports; hierarchical clustering is the
/// default.
const METHODS: &[&str] = &["hc", "gc", "nn", "fda"];
const DEFAULT_METHOD: &str = "hc";

const MAP: &[PropMapping] = &[
    PropMapping {
        prop: Prop::MeltingPoint,
        upstream: "MeltingPoint",
        extract: Extract::Multi { keys: &["MeltingPoint"], methods: &["hc", "gc", "nn", "fda"] },
    },
    PropMapping {
        prop: Prop::BoilingPoint,
        upstream: "BoilingPoint",
        extract: Extract::Multi { keys: &["BoilingPoint"], methods: &["hc", "gc", "nn", "fda"] },
    },
    PropMapping {
        prop: Prop::WaterSol,
        upstream: "WaterSolubility",
        extract: Extract::Multi { keys: &["WaterSolubility"], methods: &["hc", "gc", "nn", "fda"] },
    },
    PropMapping {
        prop: Prop::VaporPress,
        upstream: "VaporPressure",
        extract: Extract::Multi { keys: &["VaporPressure"], methods: &["hc", "gc", "nn", "fda"] },
    },
];

const PROPS: &[Prop] = &[
    Prop::MeltingPoint,
    Prop::BoilingPoint,
    Prop::WaterSol,
    Prop::VaporPress,
];

pub struct TestAdapter {
    client: UpstreamClient,
    base: String,
}

impl TestAdapter {
    pub fn new(client: UpstreamClient, base_url: &str) -> Self {
        Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch(&self, method: &str, prop_key: &str, smiles: &str) -> Result<Value> {
        let url = format!("{}/api/TEST/{}/{}", self.base, method, prop_key);
        let body = json!({ "identifiers": { "SMILES": smiles } });
        self.client.post_json(&url, &body, TEST_TIMEOUT).await
    }
}

#[async_trait]
impl CalculatorAdapter for TestAdapter {
    fn calc(&self) -> Calculator {
        Calculator::Test
    }

    fn props(&self) -> &'static [Prop] {
        PROPS
    }

    #[instrument(skip(self, req), fields(chemical = %req.chemical))]
    async fn run(&self, req: &PchemRequest) -> Result<Vec<PchemResult>> {
        let method = validate_method(req.method.as_deref())?;

        let mut out = Vec::new();
        for prop in req.requested_props() {
            let Some(mapping) = find(MAP, prop) else {
                out.push(PchemResult::fail(req, prop, "Property not served by TEST"));
                continue;
            };
            let resp = self.fetch(method, mapping.upstream, &req.chemical).await?;
            out.push(shape_result(req, prop, &resp));
        }
        Ok(out)
    }
}

fn validate_method(method: Option<&str>) -> Result<&str> {
    match method {
        None => Ok(DEFAULT_METHOD),
        Some(m) if METHODS.contains(&m) => Ok(m),
        Some(m) => Err(CtsError::InvalidChemical(format!(
            "Unknown TEST method: {}",
            m
        ))),
    }
}

fn shape_result(req: &PchemRequest, prop: Prop, resp: &Value) -> PchemResult {
    let value = resp["predictions"]
        .as_array()
        .and_then(|a| a.first())
        .and_then(|e| e["predValue"].as_f64());

    match value {
        Some(v) if v == SENTINEL => PchemResult::ok(req, prop, PropData::na()),
        Some(v) => match convert(prop, v, req.mass) {
            Some(c) => PchemResult::ok(req, prop, PropData::Scalar(c)),
            None => PchemResult::ok(req, prop, PropData::na()),
        },
        None => PchemResult::ok(req, prop, PropData::na()),
    }
}

/// Water solubility comes back as -log10(mol/L); converting to mg/L needs
/// the average mass, and without one there is no reportable value.
fn convert(prop: Prop, v: f64, mass: Option<f64>) -> Option<f64> {
    match prop {
        Prop::WaterSol => mass.map(|m| ws_mg_per_l(-v, m)),
        _ => Some(v),
    }
}

#[async_trait]
impl MeltingPointSource for TestAdapter {
    async fn melting_point(&self, smiles: &str) -> Option<f64> {
        let resp = self.fetch(DEFAULT_METHOD, "MeltingPoint", smiles).await.ok()?;
        let v = resp["predictions"]
            .as_array()?
            .first()?["predValue"]
            .as_f64()?;
        (v != SENTINEL).then_some(v)
    }
}
