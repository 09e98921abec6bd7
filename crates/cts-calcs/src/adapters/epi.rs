//! EPI Suite adapter.
//!
//! One POST returns every estimated property; the adapter extracts the
//! requested ones. Water-solubility and vapor-pressure estimates improve
//! markedly with a known melting point, so those requests are primed with
//! one from the measured data, then TEST, then EPI's own estimate.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use cts_common::client::UpstreamClient;
use cts_common::config::EPI_TIMEOUT;
use cts_common::error::{CtsError, Result};
use cts_common::models::{Calculator, PchemRequest, PchemResult, Prop, PropData};

use crate::propmap::{find, Extract, PropMapping};
use crate::{CalculatorAdapter, MeltingPointSource};

const EPI_ENDPOINT: &str = "episuiteapi/rest/episuite/estimated";

const MAP: &[PropMapping] = &[
    PropMapping { prop: Prop::MeltingPoint, upstream: "melting_point", extract: Extract::Scalar { key: "melting_point" } },
    PropMapping { prop: Prop::BoilingPoint, upstream: "boiling_point", extract: Extract::Scalar { key: "boiling_point" } },
    PropMapping { prop: Prop::WaterSol, upstream: "water_solubility", extract: Extract::Scalar { key: "water_solubility" } },
    PropMapping { prop: Prop::VaporPress, upstream: "vapor_pressure", extract: Extract::Scalar { key: "vapor_pressure" } },
    PropMapping { prop: Prop::HenrysLawCon, upstream: "henrys_law_constant", extract: Extract::Scalar { key: "henrys_law_constant" } },
    PropMapping { prop: Prop::KowNoPh, upstream: "log_kow", extract: Extract::Scalar { key: "log_kow" } },
    PropMapping { prop: Prop::Koc, upstream: "log_koc", extract: Extract::Scalar { key: "log_koc" } },
    PropMapping { prop: Prop::LogBcf, upstream: "log_bcf", extract: Extract::Scalar { key: "log_bcf" } },
    PropMapping { prop: Prop::LogBaf, upstream: "log_baf", extract: Extract::Scalar { key: "log_baf" } },
];

const PROPS: &[Prop] = &[
    Prop::MeltingPoint,
    Prop::BoilingPoint,
    Prop::WaterSol,
    Prop::VaporPress,
    Prop::HenrysLawCon,
    Prop::KowNoPh,
    Prop::Koc,
    Prop::LogBcf,
    Prop::LogBaf,
];

pub struct EpiAdapter {
    client: UpstreamClient,
    base: String,
    /// Melting-point priming sources, in preference order.
    mp_sources: Vec<Arc<dyn MeltingPointSource>>,
}

impl EpiAdapter {
    pub fn new(client: UpstreamClient, base_url: &str) -> Self {
        Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
            mp_sources: Vec::new(),
        }
    }

    pub fn with_melting_point_sources(mut self, sources: Vec<Arc<dyn MeltingPointSource>>) -> Self {
        self.mp_sources = sources;
        self
    }

    async fn fetch_estimates(&self, smiles: &str, melting_point: Option<f64>) -> Result<Value> {
        let mut body = json!({ "structure": smiles });
        if let Some(mp) = melting_point {
            body["melting_point"] = json!(mp);
        }
        let url = format!("{}/{}", self.base, EPI_ENDPOINT);
        self.client.post_json(&url, &body, EPI_TIMEOUT).await
    }

    async fn prime_melting_point(&self, smiles: &str) -> Option<f64> {
        for source in &self.mp_sources {
            if let Some(mp) = source.melting_point(smiles).await {
                debug!(smiles = smiles, mp = mp, "Melting point primed");
                return Some(mp);
            }
        }
        None
    }
}

#[async_trait]
impl CalculatorAdapter for EpiAdapter {
    fn calc(&self) -> Calculator {
        Calculator::Epi
    }

    fn props(&self) -> &'static [Prop] {
        PROPS
    }

    #[instrument(skip(self, req), fields(chemical = %req.chemical))]
    async fn run(&self, req: &PchemRequest) -> Result<Vec<PchemResult>> {
        let props = req.requested_props();
        let needs_mp = props.iter().any(|p| matches!(p, Prop::WaterSol | Prop::VaporPress));

        let melting_point = if needs_mp {
            self.prime_melting_point(&req.chemical).await
        } else {
            None
        };

        let resp = self.fetch_estimates(&req.chemical, melting_point).await?;

        let mut out = Vec::with_capacity(props.len());
        for prop in props {
            let Some(mapping) = find(MAP, prop) else {
                out.push(PchemResult::fail(req, prop, "Property not served by EPI"));
                continue;
            };
            match extract_estimate(&resp, mapping.upstream) {
                Some(v) => out.push(PchemResult::ok(req, prop, PropData::Scalar(v))),
                None => {
                    warn!(prop = %prop, "EPI returned no value");
                    out.push(PchemResult::ok(req, prop, PropData::na()));
                }
            }
        }
        Ok(out)
    }
}

/// Pull one estimate out of the `{data: [{prop, data}, ...]}` response.
fn extract_estimate(resp: &Value, upstream: &str) -> Option<f64> {
    resp["data"]
        .as_array()?
        .iter()
        .find(|e| e["prop"].as_str() == Some(upstream))
        .and_then(|e| e["data"].as_f64())
}

// ── Hydrolysis sub-endpoints (QSAR half-life engine) ───────────────────────

/// One kinetic entry from an EPI hydrolysis endpoint. `kind` is the
/// reaction-site classification (`Kb`, `Ka`, `Kn`); `atom_number` indexes
/// the reacting atom, zero-based over the request structure's atom order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HalfLifeEntry {
    pub kind: String,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atom_number: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct EpiHydrolysisClient {
    client: UpstreamClient,
    base: String,
}

impl EpiHydrolysisClient {
    pub fn new(client: UpstreamClient, base_url: &str) -> Self {
        Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `endpoint` is one of the hydrolysis route segments
    /// (`alkylhalide|epoxide|phosphate|ester|anhydride|carbamate`).
    #[instrument(skip(self))]
    pub async fn half_lives(&self, endpoint: &str, smiles: &str) -> Result<Vec<HalfLifeEntry>> {
        let url = format!("{}/{}/hydrolysis/{}", self.base, EPI_ENDPOINT, endpoint);
        let body = json!({ "structure": smiles });
        let resp = self.client.post_json(&url, &body, EPI_TIMEOUT).await?;
        parse_half_lives(&resp)
    }
}

pub fn parse_half_lives(resp: &Value) -> Result<Vec<HalfLifeEntry>> {
    let entries = resp["data"]
        .as_array()
        .ok_or_else(|| CtsError::NoData("hydrolysis half-lives".into()))?;

    Ok(entries
        .iter()
        .filter_map(|e| {
            Some(HalfLifeEntry {
                kind: e["prop"].as_str()?.to_string(),
                value: e["data"].as_f64()?,
                atom_number: e["atom_number"].as_u64().map(|n| n as usize),
            })
        })
        .collect())
}
