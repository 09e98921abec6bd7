//! SPARC adapter.
//!
//! Three endpoints: `multiProperty` for the bulk estimates, `fullSpeciation`
//! for pKa, and `logd` for the pH-indexed distribution coefficient. SPARC
//! reports molecular volume rather than diffusivity, so the water- and
//! air-phase diffusivities are derived here from the volume.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::instrument;

use cts_common::client::UpstreamClient;
use cts_common::config::SPARC_TIMEOUT;
use cts_common::error::{CtsError, Result};
use cts_common::models::{Calculator, PchemRequest, PchemResult, Prop, PropData};

use crate::propmap::{find, Extract, PropMapping};
use crate::CalculatorAdapter;

const SPARC_ROOT: &str = "sparc-integration/rest/calc";

/// Calculations requested from `multiProperty` in one round-trip.
const CALCULATIONS: &[&str] = &[
    "VAPOR_PRESSURE",
    "BOILING_POINT",
    "DIFFUSION",
    "VOLUME",
    "DENSITY",
    "POLARIZABLITY",
    "INDEX_OF_REFRACTION",
    "HENRYS_CONSTANT",
    "SOLUBILITY",
    "ACTIVITY",
    "ELECTRON_AFFINITY",
    "DISTRIBUTION",
];

const MAP: &[PropMapping] = &[
    PropMapping { prop: Prop::VaporPress, upstream: "VAPOR_PRESSURE", extract: Extract::Scalar { key: "VAPOR_PRESSURE" } },
    PropMapping { prop: Prop::BoilingPoint, upstream: "BOILING_POINT", extract: Extract::Scalar { key: "BOILING_POINT" } },
    PropMapping { prop: Prop::HenrysLawCon, upstream: "HENRYS_CONSTANT", extract: Extract::Scalar { key: "HENRYS_CONSTANT" } },
    PropMapping { prop: Prop::WaterSol, upstream: "SOLUBILITY", extract: Extract::Scalar { key: "SOLUBILITY" } },
    PropMapping { prop: Prop::KowNoPh, upstream: "DISTRIBUTION", extract: Extract::Scalar { key: "DISTRIBUTION" } },
    PropMapping {
        prop: Prop::IonCon,
        upstream: "fullSpeciation",
        extract: Extract::Multi { keys: &["macroPkaResults"], methods: &[] },
    },
    PropMapping {
        prop: Prop::KowWph,
        upstream: "logd",
        extract: Extract::Multi { keys: &["data"], methods: &[] },
    },
];

const PROPS: &[Prop] = &[
    Prop::VaporPress,
    Prop::BoilingPoint,
    Prop::HenrysLawCon,
    Prop::WaterSol,
    Prop::IonCon,
    Prop::KowNoPh,
    Prop::KowWph,
];

pub struct SparcAdapter {
    client: UpstreamClient,
    base: String,
}

impl SparcAdapter {
    pub fn new(client: UpstreamClient, base_url: &str) -> Self {
        Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}/{}", self.base, SPARC_ROOT, endpoint)
    }

    async fn multi_property(&self, smiles: &str) -> Result<Value> {
        let body = json!({ "smiles": smiles, "calculations": CALCULATIONS });
        self.client
            .post_json(&self.url("multiProperty"), &body, SPARC_TIMEOUT)
            .await
    }

    async fn full_speciation(&self, smiles: &str, ph: f64) -> Result<Value> {
        let body = json!({ "smiles": smiles, "ph": ph });
        self.client
            .post_json(&self.url("fullSpeciation"), &body, SPARC_TIMEOUT)
            .await
    }

    async fn logd(&self, smiles: &str, ph: f64) -> Result<Value> {
        let body = json!({ "smiles": smiles, "ph": ph });
        self.client
            .post_json(&self.url("logd"), &body, SPARC_TIMEOUT)
            .await
    }
}

#[async_trait]
impl CalculatorAdapter for SparcAdapter {
    fn calc(&self) -> Calculator {
        Calculator::Sparc
    }

    fn props(&self) -> &'static [Prop] {
        PROPS
    }

    #[instrument(skip(self, req), fields(chemical = %req.chemical))]
    async fn run(&self, req: &PchemRequest) -> Result<Vec<PchemResult>> {
        let props = req.requested_props();

        // pKa and logD have their own endpoints; everything else comes out
        // of the single multiProperty response.
        let needs_multi = props
            .iter()
            .any(|p| !matches!(p, Prop::IonCon | Prop::KowWph));
        let multi_results = if needs_multi {
            Some(parse_multi_property(&self.multi_property(&req.chemical).await?))
        } else {
            None
        };

        let mut out = Vec::with_capacity(props.len());
        for prop in props {
            let env = match prop {
                Prop::IonCon => {
                    let resp = self.full_speciation(&req.chemical, req.ph).await?;
                    shape_ion_con(req, &resp)
                }
                Prop::KowWph => {
                    let resp = self.logd(&req.chemical, req.ph).await?;
                    shape_logd(req, &resp)
                }
                _ => match &multi_results {
                    Some(results) => shape_multi(req, prop, results),
                    None => PchemResult::fail(req, prop, "Property not served by SPARC"),
                },
            };
            out.push(env);
        }
        Ok(out)
    }
}

/// Flatten the `calculationResults` list into type → value, deriving the
/// diffusivities from molecular volume when SPARC reports one.
fn parse_multi_property(resp: &Value) -> Vec<(String, f64)> {
    let mut results: Vec<(String, f64)> = resp["calculationResults"]
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|e| {
                    Some((e["type"].as_str()?.to_string(), e["result"].as_f64()?))
                })
                .collect()
        })
        .unwrap_or_default();

    let volume = results.iter().find(|(t, _)| t == "VOLUME").map(|(_, v)| *v);
    if let Some(v) = volume {
        results.push(("WATER_DIFFUSION".to_string(), water_diffusivity(v)));
        results.push(("AIR_DIFFUSION".to_string(), air_diffusivity(v)));
    }
    results
}

fn shape_multi(req: &PchemRequest, prop: Prop, results: &[(String, f64)]) -> PchemResult {
    let Some(mapping) = find(MAP, prop) else {
        return PchemResult::fail(req, prop, "Property not served by SPARC");
    };
    let Extract::Scalar { key } = mapping.extract else {
        return PchemResult::fail(req, prop, "Property not served by SPARC");
    };
    match results.iter().find(|(t, _)| t == key) {
        Some((_, v)) => PchemResult::ok(req, prop, PropData::Scalar(*v)),
        None => PchemResult::ok(req, prop, PropData::na()),
    }
}

fn shape_ion_con(req: &PchemRequest, resp: &Value) -> PchemResult {
    let pka: Vec<f64> = resp["macroPkaResults"]
        .as_array()
        .map(|a| a.iter().filter_map(|e| e["macroPka"].as_f64()).collect())
        .unwrap_or_default();
    PchemResult::ok(req, Prop::IonCon, PropData::Ion { pka, pkb: Vec::new() })
}

/// The logd endpoint returns a pH-indexed chart; the requested pH's entry
/// wins.
fn shape_logd(req: &PchemRequest, resp: &Value) -> PchemResult {
    let value = resp["data"].as_array().and_then(|entries| {
        entries
            .iter()
            .filter_map(|e| Some((e["ph"].as_f64()?, e["logd"].as_f64()?)))
            .min_by(|(a, _), (b, _)| (a - req.ph).abs().total_cmp(&(b - req.ph).abs()))
            .map(|(_, v)| v)
    });
    match value {
        Some(v) => PchemResult::ok(req, Prop::KowWph, PropData::Scalar(v)),
        None => PchemResult::ok(req, Prop::KowWph, PropData::na()),
    }
}

/// Hayduk–Laudie water-phase diffusivity (cm²/s) from molar volume
/// (cm³/mol) at 25 °C in water (viscosity 1.0 cP).
pub fn water_diffusivity(molar_volume: f64) -> f64 {
    13.26e-5 / (1.0f64.powf(1.14) * molar_volume.powf(0.589))
}

/// Air-phase analog via the same volume correlation, FSG-style exponent.
pub fn air_diffusivity(molar_volume: f64) -> f64 {
    1.9 / molar_volume.powf(2.0 / 3.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(prop: Prop) -> PchemRequest {
        PchemRequest::new("CC(=O)OC1=C(C=CC=C1)C(O)=O", Calculator::Sparc, prop)
    }

    #[test]
    fn test_parse_multi_property_derives_diffusivities() {
        let resp = json!({
            "calculationResults": [
                { "type": "VAPOR_PRESSURE", "result": 2.1e-4 },
                { "type": "VOLUME", "result": 139.0 },
            ]
        });
        let results = parse_multi_property(&resp);
        let water = results.iter().find(|(t, _)| t == "WATER_DIFFUSION").unwrap().1;
        let air = results.iter().find(|(t, _)| t == "AIR_DIFFUSION").unwrap().1;
        assert!((water - 13.26e-5 / 139.0f64.powf(0.589)).abs() < 1e-12);
        assert!((air - 1.9 / 139.0f64.powf(2.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_shape_multi_missing_value_is_na() {
        let results = vec![("BOILING_POINT".to_string(), 141.0)];
        let env = shape_multi(&request(Prop::VaporPress), Prop::VaporPress, &results);
        assert!(env.valid);
        assert!(env.data.is_na());
    }

    #[test]
    fn test_shape_ion_con() {
        let resp = json!({
            "macroPkaResults": [
                { "macroPka": 3.48 },
                { "macroPka": 12.6 },
            ]
        });
        let env = shape_ion_con(&request(Prop::IonCon), &resp);
        assert_eq!(
            env.data,
            PropData::Ion { pka: vec![3.48, 12.6], pkb: vec![] }
        );
    }

    #[test]
    fn test_shape_logd_picks_requested_ph() {
        let resp = json!({
            "data": [
                { "ph": 6.0, "logd": -0.5 },
                { "ph": 7.0, "logd": -1.3 },
                { "ph": 8.0, "logd": -2.1 },
            ]
        });
        let env = shape_logd(&request(Prop::KowWph), &resp);
        assert_eq!(env.data, PropData::Scalar(-1.3));
    }
}
