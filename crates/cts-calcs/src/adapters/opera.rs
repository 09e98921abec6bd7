//! OPERA adapter.
//!
//! One round-trip returns every prediction. Vapor pressure and Henry's law
//! constant come back in log space; water solubility in log(mol/L); logD
//! only at pH 5.5 and 7.4.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::instrument;

use cts_common::client::UpstreamClient;
use cts_common::config::OPERA_TIMEOUT;
use cts_common::error::{CtsError, Result};
use cts_common::models::{Calculator, PchemRequest, PchemResult, Prop, PropData};

use cts_jchem::properties::ws_mg_per_l;

use crate::propmap::{find, Extract, PropMapping};
use crate::CalculatorAdapter;

const OPERA_ENDPOINT: &str = "opera/rest/run";

const KOW_WPH_NOTE: &str =
    "OPERA reports pH-dependent logD at pH 5.5 and 7.4 only; other pH values have no prediction.";

const MAP: &[PropMapping] = &[
    PropMapping { prop: Prop::MeltingPoint, upstream: "MP_pred", extract: Extract::Scalar { key: "MP_pred" } },
    PropMapping { prop: Prop::BoilingPoint, upstream: "BP_pred", extract: Extract::Scalar { key: "BP_pred" } },
    PropMapping { prop: Prop::WaterSol, upstream: "LogWS_pred", extract: Extract::Scalar { key: "LogWS_pred" } },
    PropMapping { prop: Prop::VaporPress, upstream: "LogVP_pred", extract: Extract::Scalar { key: "LogVP_pred" } },
    PropMapping { prop: Prop::HenrysLawCon, upstream: "LogHL_pred", extract: Extract::Scalar { key: "LogHL_pred" } },
    PropMapping { prop: Prop::KowNoPh, upstream: "LogP_pred", extract: Extract::Scalar { key: "LogP_pred" } },
    PropMapping { prop: Prop::Koc, upstream: "LogKoc_pred", extract: Extract::Scalar { key: "LogKoc_pred" } },
    PropMapping { prop: Prop::LogBcf, upstream: "LogBCF_pred", extract: Extract::Scalar { key: "LogBCF_pred" } },
    PropMapping { prop: Prop::LogBaf, upstream: "LogBAF_pred", extract: Extract::Scalar { key: "LogBAF_pred" } },
    PropMapping {
        prop: Prop::IonCon,
        upstream: "pKa",
        extract: Extract::Multi { keys: &["pKa_a_pred", "pKa_b_pred"], methods: &[] },
    },
    PropMapping {
        prop: Prop::KowWph,
        upstream: "LogD",
        extract: Extract::Multi { keys: &["LogD55_pred", "LogD74_pred"], methods: &["5.5", "7.4"] },
    },
];

const PROPS: &[Prop] = &[
    Prop::MeltingPoint,
    Prop::BoilingPoint,
    Prop::WaterSol,
    Prop::VaporPress,
    Prop::HenrysLawCon,
    Prop::IonCon,
    Prop::KowNoPh,
    Prop::KowWph,
    Prop::Koc,
    Prop::LogBcf,
    Prop::LogBaf,
];

pub struct OperaAdapter {
    client: UpstreamClient,
    base: String,
}

impl OperaAdapter {
    pub fn new(client: UpstreamClient, base_url: &str) -> Self {
        Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch(&self, smiles: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base, OPERA_ENDPOINT);
        let body = json!({ "smiles": [smiles] });
        let resp = self.client.post_json(&url, &body, OPERA_TIMEOUT).await?;
        resp["data"]
            .as_array()
            .and_then(|a| a.first().cloned())
            .ok_or_else(|| CtsError::NoData("OPERA predictions".into()))
    }
}

#[async_trait]
impl CalculatorAdapter for OperaAdapter {
    fn calc(&self) -> Calculator {
        Calculator::Opera
    }

    fn props(&self) -> &'static [Prop] {
        PROPS
    }

    #[instrument(skip(self, req), fields(chemical = %req.chemical))]
    async fn run(&self, req: &PchemRequest) -> Result<Vec<PchemResult>> {
        let predictions = self.fetch(&req.chemical).await?;
        Ok(shape_results(req, &predictions))
    }
}

/// Emit envelopes in the order properties were requested.
fn shape_results(req: &PchemRequest, predictions: &Value) -> Vec<PchemResult> {
    req.requested_props()
        .into_iter()
        .map(|prop| shape_one(req, prop, predictions))
        .collect()
}

fn shape_one(req: &PchemRequest, prop: Prop, predictions: &Value) -> PchemResult {
    let Some(mapping) = find(MAP, prop) else {
        return PchemResult::fail(req, prop, "Property not served by OPERA");
    };

    match (prop, mapping.extract) {
        (Prop::IonCon, Extract::Multi { keys, .. }) => {
            let pka = finite_values(&predictions[keys[0]]);
            let pkb = finite_values(&predictions[keys[1]]);
            PchemResult::ok(req, prop, PropData::Ion { pka, pkb })
        }
        (Prop::KowWph, Extract::Multi { keys, methods }) => {
            match kow_wph_value(predictions, keys, methods, req.ph) {
                Some(v) => PchemResult::ok(req, prop, PropData::Scalar(v)),
                None => {
                    let mut env = PchemResult::ok(req, prop, PropData::na());
                    env.error = Some(KOW_WPH_NOTE.to_string());
                    env
                }
            }
        }
        (_, Extract::Scalar { key }) => {
            match finite(&predictions[key]).and_then(|raw| convert(prop, raw, req.mass)) {
                Some(v) => PchemResult::ok(req, prop, PropData::Scalar(v)),
                None => PchemResult::ok(req, prop, PropData::na()),
            }
        }
        _ => PchemResult::fail(req, prop, "Property not served by OPERA"),
    }
}

/// OPERA's logD exists at pH 5.5 and 7.4 only; any other pH has no value.
fn kow_wph_value(
    predictions: &Value,
    keys: &[&str],
    methods: &[&str],
    ph: f64,
) -> Option<f64> {
    for (key, label) in keys.iter().zip(methods) {
        let Ok(target) = label.parse::<f64>() else { continue };
        if (ph - target).abs() < 1e-9 {
            return finite(&predictions[*key]);
        }
    }
    None
}

/// Convert out of OPERA's native spaces: `10^x` for vapor pressure and
/// Henry's law constant, log(mol/L) to mg/L for water solubility. Water
/// solubility needs the average mass; without one there is no mg/L value.
fn convert(prop: Prop, raw: f64, mass: Option<f64>) -> Option<f64> {
    match prop {
        Prop::VaporPress | Prop::HenrysLawCon => Some(10f64.powf(raw)),
        Prop::WaterSol => mass.map(|m| ws_mg_per_l(raw, m)),
        _ => Some(raw),
    }
}

fn finite(v: &Value) -> Option<f64> {
    v.as_f64().filter(|x| x.is_finite())
}

/// Collect the finite entries of a scalar-or-list prediction, dropping
/// NaNs (OPERA encodes missing constants as NaN strings or nulls).
fn finite_values(v: &Value) -> Vec<f64> {
    match v {
        Value::Array(items) => items.iter().filter_map(finite).collect(),
        other => finite(other).into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn predictions() -> Value {
        json!({
            "LogP_pred": 1.19,
            "LogVP_pred": -2.0,
            "LogHL_pred": -7.5,
            "LogWS_pred": -3.0,
            "pKa_a_pred": [3.5, 9.1],
            "pKa_b_pred": null,
            "LogD55_pred": -1.1,
            "LogD74_pred": -2.3,
        })
    }

    fn request(prop: Prop) -> PchemRequest {
        let mut req = PchemRequest::new("CC(=O)OC1=C(C=CC=C1)C(O)=O", Calculator::Opera, prop);
        req.mass = Some(180.159);
        req
    }

    #[test]
    fn test_water_sol_conversion() {
        // 10^-3 mol/L at mass 180.159 => 180.159 mg/L
        let results = shape_results(&request(Prop::WaterSol), &predictions());
        match &results[0].data {
            PropData::Scalar(v) => assert!((v - 180.159).abs() / 180.159 < 1e-6),
            other => panic!("expected scalar, got {:?}", other),
        }
    }

    #[test]
    fn test_water_sol_without_mass_is_na() {
        let mut req = request(Prop::WaterSol);
        req.mass = None;
        let results = shape_results(&req, &predictions());
        assert!(results[0].valid);
        assert!(results[0].data.is_na());
    }

    #[test]
    fn test_log_space_conversions_invert() {
        let results = shape_results(&request(Prop::VaporPress), &predictions());
        let PropData::Scalar(vp) = results[0].data else { panic!() };
        assert!((vp.log10() - (-2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_ion_con_drops_nans() {
        let mut preds = predictions();
        preds["pKa_a_pred"] = json!([3.5, null, 9.1]);
        let results = shape_results(&request(Prop::IonCon), &preds);
        match &results[0].data {
            PropData::Ion { pka, pkb } => {
                assert_eq!(pka, &vec![3.5, 9.1]);
                assert!(pkb.is_empty());
            }
            other => panic!("expected ion data, got {:?}", other),
        }
    }

    #[test]
    fn test_kow_wph_matches_only_55_and_74() {
        let mut req = request(Prop::KowWph);
        req.ph = 7.4;
        let results = shape_results(&req, &predictions());
        assert_eq!(results[0].data, PropData::Scalar(-2.3));

        req.ph = 7.0;
        let results = shape_results(&req, &predictions());
        assert!(results[0].data.is_na());
        assert!(results[0].valid);
        assert!(results[0].error.as_deref().unwrap().contains("5.5 and 7.4"));
    }

    #[test]
    fn test_envelope_order_follows_request() {
        let mut req = request(Prop::KowNoPh);
        req.prop = None;
        req.props = vec![Prop::VaporPress, Prop::KowNoPh, Prop::WaterSol];
        let results = shape_results(&req, &predictions());
        let got: Vec<Prop> = results.iter().map(|r| r.prop).collect();
        assert_eq!(got, vec![Prop::VaporPress, Prop::KowNoPh, Prop::WaterSol]);
    }
}
