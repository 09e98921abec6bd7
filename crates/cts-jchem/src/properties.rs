//! Typed wrappers over the JChem `util/calculate/*` endpoints.
//!
//! Each property has a request builder with the gateway's defaults, a
//! response extractor, and the one-line unit conversions. Extractors are
//! pure functions over `serde_json::Value` so they can be tested against
//! fixtures without a server.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::instrument;

use cts_common::error::{CtsError, Result};

use crate::client::JchemClient;

/// Acidic and basic dissociation constants, each sorted ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PkaResult {
    #[serde(rename = "pKa")]
    pub pka: Vec<f64>,
    #[serde(rename = "pKb")]
    pub pkb: Vec<f64>,
    /// Microspecies structures reported alongside the constants.
    #[serde(default)]
    pub microspecies: Vec<String>,
}

/// logP estimation methods JChem supports.
pub const LOGP_METHODS: [&str; 3] = ["KLOP", "VG", "PHYS"];

impl JchemClient {
    #[instrument(skip(self))]
    pub async fn pka(&self, smiles: &str) -> Result<PkaResult> {
        let resp = self
            .post(
                "calculate/pKa",
                json!({
                    "structure": smiles,
                    "parameters": {
                        "pKaLowerLimit": 0.0,
                        "pKaUpperLimit": 14.0,
                        "prefix": "STATIC",
                        "temperature": 298.0,
                        "micro": true,
                    },
                }),
            )
            .await?;
        parse_pka(&resp)
    }

    #[instrument(skip(self))]
    pub async fn log_p(&self, smiles: &str, method: &str) -> Result<f64> {
        if !LOGP_METHODS.contains(&method) {
            return Err(CtsError::InvalidChemical(format!(
                "Unknown logP method: {}",
                method
            )));
        }
        let resp = self
            .post(
                "calculate/logP",
                json!({
                    "structure": smiles,
                    "parameters": { "method": method, "temperature": 298.0 },
                }),
            )
            .await?;
        resp["logpnonionic"]
            .as_f64()
            .ok_or_else(|| CtsError::NoData("logP".into()))
    }

    /// logD over the full pH chart; the caller's pH is looked up in the
    /// returned curve.
    #[instrument(skip(self))]
    pub async fn log_d(&self, smiles: &str, ph: f64) -> Result<f64> {
        let resp = self
            .post(
                "calculate/logD",
                json!({
                    "structure": smiles,
                    "parameters": {
                        "pHLower": 0.0,
                        "pHUpper": 14.0,
                        "pHStep": 0.1,
                        "temperature": 298.0,
                    },
                }),
            )
            .await?;
        parse_logd_at(&resp, ph)
    }

    /// Intrinsic solubility, mg/mL.
    #[instrument(skip(self))]
    pub async fn solubility(&self, smiles: &str) -> Result<f64> {
        let resp = self
            .post(
                "calculate/solubility",
                json!({
                    "structure": smiles,
                    "parameters": { "unit": "MGPERML" },
                }),
            )
            .await?;
        resp["intrinsicSolubility"]
            .as_f64()
            .ok_or_else(|| CtsError::NoData("intrinsic solubility".into()))
    }

    /// pH-dependent solubility at the given pH, mg/mL.
    #[instrument(skip(self))]
    pub async fn solubility_at_ph(&self, smiles: &str, ph: f64) -> Result<f64> {
        let resp = self
            .post(
                "calculate/solubility",
                json!({
                    "structure": smiles,
                    "parameters": {
                        "unit": "MGPERML",
                        "pHLower": 0.0,
                        "pHUpper": 14.0,
                        "pHStep": 0.1,
                    },
                }),
            )
            .await?;
        parse_ph_indexed(&resp["pHDependentSolubility"]["values"], "solubility", ph)
            .ok_or_else(|| CtsError::NoData("pH-dependent solubility".into()))
    }

    #[instrument(skip(self))]
    pub async fn isoelectric_point(&self, smiles: &str) -> Result<f64> {
        let resp = self
            .post(
                "calculate/isoelectricPoint",
                json!({ "structure": smiles, "parameters": { "pHStep": 0.5 } }),
            )
            .await?;
        resp["isoelectricPoint"]
            .as_f64()
            .ok_or_else(|| CtsError::NoData("isoelectric point".into()))
    }

    /// Dominant microspecies at a pH, as SMILES.
    #[instrument(skip(self))]
    pub async fn major_microspecies(&self, smiles: &str, ph: f64) -> Result<String> {
        let resp = self
            .post(
                "calculate/majorMicrospecies",
                json!({
                    "structure": smiles,
                    "parameters": { "pH": ph, "takeMajorTautomericForm": false },
                }),
            )
            .await?;
        resp["result"]["structureData"]["structure"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| CtsError::NoData("major microspecies".into()))
    }

    /// Dominant tautomers. Esters and aromaticity are protected by default,
    /// path length capped at 4.
    #[instrument(skip(self))]
    pub async fn tautomers(&self, smiles: &str) -> Result<Vec<String>> {
        let resp = self
            .post(
                "calculate/tautomerization",
                json!({
                    "structure": smiles,
                    "parameters": {
                        "calculationType": "DOMINANT",
                        "maxStructureCount": 1000,
                        "considerPH": false,
                        "rationalTautomerGenerationMode": true,
                        "maxPathLength": 4,
                        "protectAromaticity": true,
                        "protectEsterGroups": true,
                    },
                }),
            )
            .await?;
        parse_structure_list(&resp)
    }

    /// Tetrahedral stereoisomers.
    #[instrument(skip(self))]
    pub async fn stereoisomers(&self, smiles: &str) -> Result<Vec<String>> {
        let resp = self
            .post(
                "calculate/stereoisomer",
                json!({
                    "structure": smiles,
                    "parameters": {
                        "stereoisomerismType": "TETRAHEDRAL",
                        "maxStructureCount": 1000,
                        "protectDoubleBondStereo": false,
                        "protectTetrahedralStereo": false,
                    },
                }),
            )
            .await?;
        parse_structure_list(&resp)
    }
}

/// Water solubility in mg/L from a logS (mol/L) value and the average mass.
pub fn ws_mg_per_l(log_s: f64, mass: f64) -> f64 {
    1000.0 * mass * 10f64.powf(log_s)
}

pub(crate) fn parse_pka(resp: &Value) -> Result<PkaResult> {
    let collect = |key: &str| -> Vec<f64> {
        let mut vals: Vec<f64> = resp[key]
            .as_array()
            .map(|a| a.iter().filter_map(|e| e["value"].as_f64()).collect())
            .unwrap_or_default();
        vals.sort_by(f64::total_cmp);
        vals
    };

    let pka = collect("acidicValuesByPka");
    let pkb = collect("basicValuesByPka");
    if pka.is_empty() && pkb.is_empty() && resp.get("acidicValuesByPka").is_none() {
        return Err(CtsError::NoData("pKa".into()));
    }

    let microspecies = resp["microspecies"]
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|m| m["structure"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    Ok(PkaResult { pka, pkb, microspecies })
}

/// Find the chart entry whose pH is closest to the requested one (the chart
/// is sampled in 0.1 steps).
pub(crate) fn parse_ph_indexed(values: &Value, key: &str, ph: f64) -> Option<f64> {
    let entries = values.as_array()?;
    let mut best: Option<(f64, f64)> = None;
    for e in entries {
        let (Some(entry_ph), Some(v)) = (e["pH"].as_f64(), e[key].as_f64()) else {
            continue;
        };
        let dist = (entry_ph - ph).abs();
        if best.map_or(true, |(d, _)| dist < d) {
            best = Some((dist, v));
        }
    }
    best.map(|(_, v)| v)
}

pub(crate) fn parse_logd_at(resp: &Value, ph: f64) -> Result<f64> {
    parse_ph_indexed(&resp["chartData"]["values"], "logD", ph)
        .ok_or_else(|| CtsError::NoData("logD".into()))
}

pub(crate) fn parse_structure_list(resp: &Value) -> Result<Vec<String>> {
    resp["result"]
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|e| e["structureData"]["structure"].as_str().map(String::from))
                .collect()
        })
        .ok_or_else(|| CtsError::NoData("structure list".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_pka_sorts_ascending() {
        let resp = json!({
            "acidicValuesByPka": [
                { "value": 9.1, "index": 3 },
                { "value": 3.5, "index": 1 },
            ],
            "basicValuesByPka": [{ "value": -1.2, "index": 2 }],
        });
        let r = parse_pka(&resp).unwrap();
        assert_eq!(r.pka, vec![3.5, 9.1]);
        assert_eq!(r.pkb, vec![-1.2]);
    }

    #[test]
    fn test_parse_pka_collects_microspecies() {
        let resp = json!({
            "acidicValuesByPka": [],
            "basicValuesByPka": [],
            "microspecies": [
                { "structure": "CC(=O)[O-]" },
                { "structure": "CC(=O)O" },
            ],
        });
        let r = parse_pka(&resp).unwrap();
        assert_eq!(r.microspecies.len(), 2);
    }

    #[test]
    fn test_parse_ph_indexed_picks_nearest() {
        let values = json!([
            { "pH": 6.9, "logD": 1.0 },
            { "pH": 7.0, "logD": 1.5 },
            { "pH": 7.1, "logD": 2.0 },
        ]);
        assert_eq!(parse_ph_indexed(&values, "logD", 7.04), Some(1.5));
        assert_eq!(parse_ph_indexed(&values, "logD", 7.1), Some(2.0));
    }

    #[test]
    fn test_parse_structure_list() {
        let resp = json!({
            "result": [
                { "structureData": { "structure": "CCO" } },
                { "structureData": { "structure": "CC=O" } },
            ]
        });
        assert_eq!(parse_structure_list(&resp).unwrap(), vec!["CCO", "CC=O"]);
    }

    #[test]
    fn test_ws_conversion() {
        // logS = -3 mol/L at mass 180.159 => 180.159 mg/L
        let ws = ws_mg_per_l(-3.0, 180.159);
        assert!((ws - 180.159).abs() < 1e-6);
    }
}
