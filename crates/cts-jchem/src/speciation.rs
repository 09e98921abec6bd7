//! Chemical speciation: several JChem calls composed under one operation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use cts_common::error::Result;

use crate::client::JchemClient;
use crate::properties::PkaResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciationRequest {
    pub smiles: String,
    #[serde(default)]
    pub get_pka: bool,
    #[serde(default)]
    pub get_taut: bool,
    #[serde(default)]
    pub get_stereo: bool,
    #[serde(default = "default_ph")]
    pub ph: f64,
}

fn default_ph() -> f64 {
    7.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeciationResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pka: Option<PkaResult>,
    #[serde(rename = "isoelectricPoint", skip_serializing_if = "Option::is_none")]
    pub isoelectric_point: Option<f64>,
    #[serde(rename = "majorMicrospecies", skip_serializing_if = "Option::is_none")]
    pub major_microspecies: Option<String>,
    /// Microspecies keyed `microspecies1..N`, ordered by descending formal
    /// charge.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub microspecies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tautomers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stereoisomers: Vec<String>,
}

impl JchemClient {
    /// Compose pKa / tautomer / stereoisomer calls under flag control.
    /// Individual calculation failures leave their section empty rather
    /// than failing the whole speciation.
    #[instrument(skip(self, req), fields(smiles = %req.smiles))]
    pub async fn speciation(&self, req: &SpeciationRequest) -> Result<SpeciationResult> {
        let mut out = SpeciationResult::default();

        if req.get_pka {
            if let Ok(pka) = self.pka(&req.smiles).await {
                out.microspecies = key_microspecies(&pka.microspecies);
                out.pka = Some(pka);
            }
            out.isoelectric_point = self.isoelectric_point(&req.smiles).await.ok();
            out.major_microspecies = self.major_microspecies(&req.smiles, req.ph).await.ok();
        }
        if req.get_taut {
            out.tautomers = self.tautomers(&req.smiles).await.unwrap_or_default();
        }
        if req.get_stereo {
            out.stereoisomers = self.stereoisomers(&req.smiles).await.unwrap_or_default();
        }

        Ok(out)
    }
}

/// Net formal charge of a SMILES, summed over bracket atoms.
pub fn formal_charge(smiles: &str) -> i32 {
    let mut total = 0i32;
    let bytes = smiles.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'[' {
            let end = match bytes[i..].iter().position(|&b| b == b']') {
                Some(off) => i + off,
                None => break,
            };
            total += bracket_charge(&smiles[i + 1..end]);
            i = end;
        }
        i += 1;
    }
    total
}

fn bracket_charge(atom: &str) -> i32 {
    let bytes = atom.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        let sign = match b {
            b'+' => 1,
            b'-' => -1,
            _ => continue,
        };
        // [O-], [N+2], [Fe++]
        let rest = &atom[i + 1..];
        if let Ok(n) = rest.parse::<i32>() {
            return sign * n;
        }
        let repeats = 1 + rest.bytes().take_while(|&c| c == b).count() as i32;
        return sign * repeats;
    }
    0
}

/// Assign stable `microspecies1..N` keys, most positively charged first.
pub fn key_microspecies(structures: &[String]) -> BTreeMap<String, String> {
    let mut ranked: Vec<&String> = structures.iter().collect();
    ranked.sort_by_key(|s| std::cmp::Reverse(formal_charge(s)));

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, s)| (format!("microspecies{}", i + 1), s.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formal_charge() {
        assert_eq!(formal_charge("CC(=O)[O-]"), -1);
        assert_eq!(formal_charge("C[N+](C)(C)C"), 1);
        assert_eq!(formal_charge("[N+](=O)[O-]c1ccccc1"), 0);
        assert_eq!(formal_charge("[Fe+2]"), 2);
        assert_eq!(formal_charge("[Fe++]"), 2);
        assert_eq!(formal_charge("CCO"), 0);
    }

    #[test]
    fn test_key_microspecies_orders_by_descending_charge() {
        let structures = vec![
            "CC(=O)[O-]".to_string(),
            "CC(=O)O".to_string(),
            "CC(=[OH+])O".to_string(),
        ];
        let keyed = key_microspecies(&structures);
        assert_eq!(keyed["microspecies1"], "CC(=[OH+])O");
        assert_eq!(keyed["microspecies2"], "CC(=O)O");
        assert_eq!(keyed["microspecies3"], "CC(=O)[O-]");
    }
}
