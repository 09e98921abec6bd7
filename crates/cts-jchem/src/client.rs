//! JChem REST client base and structure utilities.

use serde_json::{json, Value};
use tracing::{debug, instrument};

use cts_common::client::UpstreamClient;
use cts_common::config::JCHEM_TIMEOUT;
use cts_common::error::{CtsError, Result};
use cts_common::models::{ChemicalDetail, ChemicalType};

const REST_ROOT: &str = "webservices/rest-v0/util";

/// Standardizer actions used by the SMILES filter.
pub const ACTION_REMOVE_EXPLICIT_H: &str =
    "removeexplicitH..transform..[N:1](=[O:2])=[O:3]>>[N+:1](=[O:2])[O-:3]";
pub const ACTION_NEUTRALIZE: &str = "neutralize";
pub const ACTION_CLEAR_STEREO: &str = "clearstereo";

#[derive(Debug, Clone)]
pub struct JchemClient {
    client: UpstreamClient,
    base: String,
}

impl JchemClient {
    pub fn new(client: UpstreamClient, base_url: &str) -> Self {
        Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base, REST_ROOT, path)
    }

    pub(crate) async fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.client.post_json(&self.url(path), &body, JCHEM_TIMEOUT).await
    }

    /// Ask JChem what kind of token this is (SMILES, name, CAS, drawn
    /// structure, ...).
    #[instrument(skip(self))]
    pub async fn detect_type(&self, input: &str) -> Result<ChemicalType> {
        let resp = self.post("analyze", json!({ "structure": input })).await?;
        let format = resp["type"]
            .as_str()
            .ok_or_else(|| CtsError::NoData("chemical type".into()))?;
        debug!(input = input, format = format, "JChem type detection");
        parse_chemical_type(format)
    }

    /// Validate a structure. Aromaticity errors come back verbatim so the
    /// caller can show them to the user.
    #[instrument(skip(self))]
    pub async fn check_structure(&self, smiles: &str) -> Result<()> {
        let resp = self
            .post(
                "convert/structureChecker",
                json!({
                    "structure": smiles,
                    "parameters": "aromaticity...valence",
                }),
            )
            .await?;

        if let Some(err) = resp["error"].as_str() {
            return Err(CtsError::InvalidChemical(err.to_string()));
        }
        Ok(())
    }

    /// Convert any JChem-readable input (name, CAS, MRV drawing) to SMILES.
    #[instrument(skip(self))]
    pub async fn mol_export(&self, input: &str) -> Result<String> {
        let resp = self
            .post(
                "convert/molExport",
                json!({ "structure": input, "parameters": "smiles" }),
            )
            .await?;
        resp["structure"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| CtsError::NoData("exported SMILES".into()))
    }

    /// Export the drawable structure payload (MRV) for a SMILES.
    pub async fn export_structure_data(&self, smiles: &str) -> Result<String> {
        let resp = self
            .post(
                "convert/molExport",
                json!({ "structure": smiles, "parameters": "mrv" }),
            )
            .await?;
        resp["structure"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| CtsError::NoData("structure data".into()))
    }

    /// Run a standardizer action string over a structure.
    #[instrument(skip(self))]
    pub async fn standardize(&self, smiles: &str, actions: &str) -> Result<String> {
        let resp = self
            .post(
                "convert/standardizer",
                json!({
                    "structure": smiles,
                    "parameters": { "standardizerDefinition": actions },
                }),
            )
            .await?;
        resp["structure"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| CtsError::NoData("standardized structure".into()))
    }

    /// Formula, IUPAC name, average and monoisotopic mass.
    #[instrument(skip(self))]
    pub async fn detail(&self, smiles: &str) -> Result<ChemicalDetail> {
        let resp = self
            .post(
                "detail",
                json!({
                    "structures": [{ "structure": smiles }],
                    "display": {
                        "include": ["structureData"],
                        "additionalFields": {
                            "formula": "chemicalTerms(formula)",
                            "iupac": "chemicalTerms(name)",
                            "mass": "chemicalTerms(mass)",
                            "exactMass": "chemicalTerms(exactMass)",
                        },
                    },
                }),
            )
            .await?;
        parse_detail(&resp)
    }
}

pub(crate) fn parse_chemical_type(format: &str) -> Result<ChemicalType> {
    match format {
        "smiles" => Ok(ChemicalType::Smiles),
        "smarts" => Ok(ChemicalType::Smarts),
        "name" => Ok(ChemicalType::Name),
        "cas" => Ok(ChemicalType::Cas),
        "mrv" => Ok(ChemicalType::Drawn),
        other => Err(CtsError::InvalidChemical(format!(
            "Unrecognized chemical format: {}",
            other
        ))),
    }
}

pub(crate) fn parse_detail(resp: &Value) -> Result<ChemicalDetail> {
    let entry = resp["data"]
        .as_array()
        .and_then(|a| a.first())
        .ok_or_else(|| CtsError::NoData("chemical detail".into()))?;

    Ok(ChemicalDetail {
        formula: entry["formula"].as_str().map(String::from),
        iupac: entry["iupac"].as_str().map(String::from),
        mass: entry["mass"].as_f64(),
        exact_mass: entry["exactMass"].as_f64(),
        structure_data: entry["structureData"]["structure"].as_str().map(String::from),
    })
}
