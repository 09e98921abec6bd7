//! Trait seam over the JChem structure utilities.
//!
//! The resolver and the SMILES filter talk to this trait rather than the
//! concrete client so their logic can be tested against a mock.

use std::collections::HashMap;

use async_trait::async_trait;

use cts_common::error::{CtsError, Result};
use cts_common::models::{ChemicalDetail, ChemicalType};

use crate::client::{
    JchemClient, ACTION_CLEAR_STEREO, ACTION_NEUTRALIZE, ACTION_REMOVE_EXPLICIT_H,
};

#[async_trait]
pub trait StructureService: Send + Sync {
    async fn detect_type(&self, input: &str) -> Result<ChemicalType>;
    async fn check_structure(&self, smiles: &str) -> Result<()>;
    /// Convert a name (or CAS) to SMILES; fails if JChem cannot read the
    /// token as a name.
    async fn name_to_smiles(&self, name: &str) -> Result<String>;
    /// Convert a drawn-structure payload to SMILES.
    async fn export_smiles(&self, drawn: &str) -> Result<String>;
    async fn export_structure_data(&self, smiles: &str) -> Result<String>;
    /// Stage 1 of the filter: remove explicit hydrogens and rewrite nitro
    /// groups to charge-separated form.
    async fn standardize(&self, smiles: &str) -> Result<String>;
    async fn major_tautomer(&self, smiles: &str) -> Result<String>;
    async fn neutralize(&self, smiles: &str) -> Result<String>;
    async fn clear_stereo(&self, smiles: &str) -> Result<String>;
    async fn detail(&self, smiles: &str) -> Result<ChemicalDetail>;
}

#[async_trait]
impl StructureService for JchemClient {
    async fn detect_type(&self, input: &str) -> Result<ChemicalType> {
        JchemClient::detect_type(self, input).await
    }

    async fn check_structure(&self, smiles: &str) -> Result<()> {
        JchemClient::check_structure(self, smiles).await
    }

    async fn name_to_smiles(&self, name: &str) -> Result<String> {
        self.mol_export(name).await
    }

    async fn export_smiles(&self, drawn: &str) -> Result<String> {
        self.mol_export(drawn).await
    }

    async fn export_structure_data(&self, smiles: &str) -> Result<String> {
        JchemClient::export_structure_data(self, smiles).await
    }

    async fn standardize(&self, smiles: &str) -> Result<String> {
        JchemClient::standardize(self, smiles, ACTION_REMOVE_EXPLICIT_H).await
    }

    async fn major_tautomer(&self, smiles: &str) -> Result<String> {
        let tauts = self.tautomers(smiles).await?;
        tauts
            .into_iter()
            .next()
            .ok_or_else(|| CtsError::NoData("dominant tautomer".into()))
    }

    async fn neutralize(&self, smiles: &str) -> Result<String> {
        JchemClient::standardize(self, smiles, ACTION_NEUTRALIZE).await
    }

    async fn clear_stereo(&self, smiles: &str) -> Result<String> {
        JchemClient::standardize(self, smiles, ACTION_CLEAR_STEREO).await
    }

    async fn detail(&self, smiles: &str) -> Result<ChemicalDetail> {
        JchemClient::detail(self, smiles).await
    }
}

// ── Mock implementation for testing ────────────────────────────────────────

/// Canned-response structure service. Unmapped inputs echo back unchanged
/// for the rewrite stages and fail for the conversions, which mirrors how
/// the filter degrades on upstream errors.
#[derive(Default)]
pub struct MockStructureService {
    pub types: HashMap<String, ChemicalType>,
    pub names: HashMap<String, String>,
    pub standardized: HashMap<String, String>,
    pub tautomers: HashMap<String, String>,
    pub neutralized: HashMap<String, String>,
    pub stereo_cleared: HashMap<String, String>,
    pub masses: HashMap<String, f64>,
    pub invalid: HashMap<String, String>,
}

impl MockStructureService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, input: &str, t: ChemicalType) -> Self {
        self.types.insert(input.to_string(), t);
        self
    }

    pub fn with_name(mut self, name: &str, smiles: &str) -> Self {
        self.names.insert(name.to_string(), smiles.to_string());
        self
    }

    pub fn with_mass(mut self, smiles: &str, mass: f64) -> Self {
        self.masses.insert(smiles.to_string(), mass);
        self
    }

    pub fn with_invalid(mut self, smiles: &str, reason: &str) -> Self {
        self.invalid.insert(smiles.to_string(), reason.to_string());
        self
    }

    pub fn with_stereo_cleared(mut self, input: &str, output: &str) -> Self {
        self.stereo_cleared.insert(input.to_string(), output.to_string());
        self
    }

    fn rewrite(map: &HashMap<String, String>, input: &str) -> String {
        map.get(input).cloned().unwrap_or_else(|| input.to_string())
    }
}

#[async_trait]
impl StructureService for MockStructureService {
    async fn detect_type(&self, input: &str) -> Result<ChemicalType> {
        self.types
            .get(input)
            .copied()
            .ok_or_else(|| CtsError::Network("mock: type service down".into()))
    }

    async fn check_structure(&self, smiles: &str) -> Result<()> {
        match self.invalid.get(smiles) {
            Some(reason) => Err(CtsError::InvalidChemical(reason.clone())),
            None => Ok(()),
        }
    }

    async fn name_to_smiles(&self, name: &str) -> Result<String> {
        self.names
            .get(name)
            .cloned()
            .ok_or_else(|| CtsError::InvalidChemical(format!("Not a name: {}", name)))
    }

    async fn export_smiles(&self, drawn: &str) -> Result<String> {
        self.names
            .get(drawn)
            .cloned()
            .ok_or_else(|| CtsError::InvalidChemical("mock: cannot export".into()))
    }

    async fn export_structure_data(&self, smiles: &str) -> Result<String> {
        Ok(format!("<mrv>{}</mrv>", smiles))
    }

    async fn standardize(&self, smiles: &str) -> Result<String> {
        Ok(Self::rewrite(&self.standardized, smiles))
    }

    async fn major_tautomer(&self, smiles: &str) -> Result<String> {
        Ok(Self::rewrite(&self.tautomers, smiles))
    }

    async fn neutralize(&self, smiles: &str) -> Result<String> {
        Ok(Self::rewrite(&self.neutralized, smiles))
    }

    async fn clear_stereo(&self, smiles: &str) -> Result<String> {
        Ok(Self::rewrite(&self.stereo_cleared, smiles))
    }

    async fn detail(&self, smiles: &str) -> Result<ChemicalDetail> {
        Ok(ChemicalDetail {
            formula: None,
            iupac: None,
            mass: self.masses.get(smiles).copied(),
            exact_mass: None,
            structure_data: None,
        })
    }
}
