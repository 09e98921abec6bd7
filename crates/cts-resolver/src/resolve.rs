//! Chemical resolution: any caller-supplied token becomes a standardized
//! `ChemicalIdentity`.
//!
//! Structure validity is fatal; every enrichment source (CCTE, Cactus,
//! JChem detail) degrades field-wise to `"N/A"` when unavailable.

use std::sync::Arc;

use regex::Regex;
use tracing::{debug, instrument, warn};

use cts_common::error::{CtsError, Result};
use cts_common::models::{smiles_has_carbon, ChemicalIdentity, ChemicalInput, ChemicalType};
use cts_common::NA;
use cts_jchem::StructureService;

use crate::acronyms;
use crate::cactus::CactusClient;
use crate::ccte::{CcteClient, CcteRecord};

pub struct Resolver {
    svc: Arc<dyn StructureService>,
    ccte: Option<CcteClient>,
    cactus: Option<CactusClient>,
}

impl Resolver {
    pub fn new(
        svc: Arc<dyn StructureService>,
        ccte: Option<CcteClient>,
        cactus: Option<CactusClient>,
    ) -> Self {
        Self { svc, ccte, cactus }
    }

    /// Classify an input token. JChem's detector is authoritative; when it
    /// is unreachable, a CCTE hit classifies the token as a registry
    /// identifier (CAS or name).
    #[instrument(skip(self))]
    pub async fn classify(&self, input: &str) -> Result<ChemicalType> {
        match self.svc.detect_type(input).await {
            Ok(t) => Ok(t),
            Err(e) if e.is_retriable() => {
                warn!(error = %e, "JChem type detection unreachable, trying CCTE");
                let ccte = self.ccte.as_ref().ok_or(e)?;
                ccte.search_equal(input).await?;
                if is_cas(input) {
                    Ok(ChemicalType::Cas)
                } else {
                    Ok(ChemicalType::Name)
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve an input to canonical identifiers.
    #[instrument(skip(self, input), fields(chemical = %input.chemical))]
    pub async fn resolve(&self, input: &ChemicalInput) -> Result<ChemicalIdentity> {
        let raw = input.chemical.trim();

        let smiles = match acronyms::lookup(raw) {
            Some(s) => s.to_string(),
            None => self.to_smiles(raw).await?,
        };

        // Unparsable structures and aromaticity errors are fatal; the
        // upstream description goes to the user verbatim. An unreachable
        // checker is not a user error.
        match self.svc.check_structure(&smiles).await {
            Err(e @ CtsError::InvalidChemical(_)) => return Err(e),
            Err(e) => warn!(error = %e, "Structure checker unavailable"),
            Ok(()) => {}
        }

        let mut identity = ChemicalIdentity::from_smiles(&smiles);
        identity.has_carbon = smiles_has_carbon(&smiles);

        // Metabolite nodes are hypothetical structures; registry lookups
        // would only produce noise for them.
        if !input.is_node {
            if let Some(record) = self.registry_record(&smiles, raw).await {
                merge_registry(&mut identity, &record);
            }
        }

        if let Ok(detail) = self.svc.detail(&smiles).await {
            if let Some(f) = detail.formula {
                identity.formula = f;
            }
            if let Some(i) = detail.iupac {
                identity.iupac = i;
            }
            identity.mass = detail.mass.or(identity.mass);
            identity.exact_mass = detail.exact_mass.or(identity.exact_mass);
        }

        if input.get_structure_data {
            identity.structure_data = self.svc.export_structure_data(&smiles).await.ok();
        }

        if let Some(cactus) = &self.cactus {
            match cactus.associated_cas(&smiles).await {
                Ok(list) if !list.is_empty() => identity.cas = list.join(", "),
                Ok(_) => {}
                Err(e) => debug!(error = %e, "Cactus lookup failed (non-fatal)"),
            }
        }

        Ok(identity)
    }

    /// Convert a raw token to SMILES according to its detected type.
    async fn to_smiles(&self, raw: &str) -> Result<String> {
        match self.classify(raw).await? {
            ChemicalType::Smiles | ChemicalType::Smarts => {
                // The downstream resolver mis-parses the short alkane
                // SMILES; resolve them by common name instead.
                if let Some(name) = acronyms::alkane_name(raw) {
                    if let Ok(s) = self.svc.name_to_smiles(name).await {
                        return Ok(s);
                    }
                    return Ok(raw.to_string());
                }
                // Ambiguity check: tokens like PFOS classify as SMILES but
                // are really names. If JChem can read the token as a name,
                // the name interpretation wins.
                match self.svc.name_to_smiles(raw).await {
                    Ok(s) => {
                        debug!(input = raw, smiles = %s, "Input re-routed as a name");
                        Ok(s)
                    }
                    Err(_) => Ok(raw.to_string()),
                }
            }
            ChemicalType::Name | ChemicalType::Cas => self.svc.name_to_smiles(raw).await,
            ChemicalType::Drawn => self.svc.export_smiles(raw).await,
        }
    }

    /// CCTE record with the identifier fallback; `None` when both paths
    /// fail (recoverable).
    async fn registry_record(&self, smiles: &str, raw: &str) -> Option<CcteRecord> {
        let ccte = self.ccte.as_ref()?;
        match ccte.search_equal(smiles).await {
            Ok(r) => Some(r),
            Err(e) => {
                warn!(error = %e, "CCTE search-equal failed, trying chemicalIdentifier");
                ccte.chemical_identifier(raw).await.ok()
            }
        }
    }
}

/// The DTXSID-bearing view takes precedence for the registry fields.
fn merge_registry(identity: &mut ChemicalIdentity, record: &CcteRecord) {
    let set = |field: &mut String, value: &Option<String>| {
        if let Some(v) = value {
            if !v.is_empty() {
                *field = v.clone();
            }
        }
    };
    set(&mut identity.dtxsid, &record.dtxsid);
    set(&mut identity.dtxcid, &record.dtxcid);
    set(&mut identity.casrn, &record.casrn);
    set(&mut identity.preferred_name, &record.preferred_name);
    if identity.iupac == NA {
        set(&mut identity.iupac, &record.iupac_name);
    }
    identity.mass = identity.mass.or(record.average_mass);
    identity.exact_mass = identity.exact_mass.or(record.monoisotopic_mass);
}

fn is_cas(input: &str) -> bool {
    // CAS registry numbers: 2-7 digits, 2 digits, check digit.
    Regex::new(r"^\d{2,7}-\d{2}-\d$")
        .expect("static regex compiles")
        .is_match(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cts_jchem::MockStructureService;

    const PFOS_SMILES: &str =
        "OS(=O)(=O)C(F)(F)C(F)(F)C(F)(F)C(F)(F)C(F)(F)C(F)(F)C(F)(F)C(F)(F)F";

    fn resolver(svc: MockStructureService) -> Resolver {
        Resolver::new(Arc::new(svc), None, None)
    }

    fn plain_input(chemical: &str) -> ChemicalInput {
        ChemicalInput {
            chemical: chemical.to_string(),
            get_structure_data: false,
            is_node: false,
        }
    }

    #[tokio::test]
    async fn test_pfos_ambiguity_reroutes_as_name() {
        // The classifier reads PFOS as SMILES, but JChem can convert it as
        // a name; the name interpretation wins.
        let svc = MockStructureService::new()
            .with_type("PFOS", ChemicalType::Smiles)
            .with_name("PFOS", PFOS_SMILES);
        let identity = resolver(svc).resolve(&plain_input("PFOS")).await.unwrap();
        assert_eq!(identity.smiles, PFOS_SMILES);
        assert_eq!(identity.dtxsid, NA);
    }

    #[tokio::test]
    async fn test_genuine_smiles_passes_through() {
        let svc = MockStructureService::new().with_type("CCO", ChemicalType::Smiles);
        let identity = resolver(svc).resolve(&plain_input("CCO")).await.unwrap();
        assert_eq!(identity.smiles, "CCO");
        assert!(identity.has_carbon);
    }

    #[tokio::test]
    async fn test_alkane_special_case() {
        let svc = MockStructureService::new()
            .with_type("CC", ChemicalType::Smiles)
            .with_name("ethane", "CC");
        let identity = resolver(svc).resolve(&plain_input("CC")).await.unwrap();
        assert_eq!(identity.smiles, "CC");
    }

    #[tokio::test]
    async fn test_name_resolution() {
        let svc = MockStructureService::new()
            .with_type("aspirin", ChemicalType::Name)
            .with_name("aspirin", "CC(=O)OC1=C(C=CC=C1)C(O)=O");
        let identity = resolver(svc).resolve(&plain_input("aspirin")).await.unwrap();
        assert_eq!(identity.smiles, "CC(=O)OC1=C(C=CC=C1)C(O)=O");
        assert_eq!(identity.orig_smiles, identity.smiles);
    }

    #[tokio::test]
    async fn test_acronym_short_circuits_classification() {
        // No type mapping for "pfas": classification would fail, so the
        // acronym table must answer first.
        let svc = MockStructureService::new();
        let identity = resolver(svc).resolve(&plain_input("pfas")).await.unwrap();
        assert!(identity.smiles.starts_with("OC(=O)C(F)(F)"));
    }

    #[tokio::test]
    async fn test_invalid_structure_is_fatal_and_verbatim() {
        let svc = MockStructureService::new()
            .with_type("c1ccc1", ChemicalType::Smiles)
            .with_invalid("c1ccc1", "Aromatic ring cannot be kekulized.");
        match resolver(svc).resolve(&plain_input("c1ccc1")).await {
            Err(CtsError::InvalidChemical(msg)) => {
                assert_eq!(msg, "Aromatic ring cannot be kekulized.")
            }
            other => panic!("expected fatal invalid structure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_structure_data_on_request() {
        let svc = MockStructureService::new().with_type("CCO", ChemicalType::Smiles);
        let input = ChemicalInput {
            chemical: "CCO".into(),
            get_structure_data: true,
            is_node: false,
        };
        let identity = resolver(svc).resolve(&input).await.unwrap();
        assert_eq!(identity.structure_data.as_deref(), Some("<mrv>CCO</mrv>"));
    }

    #[test]
    fn test_is_cas() {
        assert!(is_cas("50-78-2"));
        assert!(is_cas("7732-18-5"));
        assert!(!is_cas("CCO"));
        assert!(!is_cas("50-78"));
    }

    #[test]
    fn test_merge_registry_precedence() {
        let mut identity = ChemicalIdentity::from_smiles("CC(=O)OC1=C(C=CC=C1)C(O)=O");
        let record = CcteRecord {
            dtxsid: Some("DTXSID5020108".into()),
            dtxcid: Some("DTXCID30108".into()),
            casrn: Some("50-78-2".into()),
            preferred_name: Some("Aspirin".into()),
            smiles: None,
            iupac_name: Some("2-acetyloxybenzoic acid".into()),
            average_mass: Some(180.159),
            monoisotopic_mass: None,
        };
        merge_registry(&mut identity, &record);
        assert_eq!(identity.dtxsid, "DTXSID5020108");
        assert_eq!(identity.casrn, "50-78-2");
        assert_eq!(identity.preferred_name, "Aspirin");
        assert_eq!(identity.mass, Some(180.159));
        // cas list stays sentinel until Cactus answers
        assert_eq!(identity.cas, NA);
    }
}
