//! Data model shared across the gateway crates.
//!
//! Everything crossing a crate boundary is a typed struct; upstream payloads
//! stay `serde_json::Value` inside the adapter that parses them. Fields no
//! source could supply carry the `"N/A"` sentinel rather than being omitted,
//! matching the wire shape callers expect.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::NA;

// ── Calculators and properties ─────────────────────────────────────────────

/// Every upstream the dispatcher can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Calculator {
    Chemaxon,
    Epi,
    Opera,
    Sparc,
    Test,
    Measured,
    Molgpka,
    Pkasolver,
    Metabolizer,
    Envipath,
    Biotrans,
}

impl Calculator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Calculator::Chemaxon => "chemaxon",
            Calculator::Epi => "epi",
            Calculator::Opera => "opera",
            Calculator::Sparc => "sparc",
            Calculator::Test => "test",
            Calculator::Measured => "measured",
            Calculator::Molgpka => "molgpka",
            Calculator::Pkasolver => "pkasolver",
            Calculator::Metabolizer => "metabolizer",
            Calculator::Envipath => "envipath",
            Calculator::Biotrans => "biotrans",
        }
    }

    /// Tree builders, as opposed to pchem calculators.
    pub fn is_transformation(&self) -> bool {
        matches!(
            self,
            Calculator::Metabolizer | Calculator::Envipath | Calculator::Biotrans
        )
    }
}

impl fmt::Display for Calculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Calculator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chemaxon" => Ok(Calculator::Chemaxon),
            "epi" => Ok(Calculator::Epi),
            "opera" => Ok(Calculator::Opera),
            "test" => Ok(Calculator::Test),
            "sparc" => Ok(Calculator::Sparc),
            "measured" => Ok(Calculator::Measured),
            "molgpka" => Ok(Calculator::Molgpka),
            "pkasolver" => Ok(Calculator::Pkasolver),
            "metabolizer" => Ok(Calculator::Metabolizer),
            "envipath" => Ok(Calculator::Envipath),
            "biotrans" => Ok(Calculator::Biotrans),
            other => Err(format!("Unknown calculator: {}", other)),
        }
    }
}

/// Canonical internal property vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prop {
    BoilingPoint,
    MeltingPoint,
    WaterSol,
    WaterSolPh,
    VaporPress,
    HenrysLawCon,
    IonCon,
    KowNoPh,
    KowWph,
    Koc,
    LogBcf,
    LogBaf,
    Qsar,
}

impl Prop {
    pub fn as_str(&self) -> &'static str {
        match self {
            Prop::BoilingPoint => "boiling_point",
            Prop::MeltingPoint => "melting_point",
            Prop::WaterSol => "water_sol",
            Prop::WaterSolPh => "water_sol_ph",
            Prop::VaporPress => "vapor_press",
            Prop::HenrysLawCon => "henrys_law_con",
            Prop::IonCon => "ion_con",
            Prop::KowNoPh => "kow_no_ph",
            Prop::KowWph => "kow_wph",
            Prop::Koc => "koc",
            Prop::LogBcf => "log_bcf",
            Prop::LogBaf => "log_baf",
            Prop::Qsar => "qsar",
        }
    }
}

impl fmt::Display for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Prop {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "boiling_point" => Ok(Prop::BoilingPoint),
            "melting_point" => Ok(Prop::MeltingPoint),
            "water_sol" => Ok(Prop::WaterSol),
            "water_sol_ph" => Ok(Prop::WaterSolPh),
            "vapor_press" => Ok(Prop::VaporPress),
            "henrys_law_con" => Ok(Prop::HenrysLawCon),
            "ion_con" => Ok(Prop::IonCon),
            "kow_no_ph" => Ok(Prop::KowNoPh),
            "kow_wph" => Ok(Prop::KowWph),
            "koc" => Ok(Prop::Koc),
            "log_bcf" => Ok(Prop::LogBcf),
            "log_baf" => Ok(Prop::LogBaf),
            "qsar" => Ok(Prop::Qsar),
            other => Err(format!("Unknown property: {}", other)),
        }
    }
}

// ── Chemical identity ──────────────────────────────────────────────────────

/// What JChem's type detector can say about an input token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChemicalType {
    Smiles,
    Smarts,
    Name,
    Cas,
    Drawn,
}

/// What the caller supplies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChemicalInput {
    pub chemical: String,
    #[serde(rename = "getStructureData", default)]
    pub get_structure_data: bool,
    #[serde(rename = "isNode", default)]
    pub is_node: bool,
}

/// Resolved canonical record. Missing fields carry `"N/A"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChemicalIdentity {
    /// SMILES before the normalization filter ran.
    pub orig_smiles: String,
    /// SMILES after filtering.
    pub smiles: String,
    pub dtxsid: String,
    pub dtxcid: String,
    /// Preferred CAS number.
    pub casrn: String,
    /// Associated CAS list from the NCI resolver.
    pub cas: String,
    #[serde(rename = "preferredName")]
    pub preferred_name: String,
    pub iupac: String,
    pub formula: String,
    /// Average molecular weight, g/mol.
    pub mass: Option<f64>,
    /// Monoisotopic mass.
    #[serde(rename = "exactMass")]
    pub exact_mass: Option<f64>,
    #[serde(rename = "structureData", skip_serializing_if = "Option::is_none")]
    pub structure_data: Option<String>,
    #[serde(rename = "hasCarbon")]
    pub has_carbon: bool,
}

impl ChemicalIdentity {
    /// An identity where every enrichment field is still the sentinel.
    pub fn from_smiles(smiles: &str) -> Self {
        Self {
            orig_smiles: smiles.to_string(),
            smiles: smiles.to_string(),
            dtxsid: NA.into(),
            dtxcid: NA.into(),
            casrn: NA.into(),
            cas: NA.into(),
            preferred_name: NA.into(),
            iupac: NA.into(),
            formula: NA.into(),
            mass: None,
            exact_mass: None,
            structure_data: None,
            has_carbon: smiles_has_carbon(smiles),
        }
    }
}

/// Formula/mass detail block from JChem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChemicalDetail {
    pub formula: Option<String>,
    pub iupac: Option<String>,
    pub mass: Option<f64>,
    #[serde(rename = "exactMass")]
    pub exact_mass: Option<f64>,
    #[serde(rename = "structureData")]
    pub structure_data: Option<String>,
}

/// True if the SMILES contains at least one carbon atom. Aromatic carbons
/// count; Ca/Cd/Cl/Co/Cr/Cs/Cu and Sc must not.
pub fn smiles_has_carbon(smiles: &str) -> bool {
    let bytes = smiles.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'C' => {
                let next = bytes.get(i + 1).copied();
                let two_letter = matches!(
                    next,
                    Some(b'a') | Some(b'd') | Some(b'l') | Some(b'o') | Some(b'r')
                        | Some(b's') | Some(b'u') | Some(b'e') | Some(b'f') | Some(b'm')
                );
                if !two_letter {
                    return true;
                }
            }
            b'c' => {
                // aromatic carbon, unless it's the second letter of Sc/Ac/Tc
                let prev = if i == 0 { None } else { Some(bytes[i - 1]) };
                if !matches!(prev, Some(b'S') | Some(b'A') | Some(b'T')) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

// ── Requests ───────────────────────────────────────────────────────────────

fn default_ph() -> f64 {
    7.0
}

/// A physicochemical property request, after ingress parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PchemRequest {
    pub chemical: String,
    pub calc: Calculator,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prop: Option<Prop>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<Prop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default = "default_ph")]
    pub ph: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    #[serde(rename = "node", skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Opaque passthroughs (`sessionid`, tree bookkeeping) echoed back
    /// untouched in `request_post`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PchemRequest {
    pub fn new(chemical: &str, calc: Calculator, prop: Prop) -> Self {
        Self {
            chemical: chemical.to_string(),
            calc,
            prop: Some(prop),
            props: Vec::new(),
            method: None,
            ph: default_ph(),
            mass: None,
            node_id: None,
            extra: BTreeMap::new(),
        }
    }

    /// The properties this request asks for, whether it used `prop` or
    /// `props`.
    pub fn requested_props(&self) -> Vec<Prop> {
        if !self.props.is_empty() {
            self.props.clone()
        } else {
            self.prop.into_iter().collect()
        }
    }
}

// ── Result envelopes ───────────────────────────────────────────────────────

/// The `data` field of an envelope: a scalar, a short string (including the
/// `"N/A"` sentinel), a pKa/pKb pair of lists, or a small structured object.
/// Never a raw upstream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropData {
    Scalar(f64),
    Text(String),
    Ion {
        #[serde(rename = "pKa")]
        pka: Vec<f64>,
        #[serde(rename = "pKb")]
        pkb: Vec<f64>,
    },
    Object(Value),
}

impl PropData {
    pub fn na() -> Self {
        PropData::Text(NA.into())
    }

    pub fn is_na(&self) -> bool {
        matches!(self, PropData::Text(t) if t == NA)
    }
}

/// The uniform per-property envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PchemResult {
    pub calc: Calculator,
    pub prop: Prop,
    pub data: PropData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub chemical: String,
    #[serde(rename = "node", skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Echo of the inbound request for correlation.
    pub request_post: Value,
}

impl PchemResult {
    pub fn ok(req: &PchemRequest, prop: Prop, data: PropData) -> Self {
        Self {
            calc: req.calc,
            prop,
            data,
            method: req.method.clone(),
            chemical: req.chemical.clone(),
            node_id: req.node_id.clone(),
            valid: true,
            error: None,
            request_post: serde_json::to_value(req).unwrap_or(Value::Null),
        }
    }

    pub fn fail(req: &PchemRequest, prop: Prop, error: &str) -> Self {
        Self {
            calc: req.calc,
            prop,
            data: PropData::na(),
            method: req.method.clone(),
            chemical: req.chemical.clone(),
            node_id: req.node_id.clone(),
            valid: false,
            error: Some(error.to_string()),
            request_post: serde_json::to_value(req).unwrap_or(Value::Null),
        }
    }
}

// ── Metabolite trees ───────────────────────────────────────────────────────

/// Ranking fields are numeric for ranked libraries and `"N/A"` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RankValue {
    Num(f64),
    Text(String),
}

impl RankValue {
    pub fn na() -> Self {
        RankValue::Text(NA.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaboliteNode {
    /// Pre-order id; the root gets 1.
    pub id: u32,
    pub smiles: String,
    /// Reaction route label.
    pub routes: String,
    /// 0 for the parent chemical.
    pub generation: u32,
    pub accumulation: RankValue,
    pub production: RankValue,
    #[serde(rename = "globalAccumulation")]
    pub global_accumulation: RankValue,
    pub likelihood: RankValue,
    #[serde(default)]
    pub children: Vec<MetaboliteNode>,
}

impl MetaboliteNode {
    pub fn unranked(id: u32, smiles: &str, routes: &str, generation: u32) -> Self {
        Self {
            id,
            smiles: smiles.to_string(),
            routes: routes.to_string(),
            generation,
            accumulation: RankValue::na(),
            production: RankValue::na(),
            global_accumulation: RankValue::na(),
            likelihood: RankValue::na(),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaboliteTree {
    pub tree: MetaboliteNode,
    /// Count of non-root nodes.
    pub total_products: u32,
    /// Count of distinct SMILES below the root.
    pub unique_products: u32,
}

// ── QSAR ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QsarChild {
    pub smiles: String,
    pub routes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QsarRequest {
    pub parent_smiles: String,
    pub children: Vec<QsarChild>,
    pub product_count: usize,
    #[serde(rename = "uniqueSchemesCount")]
    pub unique_schemes_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculator_round_trip() {
        for name in ["chemaxon", "epi", "opera", "sparc", "test", "measured",
                      "molgpka", "pkasolver", "metabolizer", "envipath", "biotrans"] {
            let calc: Calculator = name.parse().unwrap();
            assert_eq!(calc.as_str(), name);
            let json = serde_json::to_string(&calc).unwrap();
            assert_eq!(json, format!("\"{}\"", name));
        }
    }

    #[test]
    fn test_prop_serde_names_are_snake_case() {
        let json = serde_json::to_string(&Prop::HenrysLawCon).unwrap();
        assert_eq!(json, "\"henrys_law_con\"");
        let p: Prop = serde_json::from_str("\"kow_no_ph\"").unwrap();
        assert_eq!(p, Prop::KowNoPh);
    }

    #[test]
    fn test_prop_data_wire_shapes() {
        assert_eq!(serde_json::to_string(&PropData::Scalar(2.5)).unwrap(), "2.5");
        assert_eq!(serde_json::to_string(&PropData::na()).unwrap(), "\"N/A\"");
        let ion = PropData::Ion { pka: vec![3.5, 9.1], pkb: vec![] };
        assert_eq!(
            serde_json::to_string(&ion).unwrap(),
            r#"{"pKa":[3.5,9.1],"pKb":[]}"#
        );
    }

    #[test]
    fn test_requested_props_prefers_list() {
        let mut req = PchemRequest::new("CCO", Calculator::Opera, Prop::IonCon);
        assert_eq!(req.requested_props(), vec![Prop::IonCon]);
        req.props = vec![Prop::VaporPress, Prop::WaterSol];
        assert_eq!(req.requested_props(), vec![Prop::VaporPress, Prop::WaterSol]);
    }

    #[test]
    fn test_envelope_echoes_request() {
        let req = PchemRequest::new("CCO", Calculator::Epi, Prop::MeltingPoint);
        let env = PchemResult::ok(&req, Prop::MeltingPoint, PropData::Scalar(-114.1));
        assert!(env.valid);
        assert_eq!(env.request_post["chemical"], "CCO");
        assert_eq!(env.request_post["calc"], "epi");
    }

    #[test]
    fn test_smiles_has_carbon() {
        assert!(smiles_has_carbon("CCO"));
        assert!(smiles_has_carbon("c1ccccc1"));
        assert!(smiles_has_carbon("ClC(Cl)Cl")); // Cl then a real C
        assert!(!smiles_has_carbon("[Cl-].[Na+]"));
        assert!(!smiles_has_carbon("O=S(=O)(O)O"));
        assert!(!smiles_has_carbon("[Ca+2]"));
    }

    #[test]
    fn test_extra_fields_flatten_through() {
        let json = r#"{"chemical":"CCO","calc":"epi","prop":"melting_point","sessionid":"abc123"}"#;
        let req: PchemRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.extra["sessionid"], "abc123");
        let back = serde_json::to_value(&req).unwrap();
        assert_eq!(back["sessionid"], "abc123");
    }
}
