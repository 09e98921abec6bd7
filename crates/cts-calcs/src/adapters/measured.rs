//! Measured data adapter over the public CCTE property endpoints.
//!
//! Entries are grouped by `(source acronym, property)`; duplicate numeric
//! values under one group are joined with `", "`. Long ACS source citations
//! are compacted to short acronyms.

use async_trait::async_trait;
use tracing::instrument;

use cts_common::error::{CtsError, Result};
use cts_common::models::{Calculator, PchemRequest, PchemResult, Prop, PropData};

use cts_resolver::ccte::{CcteClient, CcteProperty};

use crate::{CalculatorAdapter, MeltingPointSource};

const STOP_WORDS: [&str; 3] = ["and", "of", "the"];

const PROPS: &[Prop] = &[
    Prop::MeltingPoint,
    Prop::BoilingPoint,
    Prop::WaterSol,
    Prop::VaporPress,
    Prop::HenrysLawCon,
    Prop::IonCon,
    Prop::KowNoPh,
    Prop::Koc,
    Prop::LogBcf,
    Prop::LogBaf,
];

/// CCTE property names for the internal vocabulary.
fn upstream_name(prop: Prop) -> Option<&'static str> {
    match prop {
        Prop::MeltingPoint => Some("Melting Point"),
        Prop::BoilingPoint => Some("Boiling Point"),
        Prop::WaterSol => Some("Water Solubility"),
        Prop::VaporPress => Some("Vapor Pressure"),
        Prop::HenrysLawCon => Some("Henry's Law"),
        Prop::IonCon => Some("pKa"),
        Prop::KowNoPh => Some("LogKow: Octanol-Water"),
        Prop::Koc => Some("Soil Adsorption Coefficient"),
        Prop::LogBcf => Some("Bioconcentration Factor"),
        Prop::LogBaf => Some("Bioaccumulation Factor"),
        Prop::Qsar | Prop::KowWph | Prop::WaterSolPh => None,
    }
}

/// Fate endpoints live under a separate CCTE route.
fn is_fate_prop(prop: Prop) -> bool {
    matches!(prop, Prop::Koc | Prop::LogBcf | Prop::LogBaf)
}

pub struct MeasuredAdapter {
    ccte: CcteClient,
}

impl MeasuredAdapter {
    pub fn new(ccte: CcteClient) -> Self {
        Self { ccte }
    }

    async fn dtxsid_for(&self, chemical: &str) -> Result<String> {
        let record = self.ccte.search_equal(chemical).await?;
        record
            .dtxsid
            .ok_or_else(|| CtsError::NoData("DTXSID".into()))
    }
}

#[async_trait]
impl CalculatorAdapter for MeasuredAdapter {
    fn calc(&self) -> Calculator {
        Calculator::Measured
    }

    fn props(&self) -> &'static [Prop] {
        PROPS
    }

    #[instrument(skip(self, req), fields(chemical = %req.chemical))]
    async fn run(&self, req: &PchemRequest) -> Result<Vec<PchemResult>> {
        let props = req.requested_props();
        let dtxsid = self.dtxsid_for(&req.chemical).await?;

        let needs_fate = props.iter().any(|p| is_fate_prop(*p));
        let needs_pchem = props.iter().any(|p| !is_fate_prop(*p));

        let mut entries = Vec::new();
        if needs_pchem {
            entries.extend(self.ccte.properties_by_dtxsid(&dtxsid).await?);
        }
        if needs_fate {
            entries.extend(self.ccte.fate_by_dtxsid(&dtxsid).await?);
        }

        Ok(props
            .into_iter()
            .map(|prop| shape_result(req, prop, &entries))
            .collect())
    }
}

fn shape_result(req: &PchemRequest, prop: Prop, entries: &[CcteProperty]) -> PchemResult {
    let Some(upstream) = upstream_name(prop) else {
        return PchemResult::fail(req, prop, "Property not served by measured data");
    };

    let groups = group_by_source(entries, upstream);
    if groups.is_empty() {
        return PchemResult::ok(req, prop, PropData::na());
    }

    let mut env = PchemResult::ok(
        req,
        prop,
        PropData::Object(serde_json::to_value(&groups).unwrap_or_default()),
    );
    // Measured values carry their source as the method label.
    env.method = Some(groups[0].0.clone());
    env
}

/// Group matching entries by source acronym; duplicate values under one
/// source join with `", "`.
fn group_by_source(entries: &[CcteProperty], upstream: &str) -> Vec<(String, String)> {
    let mut groups: Vec<(String, String)> = Vec::new();
    for entry in entries {
        if !entry.prop_name.starts_with(upstream) {
            continue;
        }
        let Some(value) = entry.value else { continue };
        let acronym = entry
            .source
            .as_deref()
            .map(acs_acronym)
            .unwrap_or_else(|| "unknown".to_string());

        match groups.iter_mut().find(|(a, _)| *a == acronym) {
            Some((_, joined)) => {
                joined.push_str(", ");
                joined.push_str(&value.to_string());
            }
            None => groups.push((acronym, value.to_string())),
        }
    }
    groups
}

/// Compact an ACS source citation to an acronym: non-letters dropped,
/// stop-words skipped. A single mixed-case token keeps its upper-case
/// letters only (`PhysProp` → `PP`).
pub fn acs_acronym(source: &str) -> String {
    let cleaned: String = source
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect();
    let trimmed = cleaned.trim();

    if !trimmed.contains(' ') {
        let has_upper = trimmed.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = trimmed.chars().any(|c| c.is_ascii_lowercase());
        if has_upper && has_lower {
            return trimmed.chars().filter(|c| c.is_ascii_uppercase()).collect();
        }
        return trimmed.to_string();
    }

    trimmed
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .filter_map(|w| w.chars().next())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[async_trait]
impl MeltingPointSource for MeasuredAdapter {
    async fn melting_point(&self, smiles: &str) -> Option<f64> {
        let dtxsid = self.dtxsid_for(smiles).await.ok()?;
        let entries = self.ccte.properties_by_dtxsid(&dtxsid).await.ok()?;
        entries
            .iter()
            .find(|e| e.prop_name.starts_with("Melting Point"))
            .and_then(|e| e.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(prop: &str, value: f64, source: &str) -> CcteProperty {
        CcteProperty {
            prop_name: prop.to_string(),
            value: Some(value),
            unit: None,
            source: Some(source.to_string()),
        }
    }

    #[test]
    fn test_acs_acronym_multiword_skips_stop_words() {
        assert_eq!(
            acs_acronym("Journal of the American Chemical Society"),
            "JACS"
        );
        assert_eq!(acs_acronym("Handbook of Chemistry and Physics"), "HCP");
    }

    #[test]
    fn test_acs_acronym_mixed_case_single_word() {
        assert_eq!(acs_acronym("PhysProp"), "PP");
        assert_eq!(acs_acronym("EPISUITE"), "EPISUITE");
    }

    #[test]
    fn test_acs_acronym_strips_non_letters() {
        assert_eq!(acs_acronym("Lange's Handbook of Chemistry"), "LHC");
    }

    #[test]
    fn test_group_by_source_joins_duplicates() {
        let entries = vec![
            entry("Melting Point", 135.0, "PhysProp"),
            entry("Melting Point", 136.0, "PhysProp"),
            entry("Melting Point", 134.5, "Handbook of Chemistry and Physics"),
            entry("Boiling Point", 246.0, "PhysProp"),
        ];
        let groups = group_by_source(&entries, "Melting Point");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], ("PP".to_string(), "135, 136".to_string()));
        assert_eq!(groups[1], ("HCP".to_string(), "134.5".to_string()));
    }

    #[test]
    fn test_shape_result_no_entries_is_na() {
        let req = PchemRequest::new("CCO", Calculator::Measured, Prop::Koc);
        let env = shape_result(&req, Prop::Koc, &[]);
        assert!(env.valid);
        assert!(env.data.is_na());
    }
}
