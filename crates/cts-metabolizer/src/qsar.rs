//! Hydrolysis half-life selection for metabolite children.
//!
//! Each child's reaction route picks an EPI hydrolysis sub-endpoint; the
//! returned rate entries (`Ka`/`Kb`/`Kn`, optionally tagged with the
//! reacting atom) are then narrowed down by a case analysis over the
//! number of reactive sites and the number of distinct reaction schemes.

use std::collections::HashMap;

use tracing::{debug, instrument};

use cts_calcs::adapters::{EpiHydrolysisClient, HalfLifeEntry};
use cts_common::models::QsarRequest;
use cts_common::NA;

use crate::smarts;

/// Reaction route classes with an EPI hydrolysis endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    AlkylHalide,
    Epoxide,
    /// Organophosphate ester, scheme 1 (base-mediated).
    OpEster1,
    /// Organophosphate ester, scheme 2 (acid/neutral).
    OpEster2,
    Ester,
    Anhydride,
    Carbamate,
}

impl RouteClass {
    pub fn endpoint(self) -> &'static str {
        match self {
            RouteClass::AlkylHalide => "alkylhalide",
            RouteClass::Epoxide => "epoxide",
            RouteClass::OpEster1 | RouteClass::OpEster2 => "phosphate",
            RouteClass::Ester => "ester",
            RouteClass::Anhydride => "anhydride",
            RouteClass::Carbamate => "carbamate",
        }
    }

    /// Routes that split the parent into two fragments.
    pub fn is_cleaved(self) -> bool {
        matches!(
            self,
            RouteClass::OpEster1
                | RouteClass::OpEster2
                | RouteClass::Ester
                | RouteClass::Anhydride
                | RouteClass::Carbamate
        )
    }

    pub fn is_op_ester(self) -> bool {
        matches!(self, RouteClass::OpEster1 | RouteClass::OpEster2)
    }

    /// A single reactive site explains this many products at most.
    fn single_site(self, product_count: usize) -> bool {
        if self.is_op_ester() {
            product_count <= 4
        } else if self.is_cleaved() {
            product_count <= 2
        } else {
            product_count <= 1
        }
    }
}

/// Map a route label onto its class. Order matters: the phosphate,
/// anhydride, and carbamate labels all contain "ester" substrings.
pub fn classify_route(label: &str) -> Option<RouteClass> {
    let l = label.to_lowercase();
    if l.contains("phosphate") {
        return Some(if l.contains('2') {
            RouteClass::OpEster2
        } else {
            RouteClass::OpEster1
        });
    }
    if l.contains("anhydride") {
        return Some(RouteClass::Anhydride);
    }
    if l.contains("carbamate") {
        return Some(RouteClass::Carbamate);
    }
    if l.contains("epoxide") {
        return Some(RouteClass::Epoxide);
    }
    if l.contains("halide") || l.contains("halogen") {
        return Some(RouteClass::AlkylHalide);
    }
    if l.contains("ester") {
        return Some(RouteClass::Ester);
    }
    None
}

/// One result per input child, in input order.
#[derive(Debug, Clone)]
pub struct QsarOutcome {
    pub smiles: String,
    pub routes: String,
    pub data: String,
    pub valid: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QsarEngine {
    epi: EpiHydrolysisClient,
}

impl QsarEngine {
    pub fn new(epi: EpiHydrolysisClient) -> Self {
        Self { epi }
    }

    /// Half-lives for every child of one parent. Endpoint responses are
    /// cached for the duration of the request, so children sharing a route
    /// cost one upstream call.
    #[instrument(skip(self, req), fields(children = req.children.len()))]
    pub async fn run(&self, req: &QsarRequest) -> Vec<QsarOutcome> {
        let mut cache: HashMap<&'static str, std::result::Result<Vec<HalfLifeEntry>, String>> =
            HashMap::new();
        let mut seen: HashMap<RouteClass, usize> = HashMap::new();
        let totals = route_totals(req);
        let mut out = Vec::with_capacity(req.children.len());

        for child in &req.children {
            let Some(route) = classify_route(&child.routes) else {
                out.push(QsarOutcome {
                    smiles: child.smiles.clone(),
                    routes: child.routes.clone(),
                    data: NA.to_string(),
                    valid: true,
                    error: None,
                });
                continue;
            };

            let endpoint = route.endpoint();
            if !cache.contains_key(endpoint) {
                let fetched = self
                    .epi
                    .half_lives(endpoint, &req.parent_smiles)
                    .await
                    .map_err(|e| e.to_string());
                cache.insert(endpoint, fetched);
            }

            let counter = seen.entry(route).or_insert(0);
            let index = *counter;
            *counter += 1;

            out.push(match &cache[endpoint] {
                Ok(entries) => {
                    let picked = select_half_life(
                        route,
                        entries,
                        &req.parent_smiles,
                        req.product_count,
                        req.unique_schemes_count,
                        index,
                        totals[&route],
                    );
                    debug!(route = ?route, child = %child.smiles, value = ?picked, "Half-life selected");
                    QsarOutcome {
                        smiles: child.smiles.clone(),
                        routes: child.routes.clone(),
                        data: picked.unwrap_or_else(|| NA.to_string()),
                        valid: true,
                        error: None,
                    }
                }
                Err(msg) => QsarOutcome {
                    smiles: child.smiles.clone(),
                    routes: child.routes.clone(),
                    data: NA.to_string(),
                    valid: false,
                    error: Some(msg.clone()),
                },
            });
        }
        out
    }
}

fn route_totals(req: &QsarRequest) -> HashMap<RouteClass, usize> {
    let mut totals = HashMap::new();
    for child in &req.children {
        if let Some(route) = classify_route(&child.routes) {
            *totals.entry(route).or_insert(0) += 1;
        }
    }
    totals
}

/// The case analysis. `route_index` is this child's position among the
/// children sharing the route, `route_total` how many share it. `None`
/// means the outcome is qualitative and carries no value.
pub fn select_half_life(
    route: RouteClass,
    entries: &[HalfLifeEntry],
    parent_smiles: &str,
    product_count: usize,
    unique_schemes_count: usize,
    route_index: usize,
    route_total: usize,
) -> Option<String> {
    if entries.is_empty() {
        return None;
    }

    if route.single_site(product_count) {
        // one reactive site: the endpoint's answer is unambiguous
        let entry = match route {
            RouteClass::OpEster1 => first_of(entries, &["Kb"]),
            RouteClass::OpEster2 => first_of(entries, &["Ka", "Kn"]),
            _ => entries.first(),
        }?;
        return Some(format_half_life(entry.value));
    }

    if unique_schemes_count > 1 {
        // several sites, several schemes: disambiguate by scheme or atom
        if route.is_op_ester() && product_count > 4 {
            return None;
        }
        let entry = match route {
            RouteClass::OpEster1 => first_of(entries, &["Kb"]),
            RouteClass::OpEster2 => first_of(entries, &["Ka", "Kn"]),
            RouteClass::Epoxide => {
                let mut sorted: Vec<&HalfLifeEntry> = entries
                    .iter()
                    .filter(|e| e.kind == "Ka" || e.kind == "Kn")
                    .collect();
                sorted.sort_by_key(|e| e.atom_number.unwrap_or(usize::MAX));
                sorted.get(route_index.min(sorted.len().saturating_sub(1))).copied()
            }
            RouteClass::Anhydride | RouteClass::Carbamate | RouteClass::Ester => {
                let patterns: &[&str] = match route {
                    RouteClass::Anhydride => &[smarts::ANHYDRIDE],
                    RouteClass::Carbamate => &smarts::CARBAMATE,
                    _ => &[smarts::ESTER],
                };
                let atoms = smarts::matched_atoms(parent_smiles, patterns);
                entries
                    .iter()
                    .find(|e| e.atom_number.is_some_and(|a| atoms.contains(&a)))
                    .or_else(|| entries.first())
            }
            RouteClass::AlkylHalide => entries.first(),
        }?;
        return Some(format_half_life(entry.value));
    }

    // several sites, one scheme
    match route {
        RouteClass::AlkylHalide => None,
        RouteClass::Epoxide => {
            first_of(entries, &["Ka", "Kn"]).map(|e| format_half_life(e.value))
        }
        RouteClass::Anhydride => first_of(entries, &["Kb"]).map(|e| format_half_life(e.value)),
        RouteClass::OpEster1 | RouteClass::OpEster2 | RouteClass::Ester
        | RouteClass::Carbamate => {
            // two sites, one scheme: the first and second base-mediated
            // rates split across the children sharing the route
            let kbs: Vec<&HalfLifeEntry> =
                entries.iter().filter(|e| e.kind == "Kb").collect();
            let first = kbs.first()?;
            let second = kbs.get(1).unwrap_or(first);
            let midpoint = route_total.div_ceil(2);
            let picked = if route_index < midpoint { first } else { second };
            Some(format_half_life(picked.value))
        }
    }
}

fn first_of<'a>(entries: &'a [HalfLifeEntry], kinds: &[&str]) -> Option<&'a HalfLifeEntry> {
    entries.iter().find(|e| kinds.contains(&e.kind.as_str()))
}

/// Very large and very small values go to scientific notation; the rest
/// round to two decimals.
pub fn format_half_life(v: f64) -> String {
    if v.abs() > 1e3 || v.abs() < 1e-1 {
        return format!("{:.2e}", v);
    }
    let rounded = (v * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        rounded.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kb(value: f64) -> HalfLifeEntry {
        HalfLifeEntry { kind: "Kb".into(), value, atom_number: None }
    }

    fn entry(kind: &str, value: f64, atom: Option<usize>) -> HalfLifeEntry {
        HalfLifeEntry { kind: kind.into(), value, atom_number: atom }
    }

    #[test]
    fn test_classify_route() {
        assert_eq!(classify_route("alkyl halide hydrolysis"), Some(RouteClass::AlkylHalide));
        assert_eq!(classify_route("epoxide ring opening"), Some(RouteClass::Epoxide));
        assert_eq!(classify_route("organophosphate ester hydrolysis 1"), Some(RouteClass::OpEster1));
        assert_eq!(classify_route("organophosphate ester hydrolysis 2"), Some(RouteClass::OpEster2));
        assert_eq!(classify_route("carboxylic acid ester hydrolysis"), Some(RouteClass::Ester));
        assert_eq!(classify_route("anhydride hydrolysis"), Some(RouteClass::Anhydride));
        assert_eq!(classify_route("carbamate hydrolysis"), Some(RouteClass::Carbamate));
        assert_eq!(classify_route("glucuronidation"), None);
    }

    #[test]
    fn test_single_site_op_ester_1_takes_first_kb() {
        let entries = vec![entry("Ka", 1.0, None), kb(4.5), kb(9.0)];
        let got = select_half_life(RouteClass::OpEster1, &entries, "COP(=O)(OC)OC", 3, 1, 0, 1);
        assert_eq!(got, Some("4.5".into()));
    }

    #[test]
    fn test_single_site_other_takes_first_entry() {
        let entries = vec![entry("Ka", 0.5, None), kb(4.5)];
        let got = select_half_life(RouteClass::Ester, &entries, "CC(=O)OC", 1, 1, 0, 1);
        assert_eq!(got, Some("0.5".into()));
    }

    #[test]
    fn test_case_d_ester_splits_kb_values_across_children() {
        let entries = vec![kb(4.5), kb(9.0)];
        let first =
            select_half_life(RouteClass::Ester, &entries, "CCOC(=O)CC(=O)OCC", 3, 1, 0, 2);
        let second =
            select_half_life(RouteClass::Ester, &entries, "CCOC(=O)CC(=O)OCC", 3, 1, 1, 2);
        assert_eq!(first, Some("4.5".into()));
        assert_eq!(second, Some("9.0".into()));
    }

    #[test]
    fn test_case_d_alkyl_halide_has_no_value() {
        let entries = vec![kb(4.5)];
        let got = select_half_life(RouteClass::AlkylHalide, &entries, "ClCCCl", 2, 1, 0, 2);
        assert_eq!(got, None);
    }

    #[test]
    fn test_case_d_anhydride_takes_first_kb() {
        let entries = vec![entry("Ka", 1.0, None), kb(2.5)];
        let got = select_half_life(RouteClass::Anhydride, &entries, "CC(=O)OC(=O)C", 3, 1, 0, 2);
        assert_eq!(got, Some("2.5".into()));
    }

    #[test]
    fn test_case_c_op_ester_over_four_products_is_qualitative() {
        let entries = vec![kb(4.5)];
        let got = select_half_life(RouteClass::OpEster1, &entries, "COP(=O)(OC)OC", 5, 2, 0, 2);
        assert_eq!(got, None);
    }

    #[test]
    fn test_case_c_anhydride_matches_functional_group_atoms() {
        // atoms 1..=5 form the anhydride in CC(=O)OC(=O)C
        let entries = vec![entry("Kb", 1.0, Some(0)), entry("Kb", 7.2, Some(3))];
        let got =
            select_half_life(RouteClass::Anhydride, &entries, "CC(=O)OC(=O)C", 3, 2, 0, 2);
        assert_eq!(got, Some("7.2".into()));
    }

    #[test]
    fn test_case_c_epoxide_sorts_by_atom_index() {
        let entries = vec![
            entry("Ka", 8.0, Some(4)),
            entry("Kn", 2.0, Some(1)),
            entry("Kb", 99.0, Some(0)),
        ];
        let first = select_half_life(RouteClass::Epoxide, &entries, "C1CO1CC1CO1", 2, 2, 0, 2);
        let second = select_half_life(RouteClass::Epoxide, &entries, "C1CO1CC1CO1", 2, 2, 1, 2);
        assert_eq!(first, Some("2.0".into()));
        assert_eq!(second, Some("8.0".into()));
    }

    #[test]
    fn test_format_half_life() {
        assert_eq!(format_half_life(4.5), "4.5");
        assert_eq!(format_half_life(9.0), "9.0");
        assert_eq!(format_half_life(1.194), "1.19");
        assert_eq!(format_half_life(12345.6), "1.23e4");
        assert_eq!(format_half_life(0.02), "2.00e-2");
    }

    #[test]
    fn test_empty_entries_is_none() {
        assert_eq!(select_half_life(RouteClass::Ester, &[], "CC(=O)OC", 1, 1, 0, 1), None);
    }

    #[tokio::test]
    async fn test_engine_passes_through_unmapped_routes() {
        use cts_common::client::UpstreamClient;
        use cts_common::models::QsarChild;

        let engine = QsarEngine::new(EpiHydrolysisClient::new(
            UpstreamClient::new().unwrap(),
            "http://127.0.0.1:1",
        ));
        let req = QsarRequest {
            parent_smiles: "CCO".into(),
            children: vec![QsarChild { smiles: "CC".into(), routes: "glucuronidation".into() }],
            product_count: 1,
            unique_schemes_count: 1,
        };
        let out = engine.run(&req).await;
        assert_eq!(out.len(), 1);
        assert!(out[0].valid);
        assert_eq!(out[0].data, NA);
    }
}
