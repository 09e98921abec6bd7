//! Metabolite tree normalization.
//!
//! Pre-order DFS assigns ids from 1 (the parent chemical). Descent stops at
//! the generation limit. Ranked libraries carry accumulation metrics;
//! unranked ones get the `"N/A"` sentinel. BioTransformer reports flat
//! (parent, product) pairs that are folded into the same shape.

use std::collections::HashSet;

use serde_json::Value;
use tracing::debug;

use cts_common::models::{MetaboliteNode, MetaboliteTree, RankValue};

/// Which raw shape is being walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeSource {
    /// ChemAxon metabolizer: accumulated comma-separated route strings,
    /// ranking metrics present.
    Chemaxon,
    /// enviPath: plain route labels, ranking metrics optional.
    Envipath,
}

/// Likelihood label derived from global accumulation.
pub fn likelihood_label(global_accumulation: f64) -> &'static str {
    if global_accumulation < 0.001 {
        "UNLIKELY"
    } else if global_accumulation <= 0.1 {
        "PROBABLE"
    } else {
        "LIKELY"
    }
}

/// Walk a raw nested tree into the normalized shape.
pub fn build_tree(raw: &Value, gen_limit: u32, ranked: bool, source: TreeSource) -> MetaboliteTree {
    let mut counter = 0u32;
    let root = walk(raw, 0, gen_limit, ranked, source, &mut counter);

    let total_products = counter.saturating_sub(1);
    let unique_products = count_unique(&root);
    debug!(total = total_products, unique = unique_products, "Metabolite tree built");

    MetaboliteTree { tree: root, total_products, unique_products }
}

fn walk(
    raw: &Value,
    generation: u32,
    gen_limit: u32,
    ranked: bool,
    source: TreeSource,
    counter: &mut u32,
) -> MetaboliteNode {
    *counter += 1;
    let smiles = raw["smiles"].as_str().unwrap_or_default();
    let routes = route_label(raw, source, generation);

    let mut node = MetaboliteNode::unranked(*counter, smiles, &routes, generation);
    if ranked {
        node.accumulation = rank_value(&raw["accumulation"]);
        node.production = rank_value(&raw["production"]);
        node.global_accumulation = rank_value(&raw["globalAccumulation"]);
        node.likelihood = match raw["globalAccumulation"].as_f64() {
            Some(ga) => RankValue::Text(likelihood_label(ga).to_string()),
            // No metric: pass the upstream label through untouched.
            None => rank_value(&raw["likelihood"]),
        };
    }

    if generation < gen_limit {
        if let Some(children) = raw["children"].as_array() {
            for child in children {
                node.children
                    .push(walk(child, generation + 1, gen_limit, ranked, source, counter));
            }
        }
    }
    node
}

/// ChemAxon accumulates routes into one comma-separated string; the node's
/// own route is the last segment. The root has no route.
fn route_label(raw: &Value, source: TreeSource, generation: u32) -> String {
    if generation == 0 {
        return String::new();
    }
    let label = raw["route"]
        .as_str()
        .or_else(|| raw["routes"].as_str())
        .unwrap_or_default();
    match source {
        TreeSource::Chemaxon => label
            .rsplit(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string(),
        TreeSource::Envipath => label.trim().to_string(),
    }
}

fn rank_value(v: &Value) -> RankValue {
    match v.as_f64() {
        Some(n) => RankValue::Num(n),
        None => match v.as_str() {
            Some(s) => RankValue::Text(s.to_string()),
            None => RankValue::na(),
        },
    }
}

fn count_unique(root: &MetaboliteNode) -> u32 {
    let mut seen = HashSet::new();
    fn collect<'a>(node: &'a MetaboliteNode, seen: &mut HashSet<&'a str>, is_root: bool) {
        if !is_root {
            seen.insert(node.smiles.as_str());
        }
        for child in &node.children {
            collect(child, seen, false);
        }
    }
    collect(root, &mut seen, true);
    seen.len() as u32
}

// ── BioTransformer pair folding ────────────────────────────────────────────

/// One reported biotransformation.
#[derive(Debug, Clone)]
pub struct ProductPair {
    pub precursor: String,
    pub product: String,
    pub reaction: String,
}

/// Fold flat (precursor, product) pairs into a tree. The root is the
/// precursor that never appears as a product.
pub fn fold_pairs(pairs: &[ProductPair], gen_limit: u32) -> Option<MetaboliteTree> {
    let products: HashSet<&str> = pairs.iter().map(|p| p.product.as_str()).collect();
    let root_smiles = pairs
        .iter()
        .map(|p| p.precursor.as_str())
        .find(|s| !products.contains(s))?;

    let mut counter = 0u32;
    let root = fold_walk(root_smiles, "", 0, gen_limit, pairs, &mut counter);

    let total_products = counter.saturating_sub(1);
    let unique_products = count_unique(&root);
    Some(MetaboliteTree { tree: root, total_products, unique_products })
}

fn fold_walk(
    smiles: &str,
    reaction: &str,
    generation: u32,
    gen_limit: u32,
    pairs: &[ProductPair],
    counter: &mut u32,
) -> MetaboliteNode {
    *counter += 1;
    let mut node = MetaboliteNode::unranked(*counter, smiles, reaction, generation);

    if generation < gen_limit {
        for pair in pairs.iter().filter(|p| p.precursor == smiles) {
            node.children.push(fold_walk(
                &pair.product,
                &pair.reaction,
                generation + 1,
                gen_limit,
                pairs,
                counter,
            ));
        }
    }
    node
}
