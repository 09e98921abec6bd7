//! Well-known acronyms the downstream resolvers mis-handle, mapped straight
//! to SMILES before any classification runs.

/// Acronym (lower-cased) to canonical SMILES. PFOS and the like are left to
/// the name-vs-SMILES ambiguity check; only class queries live here.
const ACRONYMS: [(&str, &str); 2] = [
    // PFAS as a class query resolves to PFOA
    ("pfas", "OC(=O)C(F)(F)C(F)(F)C(F)(F)C(F)(F)C(F)(F)C(F)(F)C(F)(F)F"),
    ("genx", "OC(=O)C(F)(OC(F)(F)C(F)(F)C(F)(F)F)C(F)(F)F"),
];

/// SMILES the downstream resolver mis-parses; resolved by common name
/// instead.
const ALKANES: [(&str, &str); 3] = [("C", "methane"), ("CC", "ethane"), ("CCC", "propane")];

pub fn lookup(input: &str) -> Option<&'static str> {
    let lower = input.to_lowercase();
    ACRONYMS
        .iter()
        .find(|(k, _)| *k == lower)
        .map(|(_, smiles)| *smiles)
}

/// Common name for the short pure-carbon chains.
pub fn alkane_name(smiles: &str) -> Option<&'static str> {
    ALKANES
        .iter()
        .find(|(k, _)| *k == smiles)
        .map(|(_, name)| *name)
}
