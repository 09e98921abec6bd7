//! Functional-group matching over SMILES strings.
//!
//! The hydrolysis engine only needs to know which atoms of a structure sit
//! inside an ester, anhydride, or carbamate group, and the group patterns
//! are themselves valid SMILES substrings. Matching is therefore textual:
//! find the pattern as a substring and map the covered bytes back to atom
//! indices. Atom numbering is zero-based and counts atoms in writing
//! order, bracket atoms included.

/// Anhydride linkage.
pub const ANHYDRIDE: &str = "C(=O)OC(=O)";
/// Ester linkage (also the carboxylic-acid-ester core of the anhydride).
pub const ESTER: &str = "C(=O)O";
/// Carbamate linkage, written from either end.
pub const CARBAMATE: [&str; 2] = ["NC(=O)O", "OC(=O)N"];

/// Byte span of every atom in writing order. A bracket atom `[...]` is one
/// atom; `Cl` and `Br` are the two-letter organic-subset atoms.
pub fn atom_spans(smiles: &str) -> Vec<(usize, usize)> {
    let bytes = smiles.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'[' => {
                let start = i;
                while i < bytes.len() && bytes[i] != b']' {
                    i += 1;
                }
                // include the closing bracket when present
                let end = (i + 1).min(bytes.len());
                spans.push((start, end));
                i = end;
            }
            b'C' if bytes.get(i + 1) == Some(&b'l') => {
                spans.push((i, i + 2));
                i += 2;
            }
            b'B' if bytes.get(i + 1) == Some(&b'r') => {
                spans.push((i, i + 2));
                i += 2;
            }
            b'B' | b'C' | b'N' | b'O' | b'P' | b'S' | b'F' | b'I' | b'b' | b'c' | b'n'
            | b'o' | b'p' | b's' => {
                spans.push((i, i + 1));
                i += 1;
            }
            _ => i += 1,
        }
    }
    spans
}

/// Atom indices covered by each occurrence of `pattern`, one group per
/// occurrence. Occurrences may overlap.
pub fn match_group(smiles: &str, pattern: &str) -> Vec<Vec<usize>> {
    if pattern.is_empty() {
        return Vec::new();
    }
    let spans = atom_spans(smiles);
    let mut groups = Vec::new();
    let mut from = 0;
    while let Some(rel) = smiles[from..].find(pattern) {
        let start = from + rel;
        let end = start + pattern.len();
        let atoms: Vec<usize> = spans
            .iter()
            .enumerate()
            .filter(|(_, (s, _))| *s >= start && *s < end)
            .map(|(idx, _)| idx)
            .collect();
        if !atoms.is_empty() {
            groups.push(atoms);
        }
        from = start + 1;
    }
    groups
}

/// Union of atom indices matched by any of `patterns`, sorted and deduped.
pub fn matched_atoms(smiles: &str, patterns: &[&str]) -> Vec<usize> {
    let mut atoms: Vec<usize> = patterns
        .iter()
        .flat_map(|p| match_group(smiles, p))
        .flatten()
        .collect();
    atoms.sort_unstable();
    atoms.dedup();
    atoms
}
