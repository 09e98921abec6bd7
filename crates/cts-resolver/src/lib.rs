//! cts-resolver — chemical identification and SMILES normalization.
//!
//! Turns whatever the caller supplied (name, CAS, SMILES, drawn structure)
//! into a standardized `ChemicalIdentity`, and applies the
//! calculator-specific normalization filter every predictor input goes
//! through.

pub mod acronyms;
pub mod cactus;
pub mod ccte;
pub mod filter;
pub mod resolve;

pub use filter::SmilesFilter;
pub use resolve::Resolver;
