//! cts-metabolizer — biotransformation tree building and the QSAR
//! hydrolysis half-life engine.
//!
//! Three upstreams produce raw metabolite graphs (ChemAxon metabolizer and
//! enviPath with ranking metrics, BioTransformer as unranked parent/product
//! pairs); `tree` normalizes them all into one generation-bounded shape
//! with stable pre-order ids.

pub mod biotrans;
pub mod chemaxon;
pub mod envipath;
pub mod qsar;
pub mod smarts;
pub mod tree;

pub use biotrans::BiotransClient;
pub use chemaxon::MetabolizerClient;
pub use envipath::EnvipathClient;
pub use qsar::QsarEngine;
pub use tree::{build_tree, fold_pairs};
