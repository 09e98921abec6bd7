//! Upstream adapter implementations, one file per service.

pub mod chemaxon;
pub mod epi;
pub mod measured;
pub mod molgpka;
pub mod opera;
pub mod pkasolver;
pub mod sparc;
pub mod test_suite;

pub use chemaxon::ChemaxonAdapter;
pub use epi::{EpiAdapter, EpiHydrolysisClient, HalfLifeEntry};
pub use measured::MeasuredAdapter;
pub use molgpka::MolGpkaAdapter;
pub use opera::OperaAdapter;
pub use pkasolver::PkasolverAdapter;
pub use sparc::SparcAdapter;
pub use test_suite::TestAdapter;
