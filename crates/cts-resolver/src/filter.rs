//! Calculator-parameterized SMILES normalization.
//!
//! The generic pipeline is standardize (remove explicit H + nitro rewrite),
//! major tautomer, neutralize. Each JChem-backed stage degrades to its own
//! input on failure, so `filter_for` never fails for upstream reasons —
//! only for the unconditional rejects (metals, oversize, residual brackets).

use tracing::{debug, warn};

use cts_common::error::{CtsError, Result};
use cts_common::models::Calculator;
use cts_jchem::StructureService;

/// Tokens that reject an input outright. Mixtures (`.`) and metals cannot
/// be processed by any calculator.
const REJECT_TOKENS: [&str; 20] = [
    ".", "[Ag]", "[Al]", "[As", "[Au]", "[B]", "[B-]", "[Ca]", "[Co]", "[Fe]", "[Hg]", "[K]",
    "[Li]", "[Mg]", "[Na]", "[Pb]", "[Pt]", "[Si]", "[Sn]", "[W]",
];

pub const METALS_ERROR: &str = "Chemical cannot contain metals.";
pub const OVERSIZE_ERROR: &str = "Chemical mass must be less than 1500 g/mol.";
pub const CHARGED_ERROR: &str = "Chemical cannot contain charged species or metals.";

const MAX_MASS: f64 = 1500.0;

/// Reject mixtures and metal-bearing inputs.
pub fn check_rejects(smiles: &str) -> Result<()> {
    for token in REJECT_TOKENS {
        if smiles.contains(token) {
            return Err(CtsError::InvalidChemical(METALS_ERROR.into()));
        }
    }
    Ok(())
}

/// Undo the stage-1 nitro rewrite for calculators that expect the
/// uncharged form.
pub fn untransform_nitro(smiles: &str) -> String {
    smiles.replace("[N+](=O)[O-]", "N(=O)=O")
}

/// Calculators whose inputs get stereocenters cleared and nitro groups
/// back in uncharged form.
fn wants_flat_input(calc: Calculator) -> bool {
    matches!(
        calc,
        Calculator::Epi
            | Calculator::Opera
            | Calculator::Sparc
            | Calculator::Measured
            | Calculator::Test
    )
}

/// EPI and Measured cannot process any bracket atom.
fn rejects_brackets(calc: Calculator) -> bool {
    matches!(calc, Calculator::Epi | Calculator::Measured)
}

pub struct SmilesFilter<'a> {
    svc: &'a dyn StructureService,
}

impl<'a> SmilesFilter<'a> {
    pub fn new(svc: &'a dyn StructureService) -> Self {
        Self { svc }
    }

    /// The generic pipeline: standardize, major tautomer, neutralize.
    pub async fn filter(&self, smiles: &str) -> Result<String> {
        check_rejects(smiles)?;

        let standardized = match self.svc.standardize(smiles).await {
            Ok(s) => s,
            Err(e) => {
                warn!(smiles = smiles, error = %e, "Standardizer failed, keeping input");
                smiles.to_string()
            }
        };

        let tautomer = match self.svc.major_tautomer(&standardized).await {
            Ok(s) => s,
            Err(e) => {
                warn!(smiles = %standardized, error = %e, "Tautomerization failed, keeping stage-1 output");
                standardized.clone()
            }
        };

        let neutralized = match self.svc.neutralize(&tautomer).await {
            Ok(s) => s,
            Err(e) => {
                warn!(smiles = %tautomer, error = %e, "Neutralization failed, keeping stage-2 output");
                tautomer.clone()
            }
        };

        debug!(input = smiles, output = %neutralized, "SMILES filtered");
        Ok(neutralized)
    }

    /// The calculator-specific variant. `mass` is the average molecular
    /// weight if the caller already knows it; otherwise it is fetched from
    /// JChem (and the gate is skipped if that lookup degrades).
    pub async fn filter_for(
        &self,
        smiles: &str,
        calc: Calculator,
        mass: Option<f64>,
    ) -> Result<String> {
        let filtered = self.filter(smiles).await?;

        if calc == Calculator::Chemaxon {
            return Ok(filtered);
        }

        let mass = match mass {
            Some(m) => Some(m),
            None => self.svc.detail(&filtered).await.ok().and_then(|d| d.mass),
        };
        if let Some(m) = mass {
            if m <= 0.0 || m >= MAX_MASS {
                return Err(CtsError::OversizeChemical(OVERSIZE_ERROR.into()));
            }
        }

        let mut out = filtered;
        if wants_flat_input(calc) {
            out = match self.svc.clear_stereo(&out).await {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "Stereo clearing failed, keeping input");
                    out
                }
            };
            out = untransform_nitro(&out);
        }

        if rejects_brackets(calc) && (out.contains('[') || out.contains(']')) {
            return Err(CtsError::InvalidChemical(CHARGED_ERROR.into()));
        }

        Ok(out)
    }
}
