//! ChemAxon adapter: the JChem property endpoints shaped into envelopes.
//!
//! The only calculator that accepts raw, unfiltered user SMILES.

use async_trait::async_trait;
use tracing::instrument;

use cts_common::error::Result;
use cts_common::models::{Calculator, PchemRequest, PchemResult, Prop, PropData};
use cts_jchem::JchemClient;

use crate::CalculatorAdapter;

const PROPS: &[Prop] = &[
    Prop::IonCon,
    Prop::KowNoPh,
    Prop::KowWph,
    Prop::WaterSol,
    Prop::WaterSolPh,
];

const DEFAULT_LOGP_METHOD: &str = "KLOP";

pub struct ChemaxonAdapter {
    jchem: JchemClient,
}

impl ChemaxonAdapter {
    pub fn new(jchem: JchemClient) -> Self {
        Self { jchem }
    }

    async fn one(&self, req: &PchemRequest, prop: Prop) -> Result<PchemResult> {
        let smiles = &req.chemical;
        let env = match prop {
            Prop::IonCon => {
                let pka = self.jchem.pka(smiles).await?;
                PchemResult::ok(
                    req,
                    prop,
                    PropData::Ion { pka: pka.pka, pkb: pka.pkb },
                )
            }
            Prop::KowNoPh => {
                let method = req
                    .method
                    .as_deref()
                    .unwrap_or(DEFAULT_LOGP_METHOD)
                    .to_uppercase();
                let v = self.jchem.log_p(smiles, &method).await?;
                let mut env = PchemResult::ok(req, prop, PropData::Scalar(v));
                env.method = Some(method);
                env
            }
            Prop::KowWph => {
                let v = self.jchem.log_d(smiles, req.ph).await?;
                PchemResult::ok(req, prop, PropData::Scalar(v))
            }
            Prop::WaterSol => {
                let mg_per_ml = self.jchem.solubility(smiles).await?;
                PchemResult::ok(req, prop, PropData::Scalar(mg_per_ml_to_mg_per_l(mg_per_ml)))
            }
            Prop::WaterSolPh => {
                let mg_per_ml = self.jchem.solubility_at_ph(smiles, req.ph).await?;
                PchemResult::ok(req, prop, PropData::Scalar(mg_per_ml_to_mg_per_l(mg_per_ml)))
            }
            other => PchemResult::fail(req, other, "Property not served by ChemAxon"),
        };
        Ok(env)
    }
}

#[async_trait]
impl CalculatorAdapter for ChemaxonAdapter {
    fn calc(&self) -> Calculator {
        Calculator::Chemaxon
    }

    fn props(&self) -> &'static [Prop] {
        PROPS
    }

    #[instrument(skip(self, req), fields(chemical = %req.chemical))]
    async fn run(&self, req: &PchemRequest) -> Result<Vec<PchemResult>> {
        let mut out = Vec::new();
        for prop in req.requested_props() {
            out.push(self.one(req, prop).await?);
        }
        Ok(out)
    }
}

/// JChem reports solubility in mg/mL; the envelope carries mg/L.
fn mg_per_ml_to_mg_per_l(v: f64) -> f64 {
    v * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solubility_unit_conversion() {
        assert_eq!(mg_per_ml_to_mg_per_l(4.59), 4590.0);
    }

    #[test]
    fn test_props_cover_speciation_vocabulary() {
        assert!(PROPS.contains(&Prop::IonCon));
        assert!(PROPS.contains(&Prop::KowWph));
        assert!(!PROPS.contains(&Prop::LogBcf));
    }
}
