//! cts-dispatch — the single entry point that routes requests to
//! calculator adapters and transformation libraries.
//!
//! The dispatcher never raises: every failure path is folded into an
//! envelope with `valid=false` and an error string. Property requests go
//! through the calculator-specific SMILES filter first (ChemAxon accepts
//! raw user SMILES and skips it); transformation requests go straight to
//! their library client.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use cts_calcs::CalculatorAdapter;
use cts_common::error::{CtsError, Result};
use cts_common::models::{
    Calculator, MetaboliteTree, PchemRequest, PchemResult, Prop, PropData, QsarRequest,
};
use cts_jchem::StructureService;
use cts_metabolizer::{BiotransClient, EnvipathClient, MetabolizerClient, QsarEngine};
use cts_resolver::filter::SmilesFilter;

/// A transformation (metabolite tree) request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformRequest {
    pub chemical: String,
    pub calc: Calculator,
    #[serde(default = "default_gen_limit")]
    pub gen_limit: u32,
    #[serde(rename = "node", skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_gen_limit() -> u32 {
    1
}

/// The tree-builder envelope.
#[derive(Debug, Clone, Serialize)]
pub struct TransformResult {
    pub calc: Calculator,
    pub prop: &'static str,
    pub chemical: String,
    #[serde(rename = "node", skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub data: Value,
    pub total_products: u32,
    pub unique_products: u32,
    pub workflow: &'static str,
    pub run_type: &'static str,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub request_post: Value,
}

/// A parsed inbound request.
#[derive(Debug, Clone)]
pub enum Request {
    Pchem(PchemRequest),
    Transform(TransformRequest),
}

/// Split ingress on the calculator: tree builders get the transformation
/// shape, everything else the property shape.
pub fn parse_request(raw: &Value) -> Result<Request> {
    let calc: Calculator = serde_json::from_value(raw["calc"].clone())?;
    if calc.is_transformation() {
        Ok(Request::Transform(serde_json::from_value(raw.clone())?))
    } else {
        Ok(Request::Pchem(serde_json::from_value(raw.clone())?))
    }
}

pub struct Dispatcher {
    svc: Arc<dyn StructureService>,
    adapters: HashMap<Calculator, Box<dyn CalculatorAdapter>>,
    metabolizer: Option<MetabolizerClient>,
    envipath: Option<EnvipathClient>,
    biotrans: Option<BiotransClient>,
    qsar: Option<QsarEngine>,
}

impl Dispatcher {
    pub fn new(svc: Arc<dyn StructureService>) -> Self {
        Self {
            svc,
            adapters: HashMap::new(),
            metabolizer: None,
            envipath: None,
            biotrans: None,
            qsar: None,
        }
    }

    pub fn with_adapter(mut self, adapter: Box<dyn CalculatorAdapter>) -> Self {
        self.adapters.insert(adapter.calc(), adapter);
        self
    }

    pub fn with_metabolizer(mut self, client: MetabolizerClient) -> Self {
        self.metabolizer = Some(client);
        self
    }

    pub fn with_envipath(mut self, client: EnvipathClient) -> Self {
        self.envipath = Some(client);
        self
    }

    pub fn with_biotrans(mut self, client: BiotransClient) -> Self {
        self.biotrans = Some(client);
        self
    }

    pub fn with_qsar(mut self, engine: QsarEngine) -> Self {
        self.qsar = Some(engine);
        self
    }

    /// Route raw ingress and serialize whatever comes back. Parse failures
    /// produce a single error envelope.
    pub async fn dispatch(&self, raw: &Value) -> Vec<Value> {
        match parse_request(raw) {
            Ok(Request::Pchem(req)) => self
                .dispatch_pchem(&req)
                .await
                .iter()
                .filter_map(|r| serde_json::to_value(r).ok())
                .collect(),
            Ok(Request::Transform(req)) => {
                let result = self.dispatch_transform(&req).await;
                serde_json::to_value(&result).ok().into_iter().collect()
            }
            Err(e) => {
                warn!(error = %e, "Unparsable request");
                vec![serde_json::json!({
                    "valid": false,
                    "error": format!("Unparsable request: {}", e),
                    "request_post": raw,
                })]
            }
        }
    }

    /// One envelope per requested property, in request order. Filter
    /// failures short-circuit to a single error envelope.
    #[instrument(skip(self, req), fields(calc = %req.calc, chemical = %req.chemical))]
    pub async fn dispatch_pchem(&self, req: &PchemRequest) -> Vec<PchemResult> {
        let props = req.requested_props();
        if props.is_empty() {
            return Vec::new();
        }

        let mut routed = req.clone();
        if req.calc != Calculator::Chemaxon {
            let filter = SmilesFilter::new(self.svc.as_ref());
            match filter.filter_for(&req.chemical, req.calc, req.mass).await {
                Ok(filtered) => {
                    debug!(filtered = %filtered, "SMILES filtered for calculator");
                    routed.chemical = filtered;
                }
                Err(e) => return vec![PchemResult::fail(req, props[0], &e.to_string())],
            }
        }

        let Some(adapter) = self.adapters.get(&req.calc) else {
            let msg = format!("No adapter registered for {}", req.calc);
            return props.iter().map(|p| PchemResult::fail(&routed, *p, &msg)).collect();
        };

        match adapter.run(&routed).await {
            Ok(envelopes) => envelopes,
            Err(e) => {
                let msg = match e {
                    CtsError::Network(_) | CtsError::Timeout(_) => {
                        format!("Cannot reach {} calculator", req.calc)
                    }
                    other => other.to_string(),
                };
                warn!(calc = %req.calc, error = %msg, "Adapter failed");
                props.iter().map(|p| PchemResult::fail(&routed, *p, &msg)).collect()
            }
        }
    }

    /// Build a metabolite tree; failures fold into the envelope.
    #[instrument(skip(self, req), fields(calc = %req.calc, chemical = %req.chemical))]
    pub async fn dispatch_transform(&self, req: &TransformRequest) -> TransformResult {
        match self.run_transform(req).await {
            Ok(tree) => TransformResult {
                calc: req.calc,
                prop: "products",
                chemical: req.chemical.clone(),
                node_id: req.node_id.clone(),
                data: serde_json::to_value(&tree.tree).unwrap_or(Value::Null),
                total_products: tree.total_products,
                unique_products: tree.unique_products,
                workflow: "gentrans",
                run_type: "batch",
                valid: true,
                error: None,
                request_post: serde_json::to_value(req).unwrap_or(Value::Null),
            },
            Err(e) => TransformResult {
                calc: req.calc,
                prop: "products",
                chemical: req.chemical.clone(),
                node_id: req.node_id.clone(),
                data: Value::String(cts_common::NA.into()),
                total_products: 0,
                unique_products: 0,
                workflow: "gentrans",
                run_type: "batch",
                valid: false,
                error: Some(e.to_string()),
                request_post: serde_json::to_value(req).unwrap_or(Value::Null),
            },
        }
    }

    async fn run_transform(&self, req: &TransformRequest) -> Result<MetaboliteTree> {
        match req.calc {
            Calculator::Metabolizer => {
                let client = self.metabolizer.as_ref().ok_or_else(|| {
                    CtsError::Configuration("metabolizer client is not configured".into())
                })?;
                client.transform(&req.chemical, req.gen_limit).await
            }
            Calculator::Envipath => {
                let client = self.envipath.as_ref().ok_or_else(|| {
                    CtsError::Configuration("enviPath client is not configured".into())
                })?;
                client.transform(&req.chemical, req.gen_limit, true).await
            }
            Calculator::Biotrans => {
                let client = self.biotrans.as_ref().ok_or_else(|| {
                    CtsError::Configuration("BioTransformer client is not configured".into())
                })?;
                client.transform(&req.chemical, req.gen_limit).await
            }
            other => Err(CtsError::Configuration(format!(
                "{} is not a transformation library",
                other
            ))),
        }
    }

    /// Half-life envelopes for every child of one parent, in child order.
    #[instrument(skip(self, req), fields(children = req.children.len()))]
    pub async fn dispatch_qsar(&self, req: &QsarRequest) -> Vec<PchemResult> {
        let request_post = serde_json::to_value(req).unwrap_or(Value::Null);
        let Some(engine) = &self.qsar else {
            return vec![PchemResult {
                calc: Calculator::Epi,
                prop: Prop::Qsar,
                data: PropData::na(),
                method: None,
                chemical: req.parent_smiles.clone(),
                node_id: None,
                valid: false,
                error: Some("QSAR engine is not configured".into()),
                request_post,
            }];
        };

        engine
            .run(req)
            .await
            .into_iter()
            .map(|o| PchemResult {
                calc: Calculator::Epi,
                prop: Prop::Qsar,
                data: PropData::Text(o.data),
                method: None,
                chemical: o.smiles,
                node_id: None,
                valid: o.valid,
                error: o.error,
                request_post: request_post.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_request_splits_on_calculator() {
        let pchem = json!({ "chemical": "CCO", "calc": "epi", "prop": "water_sol" });
        assert!(matches!(parse_request(&pchem), Ok(Request::Pchem(_))));

        let trans = json!({ "chemical": "CCO", "calc": "metabolizer", "gen_limit": 2 });
        match parse_request(&trans) {
            Ok(Request::Transform(req)) => assert_eq!(req.gen_limit, 2),
            other => panic!("expected transform request, got {:?}", other),
        }
    }

    #[test]
    fn test_transform_gen_limit_defaults_to_one() {
        let raw = json!({ "chemical": "CCO", "calc": "envipath" });
        match parse_request(&raw) {
            Ok(Request::Transform(req)) => assert_eq!(req.gen_limit, 1),
            other => panic!("expected transform request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_request_rejects_unknown_calc() {
        let raw = json!({ "chemical": "CCO", "calc": "crystal-ball" });
        assert!(parse_request(&raw).is_err());
    }
}
