//! End-to-end dispatcher behavior against mock adapters: envelope counts,
//! filter short-circuits, and error folding.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use cts_calcs::CalculatorAdapter;
use cts_common::error::{CtsError, Result};
use cts_common::models::{Calculator, PchemRequest, PchemResult, Prop, PropData};
use cts_common::NA;
use cts_dispatch::{Dispatcher, TransformRequest};
use cts_jchem::MockStructureService;

/// Emits one scalar envelope per requested property.
struct EchoAdapter {
    calc: Calculator,
}

#[async_trait]
impl CalculatorAdapter for EchoAdapter {
    fn calc(&self) -> Calculator {
        self.calc
    }

    fn props(&self) -> &'static [Prop] {
        &[Prop::WaterSol, Prop::VaporPress, Prop::MeltingPoint]
    }

    async fn run(&self, req: &PchemRequest) -> Result<Vec<PchemResult>> {
        Ok(req
            .requested_props()
            .iter()
            .map(|p| PchemResult::ok(req, *p, PropData::Scalar(1.0)))
            .collect())
    }
}

/// Always unreachable.
struct DownAdapter {
    calc: Calculator,
}

#[async_trait]
impl CalculatorAdapter for DownAdapter {
    fn calc(&self) -> Calculator {
        self.calc
    }

    fn props(&self) -> &'static [Prop] {
        &[Prop::WaterSol]
    }

    async fn run(&self, _req: &PchemRequest) -> Result<Vec<PchemResult>> {
        Err(CtsError::Network("connection refused".into()))
    }
}

fn epi_request(chemical: &str, props: &[Prop]) -> PchemRequest {
    let mut req = PchemRequest::new(chemical, Calculator::Epi, props[0]);
    if props.len() > 1 {
        req.prop = None;
        req.props = props.to_vec();
    }
    req.mass = Some(100.0);
    req
}

#[tokio::test]
async fn test_one_envelope_per_requested_property() {
    let _ = tracing_subscriber::fmt::try_init();
    let dispatcher = Dispatcher::new(Arc::new(MockStructureService::new()))
        .with_adapter(Box::new(EchoAdapter { calc: Calculator::Epi }));

    let req = epi_request("CCO", &[Prop::WaterSol, Prop::VaporPress]);
    let out = dispatcher.dispatch_pchem(&req).await;

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].prop, Prop::WaterSol);
    assert_eq!(out[1].prop, Prop::VaporPress);
    assert!(out.iter().all(|r| r.valid));
}

#[tokio::test]
async fn test_metal_rejection_short_circuits_to_one_envelope() {
    let dispatcher = Dispatcher::new(Arc::new(MockStructureService::new()))
        .with_adapter(Box::new(EchoAdapter { calc: Calculator::Epi }));

    let req = epi_request("[Hg]", &[Prop::WaterSol, Prop::VaporPress]);
    let out = dispatcher.dispatch_pchem(&req).await;

    assert_eq!(out.len(), 1);
    assert!(!out[0].valid);
    assert_eq!(out[0].error.as_deref(), Some("Chemical cannot contain metals."));
}

#[tokio::test]
async fn test_oversize_chemical_is_rejected() {
    let dispatcher = Dispatcher::new(Arc::new(MockStructureService::new()))
        .with_adapter(Box::new(EchoAdapter { calc: Calculator::Epi }));

    let mut req = epi_request("CCO", &[Prop::WaterSol]);
    req.mass = Some(2000.0);
    let out = dispatcher.dispatch_pchem(&req).await;

    assert_eq!(out.len(), 1);
    assert!(!out[0].valid);
    assert!(out[0].error.as_deref().unwrap().contains("1500"));
}

#[tokio::test]
async fn test_unreachable_adapter_folds_per_property() {
    let dispatcher = Dispatcher::new(Arc::new(MockStructureService::new()))
        .with_adapter(Box::new(DownAdapter { calc: Calculator::Epi }));

    let req = epi_request("CCO", &[Prop::WaterSol, Prop::VaporPress]);
    let out = dispatcher.dispatch_pchem(&req).await;

    assert_eq!(out.len(), 2);
    for envelope in &out {
        assert!(!envelope.valid);
        assert_eq!(envelope.error.as_deref(), Some("Cannot reach epi calculator"));
        assert_eq!(envelope.data, PropData::Text(NA.into()));
    }
}

#[tokio::test]
async fn test_chemaxon_receives_raw_smiles() {
    // a filter would clear this stereocenter; ChemAxon must not
    let svc = MockStructureService::new()
        .with_stereo_cleared("C[C@H](N)C(=O)O", "CC(N)C(=O)O");
    let dispatcher = Dispatcher::new(Arc::new(svc))
        .with_adapter(Box::new(EchoAdapter { calc: Calculator::Chemaxon }));

    let req = PchemRequest::new("C[C@H](N)C(=O)O", Calculator::Chemaxon, Prop::IonCon);
    let out = dispatcher.dispatch_pchem(&req).await;

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].chemical, "C[C@H](N)C(=O)O");
}

#[tokio::test]
async fn test_epi_receives_filtered_smiles() {
    let svc = MockStructureService::new()
        .with_stereo_cleared("C[C@H](N)C(=O)O", "CC(N)C(=O)O");
    let dispatcher = Dispatcher::new(Arc::new(svc))
        .with_adapter(Box::new(EchoAdapter { calc: Calculator::Epi }));

    let req = epi_request("C[C@H](N)C(=O)O", &[Prop::MeltingPoint]);
    let out = dispatcher.dispatch_pchem(&req).await;

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].chemical, "CC(N)C(=O)O");
}

#[tokio::test]
async fn test_unregistered_calculator_folds_into_envelopes() {
    let dispatcher = Dispatcher::new(Arc::new(MockStructureService::new()));

    let req = epi_request("CCO", &[Prop::WaterSol]);
    let out = dispatcher.dispatch_pchem(&req).await;

    assert_eq!(out.len(), 1);
    assert!(!out[0].valid);
    assert!(out[0].error.as_deref().unwrap().contains("No adapter registered"));
}

#[tokio::test]
async fn test_unconfigured_transformation_library_never_raises() {
    let dispatcher = Dispatcher::new(Arc::new(MockStructureService::new()));

    let req = TransformRequest {
        chemical: "CCO".into(),
        calc: Calculator::Metabolizer,
        gen_limit: 2,
        node_id: None,
        extra: Default::default(),
    };
    let out = dispatcher.dispatch_transform(&req).await;

    assert!(!out.valid);
    assert_eq!(out.prop, "products");
    assert_eq!(out.workflow, "gentrans");
    assert_eq!(out.run_type, "batch");
    assert_eq!(out.total_products, 0);
    assert!(out.error.is_some());
}

#[tokio::test]
async fn test_raw_dispatch_folds_parse_errors() {
    let dispatcher = Dispatcher::new(Arc::new(MockStructureService::new()));

    let out = dispatcher.dispatch(&json!({ "chemical": "CCO", "calc": "crystal-ball" })).await;

    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["valid"], json!(false));
    assert!(out[0]["error"].as_str().unwrap().contains("Unparsable"));
}

#[tokio::test]
async fn test_raw_dispatch_routes_pchem() {
    let dispatcher = Dispatcher::new(Arc::new(MockStructureService::new()))
        .with_adapter(Box::new(EchoAdapter { calc: Calculator::Epi }));

    let raw = json!({
        "chemical": "CCO",
        "calc": "epi",
        "props": ["water_sol", "vapor_press"],
        "mass": 100.0,
        "sessionid": "abc123",
    });
    let out = dispatcher.dispatch(&raw).await;

    assert_eq!(out.len(), 2);
    // passthrough fields come back in the request echo
    assert_eq!(out[0]["request_post"]["sessionid"], json!("abc123"));
}

#[tokio::test]
async fn test_unconfigured_qsar_engine_folds() {
    use cts_common::models::{QsarChild, QsarRequest};

    let dispatcher = Dispatcher::new(Arc::new(MockStructureService::new()));
    let req = QsarRequest {
        parent_smiles: "CC(=O)OC".into(),
        children: vec![QsarChild { smiles: "CO".into(), routes: "ester hydrolysis".into() }],
        product_count: 2,
        unique_schemes_count: 1,
    };
    let out = dispatcher.dispatch_qsar(&req).await;

    assert_eq!(out.len(), 1);
    assert!(!out[0].valid);
    assert_eq!(out[0].prop, Prop::Qsar);
}
