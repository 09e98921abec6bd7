//! pkasolver adapter: same single-call, list-of-pKa contract as MolGpKa
//! against a different model server.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::instrument;

use cts_common::client::UpstreamClient;
use cts_common::error::Result;
use cts_common::models::{Calculator, PchemRequest, PchemResult, Prop, PropData};

use crate::adapters::molgpka::parse_pka_list;
use crate::CalculatorAdapter;

const PKASOLVER_TIMEOUT: Duration = Duration::from_secs(30);
const PROPS: &[Prop] = &[Prop::IonCon];

pub struct PkasolverAdapter {
    client: UpstreamClient,
    base: String,
}

impl PkasolverAdapter {
    pub fn new(client: UpstreamClient, base_url: &str) -> Self {
        Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CalculatorAdapter for PkasolverAdapter {
    fn calc(&self) -> Calculator {
        Calculator::Pkasolver
    }

    fn props(&self) -> &'static [Prop] {
        PROPS
    }

    #[instrument(skip(self, req), fields(chemical = %req.chemical))]
    async fn run(&self, req: &PchemRequest) -> Result<Vec<PchemResult>> {
        let url = format!("{}/pkasolver", self.base);
        let body = json!({ "smiles": req.chemical });
        let resp = self.client.post_json(&url, &body, PKASOLVER_TIMEOUT).await?;
        let values = parse_pka_list(&resp, "pka_values")?;
        Ok(vec![PchemResult::ok(
            req,
            Prop::IonCon,
            PropData::Object(Value::from(values)),
        )])
    }
}
