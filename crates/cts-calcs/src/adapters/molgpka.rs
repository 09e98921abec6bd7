//! MolGpKa adapter: one call, a list of predicted pKa values, passed
//! through untouched.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::instrument;

use cts_common::client::UpstreamClient;
use cts_common::error::{CtsError, Result};
use cts_common::models::{Calculator, PchemRequest, PchemResult, Prop, PropData};

use crate::CalculatorAdapter;

const MOLGPKA_TIMEOUT: Duration = Duration::from_secs(30);
const PROPS: &[Prop] = &[Prop::IonCon];

pub struct MolGpkaAdapter {
    client: UpstreamClient,
    base: String,
}

impl MolGpkaAdapter {
    pub fn new(client: UpstreamClient, base_url: &str) -> Self {
        Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CalculatorAdapter for MolGpkaAdapter {
    fn calc(&self) -> Calculator {
        Calculator::Molgpka
    }

    fn props(&self) -> &'static [Prop] {
        PROPS
    }

    #[instrument(skip(self, req), fields(chemical = %req.chemical))]
    async fn run(&self, req: &PchemRequest) -> Result<Vec<PchemResult>> {
        let url = format!("{}/molgpka", self.base);
        let body = json!({ "smiles": req.chemical });
        let resp = self.client.post_json(&url, &body, MOLGPKA_TIMEOUT).await?;
        let values = parse_pka_list(&resp, "pka")?;
        Ok(vec![PchemResult::ok(
            req,
            Prop::IonCon,
            PropData::Object(Value::from(values)),
        )])
    }
}

pub(crate) fn parse_pka_list(resp: &Value, key: &str) -> Result<Vec<f64>> {
    resp[key]
        .as_array()
        .map(|a| a.iter().filter_map(Value::as_f64).collect())
        .ok_or_else(|| CtsError::NoData("pKa list".into()))
}
