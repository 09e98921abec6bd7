//! ChemAxon metabolizer client (environmental fate server).

use std::time::Duration;

use serde_json::{json, Value};
use tracing::instrument;

use cts_common::client::UpstreamClient;
use cts_common::error::{CtsError, Result};
use cts_common::models::MetaboliteTree;

use crate::tree::{build_tree, TreeSource};

const METABOLIZER_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct MetabolizerClient {
    client: UpstreamClient,
    base: String,
}

impl MetabolizerClient {
    pub fn new(client: UpstreamClient, base_url: &str) -> Self {
        Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Run the metabolizer and normalize its ranked tree.
    #[instrument(skip(self))]
    pub async fn transform(&self, smiles: &str, gen_limit: u32) -> Result<MetaboliteTree> {
        let url = format!("{}/metabolizer/rest/run", self.base);
        let body = json!({
            "structure": smiles,
            "generationLimit": gen_limit,
            "populationLimit": 0,
            "likelyLimit": 0.001,
        });
        let resp = self.client.post_json(&url, &body, METABOLIZER_TIMEOUT).await?;
        let raw = raw_tree(&resp)?;
        Ok(build_tree(raw, gen_limit, true, TreeSource::Chemaxon))
    }
}

fn raw_tree(resp: &Value) -> Result<&Value> {
    let raw = &resp["results"];
    if raw.is_null() {
        return Err(CtsError::NoData("metabolizer tree".into()));
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_tree_missing_is_no_data() {
        assert!(raw_tree(&json!({})).is_err());
        assert!(raw_tree(&json!({ "results": { "smiles": "P" } })).is_ok());
    }
}
