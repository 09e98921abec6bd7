//! enviPath pathway-prediction client.

use serde_json::{json, Value};
use tracing::instrument;

use cts_common::client::UpstreamClient;
use cts_common::config::ENVIPATH_TIMEOUT;
use cts_common::error::{CtsError, Result};
use cts_common::models::MetaboliteTree;

use crate::tree::{build_tree, TreeSource};

#[derive(Debug, Clone)]
pub struct EnvipathClient {
    client: UpstreamClient,
    base: String,
}

impl EnvipathClient {
    pub fn new(client: UpstreamClient, base_url: &str) -> Self {
        Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Predict a pathway. `ranked` is false when the caller wants the raw
    /// relative-reasoning output without probability metrics.
    #[instrument(skip(self))]
    pub async fn transform(
        &self,
        smiles: &str,
        gen_limit: u32,
        ranked: bool,
    ) -> Result<MetaboliteTree> {
        let url = format!("{}/envipath/rest/pathway", self.base);
        let body = json!({
            "smiles": smiles,
            "generations": gen_limit,
        });
        let resp = self.client.post_json(&url, &body, ENVIPATH_TIMEOUT).await?;
        let raw = raw_tree(&resp)?;
        Ok(build_tree(raw, gen_limit, ranked, TreeSource::Envipath))
    }
}

fn raw_tree(resp: &Value) -> Result<&Value> {
    let raw = &resp["tree"];
    if raw.is_null() {
        return Err(CtsError::NoData("enviPath pathway".into()));
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_tree_extraction() {
        assert!(raw_tree(&json!({ "tree": { "smiles": "P" } })).is_ok());
        assert!(raw_tree(&json!({ "error": "no pathway" })).is_err());
    }
}
