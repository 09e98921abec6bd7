//! BioTransformer client.
//!
//! The service is asynchronous: a form POST starts a query and answers
//! with an HTML page carrying the query id; the result is then polled as
//! JSON until the status turns terminal. Polling slows down with the
//! requested generation depth and gives up once the cumulative wait
//! exceeds `BIOTRANS_MAX_WAIT`.

use std::time::Duration;

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, instrument};

use cts_common::client::UpstreamClient;
use cts_common::config::BIOTRANS_MAX_WAIT;
use cts_common::error::{CtsError, Result};
use cts_common::models::MetaboliteTree;

use crate::tree::{fold_pairs, ProductPair};

const INIT_TIMEOUT: Duration = Duration::from_secs(20);
const POLL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct BiotransClient {
    client: UpstreamClient,
    base: String,
}

impl BiotransClient {
    pub fn new(client: UpstreamClient, base_url: &str) -> Self {
        Self {
            client,
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Start a query, poll it to completion, and fold the reported
    /// (precursor, product) pairs into a tree.
    #[instrument(skip(self))]
    pub async fn transform(&self, smiles: &str, gen_limit: u32) -> Result<MetaboliteTree> {
        let query_id = self.start_query(smiles, gen_limit).await?;
        let resp = self.poll(&query_id, gen_limit).await?;
        let pairs = parse_pairs(&resp);
        fold_pairs(&pairs, gen_limit)
            .ok_or_else(|| CtsError::NoData("biotransformer products".into()))
    }

    async fn start_query(&self, smiles: &str, gen_limit: u32) -> Result<String> {
        let url = init_url(&self.base);
        let steps = gen_limit.to_string();
        let form = [
            ("biotransformer_option", "env"),
            ("number_of_steps", steps.as_str()),
            ("query_input", smiles),
        ];
        let html = self.client.post_text(&url, &form, INIT_TIMEOUT).await?;
        extract_query_id(&html)
    }

    async fn poll(&self, query_id: &str, gen_limit: u32) -> Result<Value> {
        let url = poll_url(&self.base, query_id);
        let delay = poll_delay(gen_limit);
        let mut waited = Duration::ZERO;

        loop {
            tokio::time::sleep(delay).await;
            waited += delay;

            let resp = self.client.get_json(&url, &[], POLL_TIMEOUT).await?;
            match resp["status"].as_str().unwrap_or_default() {
                "Done" => {
                    debug!(query_id = query_id, "BioTransformer query finished");
                    return Ok(resp);
                }
                "failed" => {
                    return Err(CtsError::Upstream {
                        status: 200,
                        message: format!("BioTransformer query {} failed", query_id),
                    })
                }
                status => debug!(query_id = query_id, status = status, "Still running"),
            }

            if waited >= BIOTRANS_MAX_WAIT {
                return Err(CtsError::Timeout(format!(
                    "BioTransformer query {} still running after {:?}",
                    query_id, BIOTRANS_MAX_WAIT
                )));
            }
        }
    }
}

/// Init answers HTML even though the route carries the `.json` suffix.
fn init_url(base: &str) -> String {
    format!("{}/queries.json", base)
}

fn poll_url(base: &str, query_id: &str) -> String {
    format!("{}/queries/{}.json", base, query_id)
}

/// Deeper queries take longer, so poll less eagerly.
fn poll_delay(gen_limit: u32) -> Duration {
    match gen_limit {
        0 | 1 => Duration::from_secs(1),
        2 => Duration::from_secs(2),
        _ => Duration::from_secs(5),
    }
}

/// The query id sits on the status div of the confirmation page.
fn extract_query_id(html: &str) -> Result<String> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("div#query-status")
        .map_err(|e| CtsError::NoData(format!("bad selector: {}", e)))?;
    doc.select(&selector)
        .find_map(|el| el.value().attr("data-query-id"))
        .map(String::from)
        .ok_or_else(|| CtsError::NoData("biotransformer query id".into()))
}

fn parse_pairs(resp: &Value) -> Vec<ProductPair> {
    let Some(rows) = resp["transformations"].as_array() else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| {
            Some(ProductPair {
                precursor: row["substrate"].as_str()?.to_string(),
                product: row["product"].as_str()?.to_string(),
                reaction: row["reaction"].as_str().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_query_id() {
        let html = r#"<html><body>
            <div id="query-status" data-query-id="q-12345" class="pending">Queued</div>
        </body></html>"#;
        assert_eq!(extract_query_id(html).unwrap(), "q-12345");
    }

    #[test]
    fn test_extract_query_id_missing_is_no_data() {
        let html = "<html><body><div id=\"other\"></div></body></html>";
        assert!(matches!(extract_query_id(html), Err(CtsError::NoData(_))));
    }

    #[test]
    fn test_parse_pairs() {
        let resp = json!({
            "status": "Done",
            "transformations": [
                { "substrate": "P", "product": "A", "reaction": "oxidation" },
                { "substrate": "A", "product": "C", "reaction": "hydrolysis" },
                { "substrate": "P", "product": null, "reaction": "broken row" },
            ]
        });
        let pairs = parse_pairs(&resp);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].precursor, "P");
        assert_eq!(pairs[1].product, "C");
    }

    #[test]
    fn test_query_urls() {
        assert_eq!(init_url("http://bt"), "http://bt/queries.json");
        assert_eq!(poll_url("http://bt", "q-12345"), "http://bt/queries/q-12345.json");
    }

    #[test]
    fn test_poll_delay_scales_with_depth() {
        assert_eq!(poll_delay(1), Duration::from_secs(1));
        assert_eq!(poll_delay(2), Duration::from_secs(2));
        assert_eq!(poll_delay(3), Duration::from_secs(5));
        assert_eq!(poll_delay(4), Duration::from_secs(5));
    }
}
