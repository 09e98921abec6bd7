//! Cactus (NCI) structure resolver — associated CAS numbers only.
//! Failure here is always non-fatal; callers degrade to `"N/A"`.

use std::time::Duration;

use tracing::instrument;

use cts_common::client::UpstreamClient;
use cts_common::error::Result;

const CACTUS_URL: &str = "https://cactus.nci.nih.gov/chemical/structure";
const CACTUS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct CactusClient {
    client: UpstreamClient,
}

impl CactusClient {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }

    /// Associated CAS numbers for a structure, newline-separated upstream.
    #[instrument(skip(self))]
    pub async fn associated_cas(&self, smiles: &str) -> Result<Vec<String>> {
        let url = format!("{}/{}/cas", CACTUS_URL, smiles);
        let text = self.client.get_text(&url, CACTUS_TIMEOUT).await?;
        Ok(parse_cas_list(&text))
    }
}

fn parse_cas_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cas_list() {
        let text = "50-78-2\n11126-35-5\n\n2349-94-2\n";
        assert_eq!(parse_cas_list(text), vec!["50-78-2", "11126-35-5", "2349-94-2"]);
        assert!(parse_cas_list("").is_empty());
    }
}
