//! CCTE (EPA Computational Toxicology) API client.
//!
//! Supplies the canonical registry record (DTXSID, DTXCID, preferred CAS
//! and name) plus the measured property and fate endpoints the Measured
//! calculator consumes. Every request carries the `x-api-key` header.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use cts_common::client::UpstreamClient;
use cts_common::config::{CtsConfig, CCTE_TIMEOUT};
use cts_common::error::{CtsError, Result};

const CCTE_API_URL: &str = "https://api-ccte.epa.gov";

/// Canonical registry record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CcteRecord {
    pub dtxsid: Option<String>,
    pub dtxcid: Option<String>,
    pub casrn: Option<String>,
    #[serde(rename = "preferredName")]
    pub preferred_name: Option<String>,
    pub smiles: Option<String>,
    #[serde(rename = "iupacName")]
    pub iupac_name: Option<String>,
    #[serde(rename = "averageMass")]
    pub average_mass: Option<f64>,
    #[serde(rename = "monoisotopicMass")]
    pub monoisotopic_mass: Option<f64>,
}

/// One measured property entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CcteProperty {
    #[serde(rename = "propName")]
    pub prop_name: String,
    pub value: Option<f64>,
    pub unit: Option<String>,
    /// Full ACS source citation string.
    pub source: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CcteClient {
    client: UpstreamClient,
    api_key: String,
    base: String,
}

impl CcteClient {
    pub fn new(client: UpstreamClient, config: &CtsConfig) -> Self {
        Self {
            client,
            api_key: config.ccte_api_key().to_string(),
            base: CCTE_API_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_base(client: UpstreamClient, api_key: &str, base: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            base: base.to_string(),
        }
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base, path);
        self.client
            .get_json(&url, &[("x-api-key", &self.api_key)], CCTE_TIMEOUT)
            .await
    }

    /// Exact-match search over names, CAS numbers, DTXSIDs and InChIKeys.
    #[instrument(skip(self))]
    pub async fn search_equal(&self, id: &str) -> Result<CcteRecord> {
        let resp = self.get(&format!("chemical/search/equal/{}", id)).await?;
        parse_search(&resp)
    }

    /// Fallback lookup used when `search_equal` is unavailable.
    #[instrument(skip(self))]
    pub async fn chemical_identifier(&self, input: &str) -> Result<CcteRecord> {
        let resp = self
            .get(&format!("chemical/search/chemicalIdentifier/{}", input))
            .await?;
        parse_search(&resp)
    }

    #[instrument(skip(self))]
    pub async fn detail_by_dtxsid(&self, dtxsid: &str) -> Result<CcteRecord> {
        let resp = self
            .get(&format!("chemical/detail/by-dtxsid/{}", dtxsid))
            .await?;
        let record: CcteRecord = serde_json::from_value(resp)?;
        debug!(dtxsid = dtxsid, "CCTE detail fetched");
        Ok(record)
    }

    /// Measured physicochemical properties for a substance.
    #[instrument(skip(self))]
    pub async fn properties_by_dtxsid(&self, dtxsid: &str) -> Result<Vec<CcteProperty>> {
        let resp = self
            .get(&format!("chemical/property/search/by-dtxsid/{}", dtxsid))
            .await?;
        parse_properties(&resp)
    }

    /// Measured environmental fate endpoints (BCF, BAF, Koc).
    #[instrument(skip(self))]
    pub async fn fate_by_dtxsid(&self, dtxsid: &str) -> Result<Vec<CcteProperty>> {
        let resp = self
            .get(&format!("chemical/fate/search/by-dtxsid/{}", dtxsid))
            .await?;
        parse_properties(&resp)
    }
}

/// Search responses are a list; the first record wins.
fn parse_search(resp: &Value) -> Result<CcteRecord> {
    let entry = match resp {
        Value::Array(items) => items.first().cloned(),
        other => Some(other.clone()),
    }
    .ok_or_else(|| CtsError::NoData("CCTE search".into()))?;

    Ok(serde_json::from_value(entry)?)
}

fn parse_properties(resp: &Value) -> Result<Vec<CcteProperty>> {
    let items = resp
        .as_array()
        .ok_or_else(|| CtsError::NoData("CCTE properties".into()))?;
    Ok(items
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_search_takes_first_record() {
        let resp = json!([
            {
                "dtxsid": "DTXSID5020108",
                "dtxcid": "DTXCID30108",
                "casrn": "50-78-2",
                "preferredName": "Aspirin",
                "smiles": "CC(=O)OC1=C(C=CC=C1)C(O)=O",
                "averageMass": 180.159,
            },
            { "dtxsid": "DTXSID0000002" },
        ]);
        let rec = parse_search(&resp).unwrap();
        assert_eq!(rec.dtxsid.as_deref(), Some("DTXSID5020108"));
        assert_eq!(rec.preferred_name.as_deref(), Some("Aspirin"));
        assert_eq!(rec.average_mass, Some(180.159));
    }

    #[test]
    fn test_parse_search_empty_is_no_data() {
        assert!(matches!(parse_search(&json!([])), Err(CtsError::NoData(_))));
    }

    #[test]
    fn test_parse_properties() {
        let resp = json!([
            {
                "propName": "Melting Point",
                "value": 135.0,
                "unit": "C",
                "source": "Journal of the American Chemical Society",
            },
            { "propName": "Boiling Point", "value": null, "unit": null, "source": null },
        ]);
        let props = parse_properties(&resp).unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].value, Some(135.0));
    }

    #[test]
    fn test_client_construction() {
        let client = UpstreamClient::new().unwrap();
        let ccte = CcteClient::with_base(client, "key", "http://localhost:9");
        assert_eq!(ccte.base, "http://localhost:9");
    }
}
