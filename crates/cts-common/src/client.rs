//! The single HTTP primitive every upstream call goes through.
//!
//! Calls retry up to `MAX_RETRIES` times on connect errors, timeouts, and
//! non-200 statuses, re-sending the same body. No backoff: the upstreams
//! are few and the calls idempotent. After the retries the last error is
//! surfaced.

use std::time::Duration;

use reqwest::{Client, ClientBuilder, Method};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CtsError, Result};

pub const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
}

#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
}

impl UpstreamClient {
    pub fn new() -> Result<Self> {
        let client = ClientBuilder::new()
            .build()
            .map_err(|e| CtsError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Issue one request with retries; the parsed JSON body comes back on
    /// status 200.
    pub async fn call(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<UpstreamResponse> {
        let mut last_err = CtsError::Network(format!("No attempt made for {}", url));

        for attempt in 1..=MAX_RETRIES {
            match self.attempt(method.clone(), url, body, headers, timeout).await {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_retriable() => {
                    warn!(url = url, attempt = attempt, error = %e, "Upstream call failed");
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err)
    }

    async fn attempt(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<UpstreamResponse> {
        let mut req = self.client.request(method, url).timeout(timeout);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        if status != 200 {
            let message = resp.text().await.unwrap_or_default();
            return Err(CtsError::Upstream { status, message });
        }

        let parsed = resp.json::<Value>().await?;
        debug!(url = url, "Upstream call succeeded");
        Ok(UpstreamResponse { status, body: parsed })
    }

    pub async fn post_json(&self, url: &str, body: &Value, timeout: Duration) -> Result<Value> {
        Ok(self.call(Method::POST, url, Some(body), &[], timeout).await?.body)
    }

    pub async fn get_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Value> {
        Ok(self.call(Method::GET, url, None, headers, timeout).await?.body)
    }

    /// GET expecting a plain-text body (the Cactus resolver answers with
    /// newline-separated values). Single attempt: the lookup is optional
    /// enrichment and failure is non-fatal for every caller.
    pub async fn get_text(&self, url: &str, timeout: Duration) -> Result<String> {
        let resp = self.client.get(url).timeout(timeout).send().await?;
        let status = resp.status().as_u16();
        if status != 200 {
            let message = resp.text().await.unwrap_or_default();
            return Err(CtsError::Upstream { status, message });
        }
        Ok(resp.text().await?)
    }

    /// POST expecting a non-JSON body (the BioTransformer init endpoint
    /// answers with HTML). Retries follow the same policy as `call`.
    pub async fn post_text(
        &self,
        url: &str,
        form: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<String> {
        let mut last_err = CtsError::Network(format!("No attempt made for {}", url));

        for attempt in 1..=MAX_RETRIES {
            let result = async {
                let resp = self
                    .client
                    .post(url)
                    .form(form)
                    .timeout(timeout)
                    .send()
                    .await?;
                let status = resp.status().as_u16();
                if status != 200 {
                    let message = resp.text().await.unwrap_or_default();
                    return Err(CtsError::Upstream { status, message });
                }
                Ok(resp.text().await?)
            }
            .await;

            match result {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retriable() => {
                    warn!(url = url, attempt = attempt, error = %e, "Upstream call failed");
                    last_err = e;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err)
    }
}
