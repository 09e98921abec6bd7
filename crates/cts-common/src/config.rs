//! Environment-driven configuration.
//!
//! Every upstream base URL comes from its own `CTS_*_SERVER` variable; the
//! CCTE API key from `CCTE_API_KEY`. URLs are optional until the adapter
//! that needs one is first used, at which point a missing URL is a
//! `Configuration` error. The API key is required at initialization.

use std::env;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::{CtsError, Result};

/// Per-upstream request timeouts.
pub const JCHEM_TIMEOUT: Duration = Duration::from_secs(10);
pub const CCTE_TIMEOUT: Duration = Duration::from_secs(20);
pub const EPI_TIMEOUT: Duration = Duration::from_secs(30);
pub const SPARC_TIMEOUT: Duration = Duration::from_secs(10);
pub const OPERA_TIMEOUT: Duration = Duration::from_secs(300);
pub const BIOTRANS_MAX_WAIT: Duration = Duration::from_secs(30);
pub const ENVIPATH_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct CtsConfig {
    jchem_server: Option<String>,
    epi_server: Option<String>,
    opera_server: Option<String>,
    sparc_server: Option<String>,
    test_server: Option<String>,
    efs_server: Option<String>,
    biotrans_server: Option<String>,
    envipath_server: Option<String>,
    molgpka_server: Option<String>,
    pkasolver_server: Option<String>,
    ccte_api_key: SecretString,
}

impl CtsConfig {
    /// Read configuration from the environment (honoring a `.env` file).
    /// A missing `CCTE_API_KEY` is fatal here; missing base URLs surface
    /// later, at first use of the adapter that needs them.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let key = env::var("CCTE_API_KEY")
            .map_err(|_| CtsError::Configuration("CCTE_API_KEY is not set".into()))?;

        Ok(Self {
            jchem_server: env::var("CTS_JCHEM_SERVER").ok(),
            epi_server: env::var("CTS_EPI_SERVER").ok(),
            opera_server: env::var("CTS_OPERA_SERVER").ok(),
            sparc_server: env::var("CTS_SPARC_SERVER").ok(),
            test_server: env::var("CTS_TEST_SERVER").ok(),
            efs_server: env::var("CTS_EFS_SERVER").ok(),
            biotrans_server: env::var("CTS_BIOTRANS_SERVER").ok(),
            envipath_server: env::var("CTS_ENVIPATH_SERVER").ok(),
            molgpka_server: env::var("CTS_MOLGPKA_SERVER").ok(),
            pkasolver_server: env::var("CTS_PKASOLVER_SERVER").ok(),
            ccte_api_key: key.into(),
        })
    }

    /// Build a config directly; used by tests and embedders.
    #[allow(clippy::too_many_arguments)]
    pub fn with_servers(api_key: &str, jchem: Option<&str>, epi: Option<&str>) -> Self {
        Self {
            jchem_server: jchem.map(String::from),
            epi_server: epi.map(String::from),
            opera_server: None,
            sparc_server: None,
            test_server: None,
            efs_server: None,
            biotrans_server: None,
            envipath_server: None,
            molgpka_server: None,
            pkasolver_server: None,
            ccte_api_key: api_key.to_string().into(),
        }
    }

    fn require(url: &Option<String>, var: &str) -> Result<String> {
        url.clone()
            .ok_or_else(|| CtsError::Configuration(format!("{} is not set", var)))
    }

    pub fn jchem_server(&self) -> Result<String> {
        Self::require(&self.jchem_server, "CTS_JCHEM_SERVER")
    }

    pub fn epi_server(&self) -> Result<String> {
        Self::require(&self.epi_server, "CTS_EPI_SERVER")
    }

    pub fn opera_server(&self) -> Result<String> {
        Self::require(&self.opera_server, "CTS_OPERA_SERVER")
    }

    pub fn sparc_server(&self) -> Result<String> {
        Self::require(&self.sparc_server, "CTS_SPARC_SERVER")
    }

    pub fn test_server(&self) -> Result<String> {
        Self::require(&self.test_server, "CTS_TEST_SERVER")
    }

    /// Environmental fate server (ChemAxon metabolizer).
    pub fn efs_server(&self) -> Result<String> {
        Self::require(&self.efs_server, "CTS_EFS_SERVER")
    }

    pub fn biotrans_server(&self) -> Result<String> {
        Self::require(&self.biotrans_server, "CTS_BIOTRANS_SERVER")
    }

    pub fn envipath_server(&self) -> Result<String> {
        Self::require(&self.envipath_server, "CTS_ENVIPATH_SERVER")
    }

    pub fn molgpka_server(&self) -> Result<String> {
        Self::require(&self.molgpka_server, "CTS_MOLGPKA_SERVER")
    }

    pub fn pkasolver_server(&self) -> Result<String> {
        Self::require(&self.pkasolver_server, "CTS_PKASOLVER_SERVER")
    }

    /// Header value for CCTE requests. Exposed only at call-construction
    /// time; the key never appears in Debug output.
    pub fn ccte_api_key(&self) -> &str {
        self.ccte_api_key.expose_secret()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_url_is_configuration_error() {
        let cfg = CtsConfig::with_servers("k", None, None);
        match cfg.jchem_server() {
            Err(CtsError::Configuration(msg)) => assert!(msg.contains("CTS_JCHEM_SERVER")),
            other => panic!("expected Configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_present_url_round_trips() {
        let cfg = CtsConfig::with_servers("k", Some("http://jchem.local"), None);
        assert_eq!(cfg.jchem_server().unwrap(), "http://jchem.local");
    }

    #[test]
    fn test_api_key_not_in_debug() {
        let cfg = CtsConfig::with_servers("super-secret", None, None);
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("super-secret"));
        assert_eq!(cfg.ccte_api_key(), "super-secret");
    }
}
