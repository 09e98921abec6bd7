use thiserror::Error;

#[derive(Debug, Error)]
pub enum CtsError {
    /// Unparsable structure, metals, aromaticity errors. User-visible,
    /// never retried.
    #[error("{0}")]
    InvalidChemical(String),

    /// Molecular weight outside the range the calculators accept.
    #[error("{0}")]
    OversizeChemical(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// The upstream answered but the target field was absent.
    #[error("No data for {0}")]
    NoData(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for CtsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CtsError::Timeout(e.to_string())
        } else {
            CtsError::Network(e.to_string())
        }
    }
}

impl CtsError {
    /// Connection-level failures are retried by the client primitive;
    /// everything else is surfaced as-is.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            CtsError::Network(_) | CtsError::Timeout(_) | CtsError::Upstream { .. }
        )
    }

    /// The message shown to the caller when a calculator stays unreachable
    /// after all retries.
    pub fn unreachable(calc: &str) -> Self {
        CtsError::Network(format!("Cannot reach {} calculator", calc))
    }
}

pub type Result<T> = std::result::Result<T, CtsError>;
