//! Client configuration

use std::time::Duration;

use cohort_core::FhirError;

/// Default FHIR endpoint when none is configured (public HAPI R4 test server)
pub const DEFAULT_SERVER_URL: &str = "https://hapi.fhir.org/baseR4";

/// Per-request deadline applied when none is configured
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for a FHIR server
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration for the given server URL.
    ///
    /// Trailing slashes are trimmed so request paths join uniformly; the
    /// URL must parse and use an http or https scheme.
    pub fn new(base_url: &str) -> Result<Self, FhirError> {
        let cleaned = base_url.trim_end_matches('/');

        let parsed = url::Url::parse(cleaned).map_err(|e| {
            FhirError::InvalidArgument(format!("Invalid server URL '{cleaned}': {e}"))
        })?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FhirError::InvalidArgument(format!(
                "Server URL must use http or https, got: {}",
                parsed.scheme()
            )));
        }

        Ok(Self {
            base_url: cleaned.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, FhirError> {
        let base_url =
            std::env::var("FHIR_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.into());
        Self::new(&base_url)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
