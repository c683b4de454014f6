//! REST client for a FHIR R4 server

use async_trait::async_trait;
use cohort_core::{Bundle, FhirError, OperationOutcome, Patient};
use serde::de::DeserializeOwned;

use crate::collector::CohortSource;
use crate::config::ClientConfig;
use crate::search::SearchParams;

const FHIR_JSON: &str = "application/fhir+json";

/// Client for a FHIR R4 REST endpoint
#[derive(Clone)]
pub struct FhirClient {
    http: reqwest::Client,
    base_url: String,
}

impl FhirClient {
    /// Create a new client for the configured server
    pub fn new(config: ClientConfig) -> Result<Self, FhirError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|e| FhirError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    /// Search a resource type with raw query pairs
    pub async fn search(
        &self,
        resource_type: &str,
        query: &[(String, String)],
    ) -> Result<Bundle, FhirError> {
        let url = format!("{}/{}", self.base_url, resource_type);
        tracing::debug!(resource_type = resource_type, "Sending search request");

        let response = self
            .http
            .get(&url)
            .header("Accept", FHIR_JSON)
            .query(query)
            .send()
            .await
            .map_err(|e| FhirError::Transport(format!("Search request failed: {e}")))?;

        self.handle_response(response, &format!("{resource_type} search"))
            .await
    }

    /// Search patients with typed criteria
    pub async fn search_patients(&self, params: &SearchParams) -> Result<Bundle, FhirError> {
        self.search("Patient", &params.to_query()).await
    }

    /// Search encounters referencing the given patient
    pub async fn search_encounters(&self, patient_id: &str) -> Result<Bundle, FhirError> {
        if patient_id.is_empty() {
            return Err(FhirError::InvalidArgument(
                "patient id must not be empty".to_string(),
            ));
        }
        let query = vec![("patient".to_string(), format!("Patient/{patient_id}"))];
        self.search("Encounter", &query).await
    }

    /// Fetch the page following `page`, or `None` when it is the last one
    pub async fn next_page(&self, page: &Bundle) -> Result<Option<Bundle>, FhirError> {
        let Some(link) = page.next_link() else {
            return Ok(None);
        };
        let url = self.resolve_link(link)?;
        tracing::debug!(url = %url, "Following next link");

        let response = self
            .http
            .get(&url)
            .header("Accept", FHIR_JSON)
            .send()
            .await
            .map_err(|e| FhirError::Transport(format!("Page request failed: {e}")))?;

        let bundle = self.handle_response(response, "Page fetch").await?;
        Ok(Some(bundle))
    }

    /// Read a single patient by id
    pub async fn read(&self, id: &str) -> Result<Patient, FhirError> {
        if id.is_empty() {
            return Err(FhirError::InvalidArgument(
                "patient id must not be empty".to_string(),
            ));
        }
        let url = format!("{}/Patient/{}", self.base_url, id);

        let response = self
            .http
            .get(&url)
            .header("Accept", FHIR_JSON)
            .send()
            .await
            .map_err(|e| FhirError::Transport(format!("Read request failed: {e}")))?;

        self.handle_response(response, &format!("Patient/{id}")).await
    }

    /// Create a patient, returning the server's stored representation
    pub async fn create(&self, patient: &Patient) -> Result<Patient, FhirError> {
        let url = format!("{}/Patient", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("Accept", FHIR_JSON)
            .header("Content-Type", FHIR_JSON)
            .header("Prefer", "return=representation")
            .json(patient)
            .send()
            .await
            .map_err(|e| FhirError::Transport(format!("Create request failed: {e}")))?;

        self.handle_response(response, "Patient create").await
    }

    /// Update a patient in place, returning the post-update representation
    pub async fn update(&self, patient: &Patient) -> Result<Patient, FhirError> {
        let Some(id) = patient.id.as_deref().filter(|id| !id.is_empty()) else {
            return Err(FhirError::InvalidArgument(
                "patient has no id to update".to_string(),
            ));
        };
        let url = format!("{}/Patient/{}", self.base_url, id);

        let response = self
            .http
            .put(&url)
            .header("Accept", FHIR_JSON)
            .header("Content-Type", FHIR_JSON)
            .header("Prefer", "return=representation")
            .json(patient)
            .send()
            .await
            .map_err(|e| FhirError::Transport(format!("Update request failed: {e}")))?;

        self.handle_response(response, &format!("Patient/{id}")).await
    }

    /// Delete a patient by id
    pub async fn delete(&self, id: &str) -> Result<(), FhirError> {
        if id.is_empty() {
            return Err(FhirError::InvalidArgument(
                "patient id must not be empty".to_string(),
            ));
        }
        let url = format!("{}/Patient/{}", self.base_url, id);

        let response = self
            .http
            .delete(&url)
            .header("Accept", FHIR_JSON)
            .send()
            .await
            .map_err(|e| FhirError::Transport(format!("Delete request failed: {e}")))?;

        // Success carries no body worth parsing (204, or 200 with an outcome)
        if response.status().is_success() {
            return Ok(());
        }
        Err(self
            .error_from_response(response, &format!("Patient/{id}"))
            .await)
    }

    /// Resolve a next link against the base URL; absolute links pass through
    fn resolve_link(&self, link: &str) -> Result<String, FhirError> {
        if link.starts_with("http://") || link.starts_with("https://") {
            return Ok(link.to_string());
        }
        let base = url::Url::parse(&self.base_url)
            .map_err(|e| FhirError::Transport(format!("Invalid base URL: {e}")))?;
        let joined = base
            .join(link)
            .map_err(|e| FhirError::Transport(format!("Invalid next link '{link}': {e}")))?;
        Ok(joined.to_string())
    }

    /// Check the status and decode the body, mapping failures to errors
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        context: &str,
    ) -> Result<T, FhirError> {
        if !response.status().is_success() {
            return Err(self.error_from_response(response, context).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| FhirError::Transport(format!("{context}: failed to parse response: {e}")))
    }

    /// Map a non-success response to an error, reading any OperationOutcome
    /// the server included for diagnostics
    async fn error_from_response(&self, response: reqwest::Response, context: &str) -> FhirError {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return FhirError::NotFound(context.to_string());
        }

        let body = response.text().await.unwrap_or_default();
        let diagnostics = serde_json::from_str::<OperationOutcome>(&body)
            .ok()
            .and_then(|outcome| outcome.first_diagnostics().map(str::to_string));

        match diagnostics {
            Some(detail) => FhirError::Transport(format!("{context} failed ({status}): {detail}")),
            None if body.is_empty() => FhirError::Transport(format!("{context} failed ({status})")),
            None => FhirError::Transport(format!("{context} failed ({status}): {body}")),
        }
    }
}

#[async_trait]
impl CohortSource for FhirClient {
    async fn patients(&self, params: &SearchParams) -> Result<Bundle, FhirError> {
        self.search_patients(params).await
    }

    async fn continue_page(&self, page: &Bundle) -> Result<Option<Bundle>, FhirError> {
        self.next_page(page).await
    }

    async fn encounter_total(&self, patient_id: &str) -> Result<u32, FhirError> {
        let bundle = self.search_encounters(patient_id).await?;
        // Servers may omit the total; fall back to counting the entries
        Ok(bundle.total.unwrap_or(bundle.entry_count() as u32))
    }
}
