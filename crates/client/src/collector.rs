//! Paged patient collection with optional encounter filtering

use async_trait::async_trait;
use cohort_core::{Bundle, FhirError, Patient};

use crate::search::SearchParams;

/// Source of paged patient search results and per-patient encounter
/// counts. Implemented by [`crate::FhirClient`] and by scripted sources
/// in tests.
#[async_trait]
pub trait CohortSource: Send + Sync {
    /// First page of a patient search.
    async fn patients(&self, params: &SearchParams) -> Result<Bundle, FhirError>;

    /// Follow the page's continuation link; `None` on the last page.
    async fn continue_page(&self, page: &Bundle) -> Result<Option<Bundle>, FhirError>;

    /// Number of encounters referencing the patient.
    async fn encounter_total(&self, patient_id: &str) -> Result<u32, FhirError>;
}

/// Collects a bounded list of patients by walking search result pages
pub struct Collector<S> {
    source: S,
}

impl<S: CohortSource> Collector<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Walk pages of matching patients, collecting at most `max_results`.
    ///
    /// Entries are consumed in server order and the collected list keeps
    /// that order. With `only_with_encounters` set, patients referenced
    /// by no encounter are skipped. Collection stops the moment the limit
    /// is reached, mid-page, without examining any further entry; any
    /// source error ends the walk immediately.
    pub async fn collect(
        &self,
        criteria: &SearchParams,
        max_results: usize,
        only_with_encounters: bool,
    ) -> Result<Vec<Patient>, FhirError> {
        let mut collected = Vec::new();
        if max_results == 0 {
            return Ok(collected);
        }

        let mut examined: u32 = 0;
        let mut skipped: u32 = 0;
        let mut page = Some(self.source.patients(criteria).await?);

        while let Some(current) = page {
            tracing::debug!(
                total = current.total,
                entries = current.entry_count(),
                "Processing result page"
            );

            for entry in &current.entry {
                // Deleted-resource tombstones carry no payload
                let Some(resource) = &entry.resource else {
                    continue;
                };

                let patient: Patient = serde_json::from_value(resource.clone())
                    .map_err(|e| FhirError::Transport(format!("Malformed patient entry: {e}")))?;
                examined += 1;

                if only_with_encounters {
                    // A patient returned without an id cannot be referenced
                    // by any encounter; treat it as having none
                    let encounters = match patient.id.as_deref() {
                        Some(id) if !id.is_empty() => self.source.encounter_total(id).await?,
                        _ => 0,
                    };
                    if encounters == 0 {
                        skipped += 1;
                        tracing::debug!(
                            patient = patient.id.as_deref().unwrap_or("?"),
                            "Skipping patient without encounters"
                        );
                        continue;
                    }
                }

                collected.push(patient);
                if collected.len() >= max_results {
                    tracing::info!(
                        collected = collected.len(),
                        examined = examined,
                        skipped = skipped,
                        "Collection limit reached"
                    );
                    return Ok(collected);
                }
            }

            page = self.source.continue_page(&current).await?;
        }

        tracing::info!(
            collected = collected.len(),
            examined = examined,
            skipped = skipped,
            "Result pages exhausted"
        );
        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_core::BundleEntry;
    use serde_json::{Value as JsonValue, json};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted source serving pre-built pages and per-patient encounter
    /// totals, counting calls so tests can assert what was touched.
    struct ScriptedSource {
        pages: Vec<Bundle>,
        encounter_totals: HashMap<String, u32>,
        encounter_error: bool,
        search_calls: Mutex<u32>,
        page_calls: Mutex<u32>,
        encounter_calls: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Bundle>) -> Self {
            Self {
                pages,
                encounter_totals: HashMap::new(),
                encounter_error: false,
                search_calls: Mutex::new(0),
                page_calls: Mutex::new(0),
                encounter_calls: Mutex::new(Vec::new()),
            }
        }

        fn with_encounters(mut self, patient_id: &str, total: u32) -> Self {
            self.encounter_totals.insert(patient_id.to_string(), total);
            self
        }

        fn failing_encounters(mut self) -> Self {
            self.encounter_error = true;
            self
        }

        fn search_calls(&self) -> u32 {
            *self.search_calls.lock().unwrap()
        }

        fn page_calls(&self) -> u32 {
            *self.page_calls.lock().unwrap()
        }

        fn encounter_calls(&self) -> Vec<String> {
            self.encounter_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CohortSource for ScriptedSource {
        async fn patients(&self, _params: &SearchParams) -> Result<Bundle, FhirError> {
            *self.search_calls.lock().unwrap() += 1;
            Ok(self.pages[0].clone())
        }

        async fn continue_page(&self, page: &Bundle) -> Result<Option<Bundle>, FhirError> {
            let Some(link) = page.next_link() else {
                return Ok(None);
            };
            *self.page_calls.lock().unwrap() += 1;
            let index: usize = link.strip_prefix("page:").unwrap().parse().unwrap();
            Ok(Some(self.pages[index].clone()))
        }

        async fn encounter_total(&self, patient_id: &str) -> Result<u32, FhirError> {
            self.encounter_calls
                .lock()
                .unwrap()
                .push(patient_id.to_string());
            if self.encounter_error {
                return Err(FhirError::Transport("encounter search failed".to_string()));
            }
            Ok(*self.encounter_totals.get(patient_id).unwrap_or(&0))
        }
    }

    fn patient_json(id: &str) -> JsonValue {
        json!({
            "resourceType": "Patient",
            "id": id,
            "name": [{"family": "Tester", "given": ["Pat"]}]
        })
    }

    /// Build linked pages from per-page patient id lists.
    fn scripted_pages(page_ids: &[&[&str]]) -> Vec<Bundle> {
        let total: u32 = page_ids.iter().map(|p| p.len() as u32).sum();
        page_ids
            .iter()
            .enumerate()
            .map(|(i, ids)| {
                let entries = ids
                    .iter()
                    .map(|id| {
                        BundleEntry::new(
                            Some(format!("http://mock.local/Patient/{id}")),
                            Some(patient_json(id)),
                        )
                    })
                    .collect();
                let mut bundle = Bundle::searchset(total, entries);
                if i + 1 < page_ids.len() {
                    bundle = bundle.with_link("next", &format!("page:{}", i + 1));
                }
                bundle
            })
            .collect()
    }

    fn ids(patients: &[Patient]) -> Vec<&str> {
        patients.iter().filter_map(|p| p.id.as_deref()).collect()
    }

    #[tokio::test]
    async fn test_collects_single_page_in_order() {
        let source = ScriptedSource::new(scripted_pages(&[&["p1", "p2", "p3"]]));
        let collector = Collector::new(source);

        let result = collector
            .collect(&SearchParams::new(), 3, false)
            .await
            .unwrap();

        assert_eq!(ids(&result), vec!["p1", "p2", "p3"]);
        assert_eq!(collector.source.search_calls(), 1);
        // No filtering requested, so the encounter endpoint is never touched
        assert!(collector.source.encounter_calls().is_empty());
    }

    #[tokio::test]
    async fn test_stops_mid_page_at_limit() {
        let source = ScriptedSource::new(scripted_pages(&[&["p1", "p2"], &["p3", "p4"]]));
        let collector = Collector::new(source);

        let result = collector
            .collect(&SearchParams::new(), 3, false)
            .await
            .unwrap();

        assert_eq!(ids(&result), vec!["p1", "p2", "p3"]);
        // Page 2 was fetched once; nothing after p3 triggered another fetch
        assert_eq!(collector.source.page_calls(), 1);
    }

    #[tokio::test]
    async fn test_limit_stops_before_filtering_later_entries() {
        let source = ScriptedSource::new(scripted_pages(&[&["p1", "p2"], &["p3", "p4"]]))
            .with_encounters("p1", 1)
            .with_encounters("p2", 1)
            .with_encounters("p3", 1)
            .with_encounters("p4", 1);
        let collector = Collector::new(source);

        let result = collector
            .collect(&SearchParams::new(), 3, true)
            .await
            .unwrap();

        assert_eq!(ids(&result), vec!["p1", "p2", "p3"]);
        // p4 was never examined, so it was never probed for encounters
        assert_eq!(collector.source.encounter_calls(), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_filters_patients_without_encounters() {
        let source =
            ScriptedSource::new(scripted_pages(&[&["p1", "p2", "p3"]])).with_encounters("p2", 2);
        let collector = Collector::new(source);

        let result = collector
            .collect(&SearchParams::new(), 10, true)
            .await
            .unwrap();

        assert_eq!(ids(&result), vec!["p2"]);
        // Every examined patient was probed exactly once
        assert_eq!(collector.source.encounter_calls(), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_zero_limit_issues_no_search() {
        let source = ScriptedSource::new(scripted_pages(&[&["p1"]]));
        let collector = Collector::new(source);

        let result = collector
            .collect(&SearchParams::new(), 0, false)
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(collector.source.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_limit_on_first_page_skips_continuation() {
        let source = ScriptedSource::new(scripted_pages(&[&["p1", "p2"], &["p3"]]));
        let collector = Collector::new(source);

        let result = collector
            .collect(&SearchParams::new(), 1, false)
            .await
            .unwrap();

        assert_eq!(ids(&result), vec!["p1"]);
        assert_eq!(collector.source.page_calls(), 0);
    }

    #[tokio::test]
    async fn test_exhausts_pages_when_under_limit() {
        let source = ScriptedSource::new(scripted_pages(&[&["p1", "p2"], &["p3"]]));
        let collector = Collector::new(source);

        let result = collector
            .collect(&SearchParams::new(), 10, false)
            .await
            .unwrap();

        assert_eq!(ids(&result), vec!["p1", "p2", "p3"]);
        assert_eq!(collector.source.page_calls(), 1);
    }

    #[tokio::test]
    async fn test_skips_entries_without_payload() {
        let entries = vec![
            BundleEntry::new(Some("http://mock.local/Patient/gone".to_string()), None),
            BundleEntry::new(
                Some("http://mock.local/Patient/p1".to_string()),
                Some(patient_json("p1")),
            ),
            BundleEntry::new(
                Some("http://mock.local/Patient/p2".to_string()),
                Some(patient_json("p2")),
            ),
        ];
        let source = ScriptedSource::new(vec![Bundle::searchset(3, entries)]);
        let collector = Collector::new(source);

        // The tombstone consumes none of the limit of 2
        let result = collector
            .collect(&SearchParams::new(), 2, false)
            .await
            .unwrap();

        assert_eq!(ids(&result), vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_malformed_entry_is_a_transport_error() {
        let entries = vec![BundleEntry::new(
            Some("http://mock.local/Patient/bad".to_string()),
            Some(json!({"resourceType": "Patient", "name": "not-a-list"})),
        )];
        let source = ScriptedSource::new(vec![Bundle::searchset(1, entries)]);
        let collector = Collector::new(source);

        let err = collector
            .collect(&SearchParams::new(), 5, false)
            .await
            .unwrap_err();

        assert!(matches!(err, FhirError::Transport(_)));
    }

    #[tokio::test]
    async fn test_source_error_propagates_immediately() {
        let source =
            ScriptedSource::new(scripted_pages(&[&["p1", "p2"]])).failing_encounters();
        let collector = Collector::new(source);

        let err = collector
            .collect(&SearchParams::new(), 5, true)
            .await
            .unwrap_err();

        assert!(matches!(err, FhirError::Transport(_)));
        // Failed on the first probe; no retry, no second probe
        assert_eq!(collector.source.encounter_calls(), vec!["p1"]);
    }
}
