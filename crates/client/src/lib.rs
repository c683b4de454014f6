//! cohort-client: REST client and cohort collection for FHIR R4 servers
//!
//! This crate provides a thin typed client over a FHIR R4 endpoint
//! (patient CRUD, search, pagination) and a collector that walks paged
//! search results into a bounded, optionally encounter-filtered cohort.

pub mod client;
pub mod collector;
pub mod config;
pub mod search;

// Re-export the public surface
pub use client::FhirClient;
pub use collector::{CohortSource, Collector};
pub use config::ClientConfig;
pub use search::SearchParams;
