//! cohort-core: Shared FHIR R4 types for the cohort client
//!
//! This crate provides the simplified resource types the client works
//! with: Patient, Bundle, and OperationOutcome, plus the error taxonomy
//! shared across the workspace.

pub mod bundle;
pub mod error;
pub mod outcome;
pub mod patient;

// Re-export our types
pub use bundle::{Bundle, BundleEntry, BundleLink, BundleType};
pub use error::FhirError;
pub use outcome::{IssueSeverity, OperationOutcome, OperationOutcomeIssue};
pub use patient::{ContactPoint, HumanName, Patient};
