use std::fmt;

use serde::{Deserialize, Serialize};

/// FHIR Patient resource (simplified to the fields the client reads and
/// writes; everything else stays on the server untouched)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telecom: Vec<ContactPoint>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Name of a person, split into parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanName {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Contact detail (phone, email, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
}

impl Patient {
    /// Create a new patient with a single name entry.
    pub fn new(family: &str, given: &str) -> Self {
        Self {
            resource_type: "Patient".to_string(),
            id: None,
            name: vec![HumanName {
                family: Some(family.to_string()),
                given: vec![given.to_string()],
                text: None,
            }],
            telecom: Vec::new(),
            gender: None,
            birth_date: None,
            active: None,
        }
    }

    /// Append a home phone number to the contact set.
    pub fn add_phone(&mut self, value: &str) {
        self.telecom.push(ContactPoint {
            system: Some("phone".to_string()),
            value: Some(value.to_string()),
            use_: Some("home".to_string()),
        });
    }

    /// First name entry rendered for display.
    pub fn display_name(&self) -> String {
        self.name
            .first()
            .map(|n| n.to_string())
            .unwrap_or_else(|| "(unnamed)".to_string())
    }
}

impl fmt::Display for HumanName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = self.given.iter().map(String::as_str).collect();
        if let Some(family) = &self.family {
            parts.push(family);
        }
        if parts.is_empty() {
            return write!(f, "{}", self.text.as_deref().unwrap_or(""));
        }
        write!(f, "{}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_patient_shape() {
        let patient = Patient::new("Chalmers", "Peter");
        assert_eq!(patient.resource_type, "Patient");
        assert!(patient.id.is_none());
        assert_eq!(patient.display_name(), "Peter Chalmers");
    }

    #[test]
    fn test_add_phone_grows_telecom() {
        let mut patient = Patient::new("Chalmers", "Peter");
        patient.add_phone("555-0101");

        assert_eq!(patient.telecom.len(), 1);
        assert_eq!(patient.telecom[0].system.as_deref(), Some("phone"));
        assert_eq!(patient.telecom[0].value.as_deref(), Some("555-0101"));
    }

    #[test]
    fn test_name_falls_back_to_text() {
        let name = HumanName {
            family: None,
            given: Vec::new(),
            text: Some("Peter James Chalmers".to_string()),
        };
        assert_eq!(name.to_string(), "Peter James Chalmers");
    }

    #[test]
    fn test_deserialize_server_patient() {
        let raw = json!({
            "resourceType": "Patient",
            "id": "example",
            "meta": {"versionId": "1"},
            "name": [{"family": "Chalmers", "given": ["Peter", "James"]}],
            "telecom": [{"system": "phone", "value": "555-0101", "use": "home"}],
            "gender": "male",
            "birthDate": "1974-12-25",
            "active": true
        });

        let patient: Patient = serde_json::from_value(raw).unwrap();
        assert_eq!(patient.id.as_deref(), Some("example"));
        assert_eq!(patient.display_name(), "Peter James Chalmers");
        assert_eq!(patient.birth_date.as_deref(), Some("1974-12-25"));
        assert_eq!(patient.telecom[0].use_.as_deref(), Some("home"));
    }

    #[test]
    fn test_serialize_skips_absent_fields() {
        let patient = Patient::new("Chalmers", "Peter");
        let value = serde_json::to_value(&patient).unwrap();

        let object = value.as_object().unwrap();
        assert!(!object.contains_key("id"));
        assert!(!object.contains_key("telecom"));
        assert!(!object.contains_key("birthDate"));
    }
}
