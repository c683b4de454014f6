//! Patient search criteria

/// Search criteria for patient queries.
///
/// Values are passed through as FHIR search parameters, so prefixes like
/// `ge1990-01-01` on the birthdate work as the server defines them.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<String>,
    pub count: Option<u32>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_gender(mut self, gender: &str) -> Self {
        self.gender = Some(gender.to_string());
        self
    }

    pub fn with_birthdate(mut self, birthdate: &str) -> Self {
        self.birthdate = Some(birthdate.to_string());
        self
    }

    /// Page-size hint (`_count`); the server may cap it.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// True when no criteria are set (an unfiltered search).
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.gender.is_none()
            && self.birthdate.is_none()
            && self.count.is_none()
    }

    /// Render the criteria as query pairs for the search request.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(name) = &self.name {
            pairs.push(("name".to_string(), name.clone()));
        }
        if let Some(gender) = &self.gender {
            pairs.push(("gender".to_string(), gender.clone()));
        }
        if let Some(birthdate) = &self.birthdate {
            pairs.push(("birthdate".to_string(), birthdate.clone()));
        }
        if let Some(count) = self.count {
            pairs.push(("_count".to_string(), count.to_string()));
        }
        pairs
    }
}
