use serde::Serialize;

use crate::error::RegistryError;

/// Trims, upper-cases and strips every whitespace character from a registration
/// number. Applying it twice gives the same result as applying it once.
#[must_use]
pub fn normalize_registration(registration: &str) -> String {
    registration
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// The body of an enquiry request. Serializes to `{"registrationNumber": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    registration_number: String,
}

impl QueryRequest {
    /// Normalizes the registration number and rejects it if nothing is left.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Validation`] for empty or whitespace-only input.
    pub fn new(registration: &str) -> Result<Self, RegistryError> {
        let registration_number = normalize_registration(registration);
        if registration_number.is_empty() {
            return Err(RegistryError::validation(
                "Registration number must not be empty",
            ));
        }
        Ok(Self {
            registration_number,
        })
    }

    #[must_use]
    pub fn registration_number(&self) -> &str {
        &self.registration_number
    }
}
