use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single value in a registry response. The registry only ever sends flat
/// objects, so anything nested is rejected when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl FieldValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Null renders as an empty string. Everything else renders the way it would
/// appear in the JSON document, minus the quotes around strings.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(value) => write!(f, "{value}"),
            FieldValue::Number(value) => write!(f, "{value}"),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value.into())
    }
}

/// The vehicle data returned for one registration number.
///
/// Field names and their order come straight from the registry. Keys are unique;
/// inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleRecord {
    fields: IndexMap<String, FieldValue>,
}

impl VehicleRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// The `registrationNumber` field, if the registry sent one as a string.
    #[must_use]
    pub fn registration_number(&self) -> Option<&str> {
        self.get("registrationNumber").and_then(FieldValue::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Mutable access to the values. Keys stay fixed so the key set and order
    /// cannot change through this.
    pub fn values_mut(&mut self) -> impl Iterator<Item = (&str, &mut FieldValue)> {
        self.fields
            .iter_mut()
            .map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for VehicleRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializing_keeps_response_order() {
        let record: VehicleRecord =
            serde_json::from_str(r#"{"make":"FORD","colour":"RED","engineCapacity":1598}"#)
                .unwrap();

        assert_eq!(
            record.keys().collect::<Vec<_>>(),
            ["make", "colour", "engineCapacity"]
        );
        assert_eq!(record.get("engineCapacity"), Some(&FieldValue::from(1598)));
    }

    #[test]
    fn scalar_kinds_are_told_apart() {
        let record: VehicleRecord = serde_json::from_str(
            r#"{"a":null,"b":false,"c":2.5,"d":"text"}"#,
        )
        .unwrap();

        assert!(record.get("a").unwrap().is_null());
        assert_eq!(record.get("b"), Some(&FieldValue::Bool(false)));
        assert!(matches!(record.get("c"), Some(FieldValue::Number(_))));
        assert_eq!(record.get("d").and_then(FieldValue::as_str), Some("text"));
    }

    #[test]
    fn nested_values_are_rejected() {
        assert!(serde_json::from_str::<VehicleRecord>(r#"{"a":{"b":1}}"#).is_err());
        assert!(serde_json::from_str::<VehicleRecord>(r#"{"a":[1,2]}"#).is_err());
        assert!(serde_json::from_str::<VehicleRecord>("[1,2]").is_err());
    }

    #[test]
    fn display_matches_document_notation() {
        assert_eq!(FieldValue::Null.to_string(), "");
        assert_eq!(FieldValue::Bool(true).to_string(), "true");
        assert_eq!(FieldValue::from(124).to_string(), "124");
        assert_eq!(FieldValue::from("PETROL").to_string(), "PETROL");
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut record: VehicleRecord = [("make", "FORD"), ("colour", "RED")].into_iter().collect();
        record.insert("make", "VAUXHALL");

        assert_eq!(record.len(), 2);
        assert_eq!(record.keys().next(), Some("make"));
        assert_eq!(record.get("make").and_then(FieldValue::as_str), Some("VAUXHALL"));
    }
}
