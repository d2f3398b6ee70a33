//! Domain record builders
//!
//! Each builder validates its input eagerly, collecting every bad field
//! before returning, and produces a JSON-ready document that is never
//! mutated afterwards. Updates are new documents.

pub mod crop;
pub mod farmer;
pub mod supply_chain;

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crop::{build_crop_record, CropInput, CropRecord, SoilData};
pub use farmer::{build_farmer_record, FarmerInput, FarmerRecord};
pub use supply_chain::{
    append_supply_chain_event, build_supply_chain_record, SupplyChainEvent,
    SupplyChainEventInput, SupplyChainInput, SupplyChainRecord, SupplyChainUpdate,
};

/// Free-form fields carried through untouched
pub type ExtraFields = serde_json::Map<String, serde_json::Value>;

/// A request field that parsed as JSON but possibly not as `T`.
///
/// Type mismatches are kept instead of failing the whole body, so they can
/// be reported next to every other bad field.
#[derive(Debug, Clone, PartialEq)]
pub enum Lenient<T> {
    Valid(T),
    Invalid(serde_json::Value),
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Lenient<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(match T::deserialize(&raw) {
            Ok(value) => Lenient::Valid(value),
            Err(_) => Lenient::Invalid(raw),
        })
    }
}

/// One rejected field
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every rejected field of one request
#[derive(Debug, Clone, Default, Serialize, Error, PartialEq, Eq)]
#[error("Validation failed for: {}", self.field_names().join(", "))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Unwrap an optional lenient field. A value of the wrong type is
    /// recorded as `<field> must be <expected>` and treated as absent.
    pub(crate) fn optional<T>(&mut self, field: &str, value: Option<Lenient<T>>, expected: &str) -> Option<T> {
        match value {
            Some(Lenient::Valid(value)) => Some(value),
            Some(Lenient::Invalid(_)) => {
                self.add(field, format!("{} must be {}", field, expected));
                None
            }
            None => None,
        }
    }

    /// Required text field: one error when it is missing, blank or not a string
    pub(crate) fn require_string(&mut self, field: &str, value: Option<Lenient<String>>) -> Option<String> {
        match value {
            Some(Lenient::Invalid(_)) => {
                self.add(field, format!("{} must be a string", field));
                None
            }
            Some(Lenient::Valid(text)) => self.require_text(field, Some(&text)),
            None => self.require_text(field, None),
        }
    }

    /// Record `field` as missing when `value` is absent or blank, returning
    /// the trimmed value otherwise
    pub(crate) fn require_text(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        match value.map(str::trim) {
            Some(text) if !text.is_empty() => Some(text.to_string()),
            _ => {
                self.add(field, format!("{} is required", field));
                None
            }
        }
    }
}

/// `<kind>_<epochMillis>`
pub(crate) fn record_id(kind: &str, now_ms: i64) -> String {
    format!("{}_{}", kind, now_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Body {
        size: Option<Lenient<f64>>,
        name: Option<Lenient<String>>,
    }

    #[test]
    fn test_lenient_keeps_mismatched_values() {
        let body: Body = serde_json::from_value(json!({ "size": "abc", "name": "Kofi" })).unwrap();
        assert_eq!(body.size, Some(Lenient::Invalid(json!("abc"))));
        assert_eq!(body.name, Some(Lenient::Valid("Kofi".to_string())));

        let body: Body = serde_json::from_value(json!({ "size": null })).unwrap();
        assert!(body.size.is_none());
        assert!(body.name.is_none());
    }

    #[test]
    fn test_type_mismatch_is_one_error_per_field() {
        let mut errors = ValidationErrors::new();
        assert_eq!(errors.require_string("name", Some(Lenient::Invalid(json!(7)))), None);
        assert_eq!(errors.require_string("location", None), None);
        assert_eq!(errors.optional("size", Some(Lenient::<f64>::Invalid(json!([]))), "a number"), None);
        assert_eq!(errors.optional::<f64>("depth", None, "a number"), None);

        assert_eq!(errors.field_names(), vec!["name", "location", "size"]);
        assert_eq!(errors.errors[0].message, "name must be a string");
        assert_eq!(errors.errors[2].message, "size must be a number");
    }
}
