//! Search result items and the catalog proxy payload.
//!
//! The proxy already reshapes upstream volumes into flat [`Book`] records, but
//! the client must never fail on a malformed payload: every string field
//! tolerates being missing, `null`, numeric, or (for `authors`) an array.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A single search result as delivered by the proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Book {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    /// Comma-joined author names.
    #[serde(deserialize_with = "lenient_string")]
    pub authors: String,
    #[serde(deserialize_with = "lenient_string")]
    pub publisher: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub thumbnail: String,
    #[serde(deserialize_with = "lenient_string")]
    pub info_link: String,
}

/// Body of `GET /search`.
///
/// `total_items` is the upstream estimate of results remaining from the
/// requested start index, not a grand total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(deserialize_with = "lenient_count")]
    pub total_items: u64,
    #[serde(deserialize_with = "lenient_items")]
    pub items: Vec<Book>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub error: Value,
}

impl SearchResponse {
    /// Whether the proxy flagged the response as failed.
    ///
    /// Any truthy `error` value counts: `true`, a non-empty string, a non-zero
    /// number, or an object/array.
    #[must_use]
    pub fn is_error(&self) -> bool {
        match &self.error {
            Value::Null => false,
            Value::Bool(flag) => *flag,
            Value::String(message) => !message.is_empty(),
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// Human-readable description of the flagged error.
    #[must_use]
    pub fn error_message(&self) -> String {
        match &self.error {
            Value::String(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(values) => values
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null | Value::Object(_) => String::new(),
    })
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(crate::store::state::as_number(&value)
        .filter(|n| n.is_finite() && *n > 0.0)
        .map_or(0, |n| n.floor() as u64))
}

fn lenient_items<'de, D>(deserializer: D) -> Result<Vec<Book>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(values) => Ok(values
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields_default_to_empty() {
        let book: Book = serde_json::from_value(json!({ "id": "abc", "title": null })).unwrap();
        assert_eq!(book.id, "abc");
        assert_eq!(book.title, "");
        assert_eq!(book.info_link, "");
    }

    #[test]
    fn test_authors_array_is_joined() {
        let book: Book =
            serde_json::from_value(json!({ "authors": ["Frank Herbert", "Brian Herbert"] })).unwrap();
        assert_eq!(book.authors, "Frank Herbert, Brian Herbert");
    }

    #[test]
    fn test_response_tolerates_malformed_payload() {
        let response: SearchResponse =
            serde_json::from_value(json!({ "totalItems": "12", "items": [1, { "title": "Dune" }] }))
                .unwrap();
        assert_eq!(response.total_items, 12);
        assert_eq!(response.items.len(), 1);
        assert_eq!(response.items[0].title, "Dune");
        assert!(!response.is_error());

        let response: SearchResponse =
            serde_json::from_value(json!({ "items": null, "totalItems": -4 })).unwrap();
        assert!(response.items.is_empty());
        assert_eq!(response.total_items, 0);
    }

    #[test]
    fn test_error_flag_truthiness() {
        let flagged: SearchResponse = serde_json::from_value(json!({ "error": true, "items": [] })).unwrap();
        assert!(flagged.is_error());

        let message: SearchResponse = serde_json::from_value(json!({ "error": "quota" })).unwrap();
        assert!(message.is_error());
        assert_eq!(message.error_message(), "quota");

        let clear: SearchResponse = serde_json::from_value(json!({ "error": false })).unwrap();
        assert!(!clear.is_error());
    }
}
