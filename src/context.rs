use crate::record::{FieldValue, Fields};
use serde::Serialize;

/// Tag added to every event logged while serving a web request.
pub const WEB_REQUEST_TAG: &str = "webRequest";

/// Request metadata attached to every event logged while a request is
/// being served.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestContext {
    pub hostname: String,
    pub method: String,
    pub path: String,
    pub protocol: String,
    pub url: String,
    #[serde(rename = "clientIP")]
    pub client_ip: Option<String>,
}

impl RequestContext {
    /// Context fields in the shape log consumers query on:
    /// `{"tags": ["webRequest"], "request": {...}}`.
    pub fn to_fields(&self) -> Fields {
        let request = serde_json::to_value(self).unwrap_or_default();

        let mut fields = Fields::new();
        fields.insert(
            "tags".to_string(),
            FieldValue::List(vec![FieldValue::from(WEB_REQUEST_TAG)]),
        );
        fields.insert("request".to_string(), FieldValue::Json(request));
        fields
    }
}

/// Merge `incoming` into `shared`, descending into nested maps.
///
/// Lists under the same key are concatenated, maps are merged key by key,
/// and any other collision is resolved in favor of `incoming`. Raw JSON
/// objects and arrays take part in the merge like their field equivalents.
pub fn merge_recursive(shared: &mut Fields, incoming: Fields) {
    for (key, value) in incoming {
        match shared.remove(&key) {
            Some(existing) => {
                shared.insert(key, merge_values(existing, value));
            }
            None => {
                shared.insert(key, value);
            }
        }
    }
}

fn merge_values(existing: FieldValue, incoming: FieldValue) -> FieldValue {
    match (into_fields(existing), into_fields(incoming)) {
        (Ok(mut left), Ok(right)) => {
            merge_recursive(&mut left, right);
            FieldValue::Map(left)
        }
        (Err(left), Err(right)) => match (into_list(left), into_list(right)) {
            (Ok(mut left), Ok(right)) => {
                left.extend(right);
                FieldValue::List(left)
            }
            (_, Ok(right)) => FieldValue::List(right),
            (_, Err(right)) => right,
        },
        (_, Ok(right)) => FieldValue::Map(right),
        (_, Err(right)) => right,
    }
}

fn into_fields(value: FieldValue) -> Result<Fields, FieldValue> {
    match value {
        FieldValue::Map(fields) => Ok(fields),
        FieldValue::Json(serde_json::Value::Object(map)) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, FieldValue::Json(v)))
            .collect()),
        other => Err(other),
    }
}

fn into_list(value: FieldValue) -> Result<Vec<FieldValue>, FieldValue> {
    match value {
        FieldValue::List(items) => Ok(items),
        FieldValue::Json(serde_json::Value::Array(items)) => {
            Ok(items.into_iter().map(FieldValue::Json).collect())
        }
        other => Err(other),
    }
}
