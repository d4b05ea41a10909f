//! Wire types for the two registry endpoints.
//!
//! Stage 1 (collection variant): `GET getKey` -> `[{ batchId, keyValuePairs: [{ key, value }] }]`.
//! Stage 1 (path variant): `GET getKey/{barcode}` -> `{ key }`.
//! Stage 2: `POST searchBarr1` with `{ searchValue }` (or `{ key }`) -> `{ result }`.

use serde::{Deserialize, Serialize};

/// One batch in the primary registry collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    pub batch_id: String,
    pub key_value_pairs: Vec<KeyValuePair>,
}

/// A registered key and the barcode value printed for it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

/// Path-variant primary response. A missing or empty key means the barcode is unknown.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyResponse {
    #[serde(default)]
    pub key: Option<String>,
}

/// Stage-2 request body, `{ "searchValue": .. }`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest<'a> {
    pub search_value: &'a str,
}

/// Stage-2 request body, `{ "key": .. }`.
#[derive(Debug, Clone, Serialize)]
pub struct KeyRequest<'a> {
    pub key: &'a str,
}

/// Stage-2 response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub result: String,
}

pub fn decode_batch_records(body: &str) -> Result<Vec<BatchRecord>, serde_json::Error> {
    serde_json::from_str(body)
}

pub fn decode_key_response(body: &str) -> Result<KeyResponse, serde_json::Error> {
    serde_json::from_str(body)
}

pub fn decode_search_response(body: &str) -> Result<SearchResponse, serde_json::Error> {
    serde_json::from_str(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_collection() {
        let body = r#"[{"batchId":"B1","keyValuePairs":[{"key":"K1","value":"ABC123"},{"key":"K2","value":"XYZ"}]}]"#;
        let records = decode_batch_records(body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].batch_id, "B1");
        assert_eq!(records[0].key_value_pairs[1].key, "K2");
    }

    #[test]
    fn decode_collection_rejects_missing_batch_id() {
        let body = r#"[{"keyValuePairs":[]}]"#;
        assert!(decode_batch_records(body).is_err());
    }

    #[test]
    fn decode_collection_rejects_object() {
        assert!(decode_batch_records(r#"{"batchId":"B1"}"#).is_err());
    }

    #[test]
    fn decode_key_response_missing_key() {
        let r = decode_key_response("{}").unwrap();
        assert!(r.key.is_none());
        let r = decode_key_response(r#"{"key":"K9"}"#).unwrap();
        assert_eq!(r.key.as_deref(), Some("K9"));
    }

    #[test]
    fn search_request_field_names() {
        let v = serde_json::to_value(SearchRequest { search_value: "K1" }).unwrap();
        assert_eq!(v, serde_json::json!({ "searchValue": "K1" }));
        let v = serde_json::to_value(KeyRequest { key: "K1" }).unwrap();
        assert_eq!(v, serde_json::json!({ "key": "K1" }));
    }

    #[test]
    fn decode_search_response_requires_result() {
        assert_eq!(
            decode_search_response(r#"{"result":"Acme Corp"}"#).unwrap().result,
            "Acme Corp"
        );
        assert!(decode_search_response("{}").is_err());
    }
}
