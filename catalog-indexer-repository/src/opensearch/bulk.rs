//! Bulk request bodies and response parsing.

use serde_json::{json, Value};

use crate::interfaces::BulkDocument;

/// A document the engine rejected inside an otherwise accepted bulk request.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BulkItemFailure {
    pub id: String,
    pub status: u16,
    pub reason: String,
}

/// Build the NDJSON lines of a bulk upsert: an `update` action followed by a
/// `doc_as_upsert` body for every document.
pub(crate) fn bulk_lines(index: &str, documents: &[BulkDocument]) -> Vec<Value> {
    let mut lines = Vec::with_capacity(documents.len() * 2);
    for doc in documents {
        lines.push(json!({ "update": { "_index": index, "_id": doc.id } }));
        lines.push(json!({ "doc": doc.source, "doc_as_upsert": true }));
    }
    lines
}

/// Collect the items a bulk response reports as failed.
pub(crate) fn failed_items(response: &Value) -> Vec<BulkItemFailure> {
    if !response.get("errors").and_then(Value::as_bool).unwrap_or(false) {
        return Vec::new();
    }

    let Some(items) = response.get("items").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| item.as_object()?.values().next())
        .filter_map(|result| {
            let error = result.get("error")?;
            let reason = error
                .get("reason")
                .or_else(|| error.get("type"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            Some(BulkItemFailure {
                id: result
                    .get("_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                status: result.get("status").and_then(Value::as_u64).unwrap_or(0) as u16,
                reason,
            })
        })
        .collect()
}
