use serde_json::{Map, Value as JsonValue};

use crate::error::{DashError, Result};
use crate::table::TabularResult;

/// Renders a result as a pretty-printed JSON array with one object per row.
///
/// Object keys follow column order.
pub fn to_json(result: &TabularResult) -> Result<String> {
    encode(&records(result)?)
}

/// Renders named sections as one JSON object, each section an array of rows.
pub fn sections_to_json(sections: &[(String, TabularResult)]) -> Result<String> {
    let mut object = Map::new();
    for (name, result) in sections {
        object.insert(name.clone(), JsonValue::Array(records(result)?));
    }
    encode(&object)
}

fn records(result: &TabularResult) -> Result<Vec<JsonValue>> {
    result
        .rows
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .zip(row)
                .map(|(name, value)| serde_json::to_value(value).map(|v| (name.clone(), v)))
                .collect::<std::result::Result<Map<String, JsonValue>, serde_json::Error>>()
                .map(JsonValue::Object)
        })
        .collect::<std::result::Result<Vec<JsonValue>, _>>()
        .map_err(|e| DashError::internal(format!("Failed to encode row: {e}")))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| DashError::internal(format!("Failed to encode JSON: {e}")))
}
