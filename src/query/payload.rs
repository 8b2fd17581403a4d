//! Classification of raw API payloads.
//!
//! Every JSON body is first sorted into one of a closed set of shapes. Field
//! access happens only after classification; an unrecognized shape fails
//! immediately instead of being guessed at.

use serde_json::{Map, Value as JsonValue};

use crate::error::{DashError, Result};
use crate::table::{anonymous_columns, normalize_column_name, Row, TabularResult, Value};

/// Known payload shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// Rows as arrays plus explicit column metadata.
    Columnar {
        columns: Vec<String>,
        rows: Vec<Vec<JsonValue>>,
    },
    /// Rows as a list of objects keyed by column name.
    Records(Vec<Map<String, JsonValue>>),
    /// Rows as arrays with no column metadata.
    BareRows(Vec<Vec<JsonValue>>),
    /// The query was accepted but is still running.
    Pending { token: String },
    /// The engine reported the query as failed.
    Failed { message: String },
}

impl RawPayload {
    /// Sorts a JSON body into one of the known shapes.
    pub fn classify(json: JsonValue) -> Result<Self> {
        match json {
            JsonValue::Array(items) => Self::classify_array(items),
            JsonValue::Object(mut obj) => {
                if obj.get("status").and_then(JsonValue::as_str) == Some("failed") {
                    let message = match obj.remove("error") {
                        Some(JsonValue::String(s)) => s,
                        Some(other) => other.to_string(),
                        None => "query failed without an error message".to_string(),
                    };
                    return Ok(Self::Failed { message });
                }

                if let Some(data) = obj.remove("data") {
                    return match data {
                        JsonValue::Object(data) => Self::classify_columnar(data),
                        JsonValue::Array(items) => Self::classify_array(items),
                        other => Err(DashError::decode(format!(
                            "'data' is neither an object nor an array: {}",
                            type_name(&other)
                        ))),
                    };
                }

                if obj.contains_key("rows") {
                    return Self::classify_columnar(obj);
                }

                if let Some(token) = pending_token(&obj) {
                    return Ok(Self::Pending { token });
                }

                let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
                Err(DashError::decode(format!(
                    "unrecognized payload object with keys [{}]",
                    keys.join(", ")
                )))
            }
            other => Err(DashError::decode(format!(
                "unrecognized payload: expected object or array, got {}",
                type_name(&other)
            ))),
        }
    }

    fn classify_array(items: Vec<JsonValue>) -> Result<Self> {
        if items.is_empty() {
            return Ok(Self::Records(Vec::new()));
        }

        if items.iter().all(JsonValue::is_object) {
            let records = items
                .into_iter()
                .filter_map(|item| match item {
                    JsonValue::Object(map) => Some(map),
                    _ => None,
                })
                .collect();
            return Ok(Self::Records(records));
        }

        if items.iter().all(JsonValue::is_array) {
            return Ok(Self::BareRows(into_rows(items)?));
        }

        Err(DashError::decode(
            "array payload mixes objects, arrays and scalars",
        ))
    }

    fn classify_columnar(mut obj: Map<String, JsonValue>) -> Result<Self> {
        let rows = match obj.remove("rows") {
            Some(JsonValue::Array(rows)) => into_rows(rows)?,
            Some(other) => {
                return Err(DashError::decode(format!(
                    "'rows' must be an array, got {}",
                    type_name(&other)
                )))
            }
            None => return Err(DashError::decode("result object has no 'rows'")),
        };

        let meta = obj.remove("cols").or_else(|| obj.remove("columns"));
        match meta {
            Some(JsonValue::Array(cols)) => {
                let columns = cols
                    .iter()
                    .map(column_name)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::Columnar { columns, rows })
            }
            Some(other) => Err(DashError::decode(format!(
                "column metadata must be an array, got {}",
                type_name(&other)
            ))),
            None => Ok(Self::BareRows(rows)),
        }
    }

    /// Converts a result shape into a normalized table.
    ///
    /// `fallback` names the columns of a [`RawPayload::BareRows`] payload. When
    /// it is given, every row must have exactly that many values. Without it,
    /// columns are named `col_1..col_n`.
    pub fn into_table(self, fallback: Option<&[String]>) -> Result<TabularResult> {
        match self {
            Self::Columnar { columns, rows } => {
                if let Some(row) = rows.iter().find(|r| r.len() != columns.len()) {
                    return Err(DashError::schema(format!(
                        "column metadata lists {} columns but a row has {} values",
                        columns.len(),
                        row.len()
                    )));
                }
                TabularResult::with_data(columns, convert_rows(rows))
            }
            Self::Records(records) => records_to_table(records),
            Self::BareRows(rows) => {
                let columns = match fallback {
                    Some(expected) => {
                        if let Some(row) = rows.iter().find(|r| r.len() != expected.len()) {
                            return Err(DashError::schema(format!(
                                "result has no column metadata and a row has {} values; \
                                 the expected layout has {} ({})",
                                row.len(),
                                expected.len(),
                                expected.join(", ")
                            )));
                        }
                        expected.to_vec()
                    }
                    None => anonymous_columns(rows.first().map_or(0, Vec::len)),
                };
                TabularResult::with_data(columns, convert_rows(rows))
            }
            Self::Pending { token } => Err(DashError::internal(format!(
                "job {token} is still pending; poll it before reading rows"
            ))),
            Self::Failed { message } => Err(DashError::query_failed(200, &message)),
        }
    }
}

fn into_rows(items: Vec<JsonValue>) -> Result<Vec<Vec<JsonValue>>> {
    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            JsonValue::Array(row) => Ok(row),
            other => Err(DashError::decode(format!(
                "row {} is not an array: {}",
                idx,
                type_name(&other)
            ))),
        })
        .collect()
}

fn convert_rows(rows: Vec<Vec<JsonValue>>) -> Vec<Row> {
    rows.iter()
        .map(|row| row.iter().map(Value::from).collect())
        .collect()
}

/// Column order is first-seen key order across all records; absent keys are `Null`.
///
/// Keys are normalized before they are merged, so `"Curr Rev"` in one record
/// and `"curr_rev"` in the next fill the same column. Two keys in one record
/// that normalize alike are ambiguous and rejected.
fn records_to_table(records: Vec<Map<String, JsonValue>>) -> Result<TabularResult> {
    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Row> = Vec::with_capacity(records.len());

    for (idx, record) in records.iter().enumerate() {
        let mut cells: Vec<(usize, Value)> = Vec::with_capacity(record.len());
        for (key, value) in record {
            let name = normalize_column_name(key);
            let pos = match columns.iter().position(|c| *c == name) {
                Some(pos) => pos,
                None => {
                    columns.push(name.clone());
                    columns.len() - 1
                }
            };
            if cells.iter().any(|(p, _)| *p == pos) {
                return Err(DashError::schema(format!(
                    "record {idx} has more than one key for column '{name}'"
                )));
            }
            cells.push((pos, Value::from(value)));
        }

        let mut row = vec![Value::Null; columns.len()];
        for (pos, value) in cells {
            row[pos] = value;
        }
        rows.push(row);
    }

    for row in &mut rows {
        row.resize(columns.len(), Value::Null);
    }

    TabularResult::with_data(columns, rows)
}

fn column_name(meta: &JsonValue) -> Result<String> {
    match meta {
        JsonValue::String(name) => Ok(name.clone()),
        JsonValue::Object(obj) => obj
            .get("name")
            .or_else(|| obj.get("display_name"))
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| DashError::decode("column metadata entry has no 'name'")),
        other => Err(DashError::decode(format!(
            "column metadata entry must be a string or object, got {}",
            type_name(other)
        ))),
    }
}

fn pending_token(obj: &Map<String, JsonValue>) -> Option<String> {
    ["token", "id"].iter().find_map(|key| match obj.get(*key) {
        Some(JsonValue::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn type_name(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
