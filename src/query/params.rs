//! Query parameters and the native-query payload.
//!
//! Parameters are never spliced into SQL here. They are declared as template
//! tags and sent alongside the query text; the BI engine substitutes
//! `{{name}}` placeholders itself.

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{json, Map, Value as JsonValue};
use std::fmt;
use std::sync::OnceLock;
use tracing::warn;

use crate::error::{DashError, Result};

/// A scalar parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl ParamValue {
    /// Creates a text value.
    pub fn text(v: impl Into<String>) -> Self {
        Self::Text(v.into())
    }

    /// Creates a numeric value.
    pub fn number(v: f64) -> Self {
        Self::Number(v)
    }

    /// Creates a date value.
    pub fn date(v: NaiveDate) -> Self {
        Self::Date(v)
    }

    /// Infers the type of a raw string: ISO date, then number, then text.
    ///
    /// Only text that prints back unchanged becomes a number, so codes such
    /// as `00123` or `1e3` stay text.
    pub fn infer(raw: &str) -> Self {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Self::Date(date);
        }
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() && n.to_string() == raw => Self::Number(n),
            _ => Self::Text(raw.to_string()),
        }
    }

    /// Parses a raw string as an explicitly named type: `text`, `number`
    /// or `date`.
    pub fn parse_typed(kind: &str, raw: &str) -> Result<Self> {
        let raw = raw.trim();
        match kind {
            "text" => Ok(Self::text(raw)),
            "number" => raw
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Self::Number)
                .ok_or_else(|| DashError::config(format!("'{raw}' is not a number"))),
            "date" => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(Self::Date)
                .map_err(|_| DashError::config(format!("'{raw}' is not a YYYY-MM-DD date"))),
            other => Err(DashError::config(format!(
                "Unknown parameter type '{other}'. Expected text, number or date"
            ))),
        }
    }

    /// Template-tag type declared for this value.
    pub fn tag_type(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Date(_) => "date",
        }
    }

    /// Parameter type sent in the `parameters` array.
    pub fn parameter_type(&self) -> &'static str {
        match self {
            Self::Text(_) => "category",
            Self::Number(_) => "number/=",
            Self::Date(_) => "date/single",
        }
    }

    /// JSON form of the value.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Text(s) => json!(s),
            Self::Number(n) => json!(n),
            Self::Date(d) => json!(d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<NaiveDate> for ParamValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

/// Ordered mapping from placeholder name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    entries: Vec<(String, ParamValue)>,
}

impl QueryParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a parameter, replacing any previous value with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Looks up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Iterates parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Returns true if no parameters are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses a `name=value` assignment as given on the command line.
    ///
    /// `name:type=value` forces the type instead of inferring it.
    pub fn parse_assignment(raw: &str) -> Result<(String, ParamValue)> {
        let (target, value) = raw.split_once('=').ok_or_else(|| {
            DashError::config(format!("Invalid parameter '{raw}'. Expected NAME=VALUE"))
        })?;
        let (name, kind) = match target.split_once(':') {
            Some((name, kind)) => (name.trim(), Some(kind.trim())),
            None => (target.trim(), None),
        };
        if !placeholder_name_regex().is_match(name) {
            return Err(DashError::config(format!("Invalid parameter name '{name}'")));
        }
        let value = match kind {
            Some(kind) => ParamValue::parse_typed(kind, value)?,
            None => ParamValue::infer(value),
        };
        Ok((name.to_string(), value))
    }

    /// Stable string form used for cache keys (sorted by name).
    pub fn cache_key(&self) -> String {
        let mut parts: Vec<String> = self
            .entries
            .iter()
            .map(|(n, v)| format!("{}:{}={}", n, v.tag_type(), v))
            .collect();
        parts.sort();
        parts.join("&")
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
    })
}

fn placeholder_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("name pattern is valid"))
}

/// Distinct `{{name}}` placeholders in the query text, in order of first use.
pub fn placeholders(sql: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for cap in placeholder_regex().captures_iter(sql) {
        let name = cap[1].to_string();
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

/// Builds the native-query payload for `POST /dataset`.
///
/// Every placeholder in the query must have a value. Parameters the query does
/// not reference are dropped with a warning.
pub fn native_payload(database_id: u64, sql: &str, params: &QueryParams) -> Result<JsonValue> {
    let used = placeholders(sql);

    let missing: Vec<&str> = used
        .iter()
        .filter(|n| params.get(n.as_str()).is_none())
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(DashError::config(format!(
            "Query references parameters with no value: {}",
            missing.join(", ")
        )));
    }

    for (name, _) in params.iter() {
        if !used.iter().any(|u| u == name) {
            warn!("Parameter '{}' is not used by the query, ignoring it", name);
        }
    }

    let mut tags = Map::new();
    let mut parameters = Vec::new();
    for name in &used {
        let Some(value) = params.get(name) else {
            continue;
        };
        tags.insert(
            name.clone(),
            json!({
                "id": name,
                "name": name,
                "display-name": name,
                "type": value.tag_type(),
            }),
        );
        parameters.push(json!({
            "type": value.parameter_type(),
            "target": ["variable", ["template-tag", name]],
            "value": value.to_json(),
        }));
    }

    Ok(json!({
        "database": database_id,
        "type": "native",
        "native": {
            "query": sql,
            "template-tags": tags,
        },
        "parameters": parameters,
    }))
}
