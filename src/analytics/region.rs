//! Postal-code to region mapping and per-region totals.

use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::table::{TabularResult, Value};

/// Bucket for postal codes that match no configured prefix.
pub const UNKNOWN_REGION: &str = "unknown";

/// Postal districts keyed by the first digit of the code.
const DEFAULT_REGIONS: &[(&str, &str)] = &[
    ("0", "Warszawa"),
    ("1", "Olsztyn"),
    ("2", "Lublin"),
    ("3", "Kraków"),
    ("4", "Katowice"),
    ("5", "Wrocław"),
    ("6", "Poznań"),
    ("7", "Szczecin"),
    ("8", "Gdańsk"),
    ("9", "Łódź"),
];

/// Maps postal codes to region names by longest matching digit prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionLookup {
    prefixes: BTreeMap<String, String>,
    longest: usize,
}

impl RegionLookup {
    pub fn new(prefixes: BTreeMap<String, String>) -> Self {
        let longest = prefixes.keys().map(String::len).max().unwrap_or(0);
        Self { prefixes, longest }
    }

    /// Builds a lookup from the `[regions]` config table, or the default
    /// districts when the table is empty.
    pub fn from_config(regions: &BTreeMap<String, String>) -> Self {
        if regions.is_empty() {
            return Self::default();
        }
        let prefixes = regions
            .iter()
            .map(|(prefix, name)| (digits(prefix), name.clone()))
            .filter(|(prefix, _)| !prefix.is_empty())
            .collect();
        Self::new(prefixes)
    }

    /// Region for a postal code such as `"61-896"`. Non-digits are ignored.
    pub fn resolve(&self, postal_code: &str) -> Option<&str> {
        let code = digits(postal_code);
        (1..=self.longest.min(code.len()))
            .rev()
            .find_map(|len| self.prefixes.get(&code[..len]))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

impl Default for RegionLookup {
    fn default() -> Self {
        Self::new(
            DEFAULT_REGIONS
                .iter()
                .map(|(p, n)| (p.to_string(), n.to_string()))
                .collect(),
        )
    }
}

fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Sums `value_col` per region of `postal_col`, largest total first.
///
/// The result has two columns: `region` and `value_col`. Rows whose code does
/// not resolve are summed under [`UNKNOWN_REGION`].
pub fn aggregate_by_region(
    result: &TabularResult,
    postal_col: &str,
    value_col: &str,
    lookup: &RegionLookup,
) -> Result<TabularResult> {
    let postal_idx = result.require_column(postal_col)?;
    let value_idx = result.require_column(value_col)?;

    let mut totals: HashMap<String, f64> = HashMap::new();
    for row in &result.rows {
        let code = row[postal_idx].to_exact_string();
        let region = lookup.resolve(&code).unwrap_or(UNKNOWN_REGION);
        *totals.entry(region.to_string()).or_insert(0.0) +=
            row[value_idx].as_f64().unwrap_or(0.0);
    }

    let mut totals: Vec<(String, f64)> = totals.into_iter().collect();
    totals.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let value_name = result.columns[value_idx].clone();
    TabularResult::with_data(
        vec!["region".to_string(), value_name],
        totals
            .into_iter()
            .map(|(region, total)| vec![Value::Text(region), Value::Number(total)])
            .collect(),
    )
}
