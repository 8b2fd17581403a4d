use crate::error::{DashError, Result};
use crate::table::TabularResult;

/// Renders a result as CSV with a header row. Missing values are empty fields.
///
/// Numbers keep full precision; rounding is left to whoever reads the file.
pub fn to_csv(result: &TabularResult) -> Result<String> {
    let mut writer = ::csv::Writer::from_writer(vec![]);

    writer
        .write_record(&result.columns)
        .map_err(|e| DashError::io(format!("Failed to write CSV header: {e}")))?;
    for row in &result.rows {
        writer
            .write_record(row.iter().map(|v| v.to_exact_string()))
            .map_err(|e| DashError::io(format!("Failed to write CSV row: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DashError::io(format!("Failed to flush CSV: {e}")))?;
    String::from_utf8(bytes).map_err(|e| DashError::internal(format!("CSV is not UTF-8: {e}")))
}
