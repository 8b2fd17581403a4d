use crate::table::{TabularResult, Value};

/// Formats a result as an aligned plain-text table.
///
/// Numbers are right-aligned, everything else left-aligned. A row count
/// footer follows the last row.
pub fn render_table(result: &TabularResult) -> String {
    if result.columns.is_empty() {
        return "(no columns)".to_string();
    }

    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(Value::to_display_string).collect())
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut output = String::new();

    let header: Vec<String> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, h)| pad(h, widths[i], false))
        .collect();
    output.push_str(header.join(" │ ").trim_end());
    output.push('\n');

    let separator: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    output.push_str(&separator.join("─┼─"));
    output.push('\n');

    for (row, texts) in result.rows.iter().zip(&cells) {
        let line: Vec<String> = texts
            .iter()
            .enumerate()
            .map(|(i, cell)| pad(cell, widths[i], matches!(row[i], Value::Number(_))))
            .collect();
        output.push_str(line.join(" │ ").trim_end());
        output.push('\n');
    }

    let count = result.row_count();
    output.push_str(&format!("({} row{})", count, if count == 1 { "" } else { "s" }));
    output
}

fn pad(text: &str, width: usize, right: bool) -> String {
    if right {
        format!("{text:>width$}")
    } else {
        format!("{text:<width$}")
    }
}
