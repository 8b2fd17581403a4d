//! Period-over-period change, threshold labels and average order value.

use std::fmt;

use crate::error::Result;
use crate::table::{TabularResult, Value};

/// Percentage change from `prev` to `curr`.
///
/// `0 → 0` is exactly `0.0`. `0 → anything else` is `None` ("new"), as is a
/// missing value on either side.
pub fn pct_change(prev: Option<f64>, curr: Option<f64>) -> Option<f64> {
    let (prev, curr) = (prev?, curr?);
    if prev == 0.0 {
        return (curr == 0.0).then_some(0.0);
    }
    Some((curr - prev) / prev * 100.0)
}

/// Appends `out` = percentage change from column `prev` to column `curr`.
pub fn with_change_column(
    result: &mut TabularResult,
    curr: &str,
    prev: &str,
    out: &str,
) -> Result<()> {
    let curr_idx = result.require_column(curr)?;
    let prev_idx = result.require_column(prev)?;

    let values: Vec<Value> = result
        .rows
        .iter()
        .map(|row| Value::from(pct_change(row[prev_idx].as_f64(), row[curr_idx].as_f64())))
        .collect();
    result.push_column(out, values)
}

/// Categorical label for a percentage change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeLabel {
    StrongIncrease,
    Increase,
    Stable,
    Decrease,
    StrongDecrease,
    /// No previous-period baseline.
    New,
}

impl ChangeLabel {
    /// Labels `pct` against `threshold` (in percent). "Strong" starts at twice the threshold.
    pub fn classify(pct: Option<f64>, threshold: f64) -> Self {
        let Some(pct) = pct else {
            return Self::New;
        };
        let threshold = threshold.abs();
        if pct >= 2.0 * threshold {
            Self::StrongIncrease
        } else if pct >= threshold {
            Self::Increase
        } else if pct <= -2.0 * threshold {
            Self::StrongDecrease
        } else if pct <= -threshold {
            Self::Decrease
        } else {
            Self::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrongIncrease => "strong increase",
            Self::Increase => "increase",
            Self::Stable => "stable",
            Self::Decrease => "decrease",
            Self::StrongDecrease => "strong decrease",
            Self::New => "new",
        }
    }
}

impl fmt::Display for ChangeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Appends `out` = [`ChangeLabel`] of the percentage column `pct_col`.
pub fn with_label_column(
    result: &mut TabularResult,
    pct_col: &str,
    out: &str,
    threshold: f64,
) -> Result<()> {
    let idx = result.require_column(pct_col)?;
    let values: Vec<Value> = result
        .rows
        .iter()
        .map(|row| Value::from(ChangeLabel::classify(row[idx].as_f64(), threshold).as_str()))
        .collect();
    result.push_column(out, values)
}

/// Revenue per order; `None` when there are no orders.
pub fn average_order_value(revenue: Option<f64>, orders: Option<f64>) -> Option<f64> {
    let (revenue, orders) = (revenue?, orders?);
    (orders != 0.0).then(|| revenue / orders)
}

/// Appends `out` = average order value of `revenue` over `orders`.
pub fn with_aov_column(
    result: &mut TabularResult,
    revenue: &str,
    orders: &str,
    out: &str,
) -> Result<()> {
    let rev_idx = result.require_column(revenue)?;
    let ord_idx = result.require_column(orders)?;
    let values: Vec<Value> = result
        .rows
        .iter()
        .map(|row| Value::from(average_order_value(row[rev_idx].as_f64(), row[ord_idx].as_f64())))
        .collect();
    result.push_column(out, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_change_regular() {
        assert_eq!(pct_change(Some(80.0), Some(100.0)), Some(25.0));
        assert_eq!(pct_change(Some(100.0), Some(50.0)), Some(-50.0));
    }

    #[test]
    fn test_pct_change_zero_baseline() {
        assert_eq!(pct_change(Some(0.0), Some(5.0)), None);
        assert_eq!(pct_change(Some(0.0), Some(0.0)), Some(0.0));
        assert_eq!(pct_change(Some(0.0), Some(-5.0)), None);
    }

    #[test]
    fn test_pct_change_missing() {
        assert_eq!(pct_change(None, Some(1.0)), None);
        assert_eq!(pct_change(Some(1.0), None), None);
    }

    #[test]
    fn test_change_column() {
        let mut result = TabularResult::with_data(
            vec!["curr_rev".into(), "prev_rev".into()],
            vec![
                vec![Value::Number(100.0), Value::Number(80.0)],
                vec![Value::Number(10.0), Value::Number(0.0)],
                vec![Value::Number(0.0), Value::Number(0.0)],
            ],
        )
        .unwrap();

        with_change_column(&mut result, "curr_rev", "prev_rev", "rev_change_pct").unwrap();

        assert_eq!(result.get(0, "rev_change_pct"), Some(&Value::Number(25.0)));
        assert_eq!(result.get(1, "rev_change_pct"), Some(&Value::Null));
        assert_eq!(result.get(2, "rev_change_pct"), Some(&Value::Number(0.0)));
    }

    #[test]
    fn test_change_column_missing_input() {
        let mut result = TabularResult::with_data(vec!["curr_rev".into()], vec![]).unwrap();
        assert!(with_change_column(&mut result, "curr_rev", "prev_rev", "x").is_err());
    }

    #[test]
    fn test_labels() {
        assert_eq!(ChangeLabel::classify(Some(25.0), 10.0), ChangeLabel::StrongIncrease);
        assert_eq!(ChangeLabel::classify(Some(20.0), 10.0), ChangeLabel::StrongIncrease);
        assert_eq!(ChangeLabel::classify(Some(12.0), 10.0), ChangeLabel::Increase);
        assert_eq!(ChangeLabel::classify(Some(5.0), 10.0), ChangeLabel::Stable);
        assert_eq!(ChangeLabel::classify(Some(-10.0), 10.0), ChangeLabel::Decrease);
        assert_eq!(ChangeLabel::classify(Some(-30.0), 10.0), ChangeLabel::StrongDecrease);
        assert_eq!(ChangeLabel::classify(None, 10.0), ChangeLabel::New);
        assert_eq!(ChangeLabel::New.to_string(), "new");
    }

    #[test]
    fn test_label_column() {
        let mut result = TabularResult::with_data(
            vec!["pct".into()],
            vec![vec![Value::Number(30.0)], vec![Value::Null]],
        )
        .unwrap();
        with_label_column(&mut result, "pct", "trend", 10.0).unwrap();
        assert_eq!(result.get(0, "trend"), Some(&Value::from("strong increase")));
        assert_eq!(result.get(1, "trend"), Some(&Value::from("new")));
    }

    #[test]
    fn test_average_order_value() {
        assert_eq!(average_order_value(Some(100.0), Some(4.0)), Some(25.0));
        assert_eq!(average_order_value(Some(100.0), Some(0.0)), None);
        assert_eq!(average_order_value(None, Some(1.0)), None);
    }

    #[test]
    fn test_aov_column() {
        let mut result = TabularResult::with_data(
            vec!["revenue".into(), "orders".into()],
            vec![vec![Value::Number(90.0), Value::Number(3.0)]],
        )
        .unwrap();
        with_aov_column(&mut result, "revenue", "orders", "aov").unwrap();
        assert_eq!(result.get(0, "aov"), Some(&Value::Number(30.0)));
    }
}
