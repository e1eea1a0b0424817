use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::symbol::Symbol;

/// A single observation of a derived series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatedValue {
    pub date: NaiveDate,
    pub value: f64,
}

impl DatedValue {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        DatedValue { date, value }
    }
}

/// Price series rescaled so the value at `base_date` is exactly 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSeries {
    pub symbol: Symbol,
    pub base_date: NaiveDate,
    pub points: Vec<DatedValue>,
}

impl NormalizedSeries {
    pub fn value_at(&self, date: NaiveDate) -> Option<f64> {
        value_at(&self.points, date)
    }

    pub fn last(&self) -> Option<&DatedValue> {
        self.points.last()
    }

    /// Percent change from the base date to the latest point.
    pub fn change_pct(&self) -> Option<f64> {
        self.last().map(|p| p.value - 100.0)
    }
}

/// Simple period-over-period returns. Holds no entry for a symbol's first
/// populated date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    pub symbol: Symbol,
    pub points: Vec<DatedValue>,
}

impl ReturnSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn value_at(&self, date: NaiveDate) -> Option<f64> {
        value_at(&self.points, date)
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn last(&self) -> Option<&DatedValue> {
        self.points.last()
    }
}

fn value_at(points: &[DatedValue], date: NaiveDate) -> Option<f64> {
    points
        .binary_search_by_key(&date, |p| p.date)
        .ok()
        .map(|i| points[i].value)
}
