use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::symbol::Symbol;
use crate::errors::AppError;

/// Per-symbol closing prices on a shared, strictly increasing date axis.
///
/// A symbol with no observation on a date holds `None` in that cell. Newly
/// listed instruments therefore have leading `None`s rather than zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<Symbol, Vec<Option<f64>>>,
}

impl PriceTable {
    /// Build a table from an explicit date axis and one column per symbol.
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: BTreeMap<Symbol, Vec<Option<f64>>>,
    ) -> Result<Self, AppError> {
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(AppError::InvalidTable(format!(
                "date axis not strictly increasing at {} -> {}",
                w[0], w[1]
            )));
        }

        for (symbol, cells) in &columns {
            if cells.len() != dates.len() {
                return Err(AppError::InvalidTable(format!(
                    "column {} has {} cells for {} dates",
                    symbol,
                    cells.len(),
                    dates.len()
                )));
            }
            if let Some((i, price)) = cells
                .iter()
                .enumerate()
                .find_map(|(i, c)| c.filter(|p| !(p.is_finite() && *p > 0.0)).map(|p| (i, p)))
            {
                return Err(AppError::InvalidTable(format!(
                    "column {} has non-positive price {} on {}",
                    symbol, price, dates[i]
                )));
            }
        }

        Ok(PriceTable { dates, columns })
    }

    /// Align per-symbol observations on the union of their dates.
    /// Duplicate dates within one symbol keep the last price given.
    pub fn from_series<I>(series: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (Symbol, Vec<(NaiveDate, f64)>)>,
    {
        let by_symbol: BTreeMap<Symbol, BTreeMap<NaiveDate, f64>> = series
            .into_iter()
            .map(|(symbol, points)| (symbol, points.into_iter().collect()))
            .collect();

        let mut dates: Vec<NaiveDate> = by_symbol
            .values()
            .flat_map(|points| points.keys().copied())
            .collect();
        dates.sort_unstable();
        dates.dedup();

        let columns = by_symbol
            .into_iter()
            .map(|(symbol, points)| {
                let cells = dates.iter().map(|d| points.get(d).copied()).collect();
                (symbol, cells)
            })
            .collect();

        PriceTable::new(dates, columns)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.columns.keys()
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.columns.contains_key(symbol)
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Raw cells for one symbol, aligned with `dates()`.
    pub fn column(&self, symbol: &Symbol) -> Option<&[Option<f64>]> {
        self.columns.get(symbol).map(Vec::as_slice)
    }

    /// Populated `(date, price)` pairs for one symbol, in date order.
    pub fn series(&self, symbol: &Symbol) -> Option<Vec<(NaiveDate, f64)>> {
        let cells = self.columns.get(symbol)?;
        Some(
            self.dates
                .iter()
                .zip(cells)
                .filter_map(|(d, c)| c.map(|p| (*d, p)))
                .collect(),
        )
    }

    pub fn populated_count(&self, symbol: &Symbol) -> usize {
        self.columns
            .get(symbol)
            .map(|cells| cells.iter().filter(|c| c.is_some()).count())
            .unwrap_or(0)
    }

    /// Most recent populated observation for one symbol.
    pub fn latest(&self, symbol: &Symbol) -> Option<(NaiveDate, f64)> {
        let cells = self.columns.get(symbol)?;
        self.dates
            .iter()
            .zip(cells)
            .rev()
            .find_map(|(d, c)| c.map(|p| (*d, p)))
    }
}
