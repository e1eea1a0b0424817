use std::collections::BTreeMap;

use crate::models::price::PriceTable;
use crate::models::series::{DatedValue, NormalizedSeries};
use crate::models::symbol::Symbol;

/// Index level every series starts from.
pub const BASE_LEVEL: f64 = 100.0;

/// Rescale each symbol so its first populated price maps to 100.
///
/// Symbols with no populated price are left out of the result.
pub fn normalize_table(table: &PriceTable) -> BTreeMap<Symbol, NormalizedSeries> {
    table
        .symbols()
        .filter_map(|symbol| {
            let series = table.series(symbol)?;
            normalize_series(symbol, &series).map(|n| (symbol.clone(), n))
        })
        .collect()
}

/// Index one populated `(date, price)` series to its first observation.
pub fn normalize_series(
    symbol: &Symbol,
    series: &[(chrono::NaiveDate, f64)],
) -> Option<NormalizedSeries> {
    let &(base_date, base_price) = series.first()?;
    let points = series
        .iter()
        .map(|&(date, price)| {
            // price / price is exactly 1.0, so the base point is exactly 100
            DatedValue::new(date, price / base_price * BASE_LEVEL)
        })
        .collect();

    Some(NormalizedSeries {
        symbol: symbol.clone(),
        base_date,
        points,
    })
}
