use chrono::NaiveDate;

use super::PriceStore;
use crate::errors::FetchFailure;
use crate::models::price::PriceTable;
use crate::models::symbol::SymbolSet;

/// Serves a fixed in-memory table, restricted to the requested symbols and dates.
#[derive(Debug, Clone)]
pub struct MemoryPriceStore {
    table: PriceTable,
}

impl MemoryPriceStore {
    pub fn new(table: PriceTable) -> Self {
        MemoryPriceStore { table }
    }
}

impl PriceStore for MemoryPriceStore {
    async fn fetch(
        &self,
        symbols: &SymbolSet,
        start_date: NaiveDate,
    ) -> Result<PriceTable, FetchFailure> {
        let series = self
            .table
            .symbols()
            .filter(|s| symbols.contains(s))
            .filter_map(|s| {
                let points: Vec<(NaiveDate, f64)> = self
                    .table
                    .series(s)?
                    .into_iter()
                    .filter(|(d, _)| *d >= start_date)
                    .collect();
                (!points.is_empty()).then(|| (s.clone(), points))
            })
            .collect::<Vec<_>>();

        if series.is_empty() {
            return Err(FetchFailure::empty(format!(
                "no prices for {} since {}",
                symbols, start_date
            )));
        }
        PriceTable::from_series(series).map_err(|e| FetchFailure::malformed(e.to_string()))
    }
}
