use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use super::PriceStore;
use crate::errors::FetchFailure;
use crate::models::price::PriceTable;
use crate::models::symbol::{Symbol, SymbolSet};

/// Offline price store backed by a wide CSV: `date,SYM1,SYM2,...`.
/// Blank cells are missing observations.
#[derive(Debug, Clone)]
pub struct CsvPriceStore {
    path: PathBuf,
}

impl CsvPriceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvPriceStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PriceStore for CsvPriceStore {
    async fn fetch(
        &self,
        symbols: &SymbolSet,
        start_date: NaiveDate,
    ) -> Result<PriceTable, FetchFailure> {
        let path = self.path.clone();
        let symbols = symbols.clone();
        tokio::task::spawn_blocking(move || read_wide_csv(&path, &symbols, start_date))
            .await
            .map_err(|e| FetchFailure::network(format!("CSV reader task failed: {}", e)))?
    }
}

/// Parse the wide CSV into a table holding only `symbols`, from `start_date` on.
pub fn read_wide_csv(
    path: &Path,
    symbols: &SymbolSet,
    start_date: NaiveDate,
) -> Result<PriceTable, FetchFailure> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| FetchFailure::network(format!("Cannot open {}: {}", path.display(), e)))?;

    let headers = rdr
        .headers()
        .map_err(|e| FetchFailure::malformed(format!("Bad CSV header: {}", e)))?
        .clone();
    if headers.is_empty() {
        return Err(FetchFailure::empty(format!("{} has no header", path.display())));
    }

    // Column index for every requested symbol present in the header
    let wanted: Vec<(usize, Symbol)> = headers
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, name)| (i, Symbol::new(name)))
        .filter(|(_, s)| symbols.contains(s))
        .collect();
    for s in symbols.iter().filter(|s| !wanted.iter().any(|(_, w)| w == *s)) {
        warn!("Symbol {} not present in {}", s, path.display());
    }

    let mut series: BTreeMap<Symbol, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for (row, record) in rdr.records().enumerate() {
        let record =
            record.map_err(|e| FetchFailure::malformed(format!("Row {}: {}", row + 2, e)))?;
        let raw_date = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|e| {
            FetchFailure::malformed(format!("Row {}: bad date '{}': {}", row + 2, raw_date, e))
        })?;
        if date < start_date {
            continue;
        }

        for (i, symbol) in &wanted {
            let cell = record.get(*i).unwrap_or_default();
            if cell.is_empty() {
                continue;
            }
            let price: f64 = cell.parse().map_err(|e| {
                FetchFailure::malformed(format!(
                    "Row {}: bad price '{}' for {}: {}",
                    row + 2,
                    cell,
                    symbol,
                    e
                ))
            })?;
            if price.is_finite() && price > 0.0 {
                series.entry(symbol.clone()).or_default().push((date, price));
            } else {
                warn!("Skipping non-positive price {} for {} on {}", price, symbol, date);
            }
        }
    }

    if series.is_empty() {
        return Err(FetchFailure::empty(format!(
            "{} has no prices for {} since {}",
            path.display(),
            symbols,
            start_date
        )));
    }

    let table = PriceTable::from_series(series).map_err(|e| FetchFailure::malformed(e.to_string()))?;
    info!(
        "Loaded {} dates from {}",
        table.dates().len(),
        path.display()
    );
    Ok(table)
}
