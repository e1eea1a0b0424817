use std::collections::BTreeMap;
use std::sync::Arc;

use super::cache::CacheEntry;
use super::correlation::{correlation_matrix, has_enough_samples};
use super::risk::{rolling_volatility, return_distribution, summarize, MIN_OBSERVATIONS};
use crate::models::analytics::{
    Availability, CorrelationMatrix, PriceSnapshot, ReferenceChange, ReturnDistribution,
    RiskReturnPoint, RiskStats, RiskSummary,
};
use crate::models::config::ReferenceLevel;
use crate::models::price::PriceTable;
use crate::models::series::{DatedValue, NormalizedSeries, ReturnSeries};
use crate::models::symbol::Symbol;

/// Read-only view over one cache entry for a single rendering pass.
///
/// Risk summaries and the correlation matrix are recomputed from the cached
/// returns each time a view is built.
#[derive(Debug, Clone)]
pub struct Analytics {
    entry: Arc<CacheEntry>,
    risk: BTreeMap<Symbol, RiskSummary>,
    correlation: CorrelationMatrix,
}

impl Analytics {
    pub fn from_entry(entry: Arc<CacheEntry>) -> Self {
        let risk = entry
            .returns
            .iter()
            .map(|(symbol, r)| (symbol.clone(), summarize(r)))
            .collect();
        let correlation = correlation_matrix(&entry.returns);
        Analytics {
            entry,
            risk,
            correlation,
        }
    }

    pub fn entry(&self) -> &CacheEntry {
        &self.entry
    }

    pub fn prices(&self) -> &PriceTable {
        &self.entry.prices
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.entry.prices.symbols()
    }

    pub fn correlation_matrix(&self) -> &CorrelationMatrix {
        &self.correlation
    }

    pub fn risk_summaries(&self) -> impl Iterator<Item = &RiskSummary> {
        self.risk.values()
    }

    pub fn normalized(&self, symbol: &Symbol) -> Availability<&NormalizedSeries> {
        if !self.entry.prices.contains(symbol) {
            return Availability::Missing;
        }
        match self.entry.normalized.get(symbol) {
            Some(series) => Availability::Available(series),
            None => Availability::InsufficientHistory {
                required: 1,
                observed: 0,
            },
        }
    }

    /// May be an empty series: a single price has no return, which is not an error.
    pub fn returns(&self, symbol: &Symbol) -> Availability<&ReturnSeries> {
        match self.entry.returns.get(symbol) {
            Some(series) => Availability::Available(series),
            None => Availability::Missing,
        }
    }

    pub fn risk_summary(&self, symbol: &Symbol) -> Availability<&RiskStats> {
        match self.risk.get(symbol) {
            None => Availability::Missing,
            Some(summary) => match &summary.stats {
                Some(stats) => Availability::Available(stats),
                None => Availability::InsufficientHistory {
                    required: MIN_OBSERVATIONS,
                    observed: summary.observations,
                },
            },
        }
    }

    /// Coefficient for `(a, b)` over the dates both have a return.
    pub fn correlation(&self, a: &Symbol, b: &Symbol) -> Availability<f64> {
        let (Some(ra), Some(rb)) = (self.entry.returns.get(a), self.entry.returns.get(b)) else {
            return Availability::Missing;
        };
        let shortest = ra.len().min(rb.len());
        if shortest < MIN_OBSERVATIONS {
            return Availability::InsufficientHistory {
                required: MIN_OBSERVATIONS,
                observed: shortest,
            };
        }
        match self.correlation.get(a, b) {
            Some(cell) => match cell.coefficient {
                Some(r) => Availability::Available(r),
                None if !has_enough_samples(cell) => Availability::InsufficientHistory {
                    required: MIN_OBSERVATIONS,
                    observed: cell.samples,
                },
                None => Availability::Degenerate,
            },
            // Both qualify individually, so they are in the matrix
            None => Availability::Missing,
        }
    }

    pub fn rolling_volatility(&self, symbol: &Symbol, window: usize) -> Availability<Vec<DatedValue>> {
        let Some(series) = self.entry.returns.get(symbol) else {
            return Availability::Missing;
        };
        if series.len() < window.max(MIN_OBSERVATIONS) {
            return Availability::InsufficientHistory {
                required: window.max(MIN_OBSERVATIONS),
                observed: series.len(),
            };
        }
        Availability::Available(rolling_volatility(series, window))
    }

    pub fn distribution(&self, symbol: &Symbol, bins: usize) -> Availability<ReturnDistribution> {
        let Some(series) = self.entry.returns.get(symbol) else {
            return Availability::Missing;
        };
        match return_distribution(series, bins) {
            Some(dist) => Availability::Available(dist),
            None => Availability::InsufficientHistory {
                required: 1,
                observed: 0,
            },
        }
    }

    /// Latest price, daily move, volatility and change against reference levels.
    pub fn snapshot(&self, symbol: &Symbol, references: &[ReferenceLevel]) -> Availability<PriceSnapshot> {
        if !self.entry.prices.contains(symbol) {
            return Availability::Missing;
        }
        let (Some((last_date, last_price)), Some(normalized)) =
            (self.entry.prices.latest(symbol), self.entry.normalized.get(symbol))
        else {
            return Availability::InsufficientHistory {
                required: 1,
                observed: 0,
            };
        };

        let last_return_pct = self
            .entry
            .returns
            .get(symbol)
            .and_then(ReturnSeries::last)
            .map(|p| p.value * 100.0);

        let reference_changes = references
            .iter()
            .filter(|r| &r.symbol == symbol)
            .map(|r| ReferenceChange {
                label: r.label.clone(),
                reference_price: r.price,
                change_pct: (last_price / r.price - 1.0) * 100.0,
            })
            .collect();

        Availability::Available(PriceSnapshot {
            symbol: symbol.clone(),
            last_date,
            last_price,
            last_return_pct,
            period_change_pct: normalized.change_pct().unwrap_or(0.0),
            annualized_volatility: self.risk_summary(symbol).map(|s| s.annualized_volatility),
            reference_changes,
        })
    }

    /// Risk vs return markers for symbols with enough history; others are left out.
    pub fn risk_return_points(&self) -> Vec<RiskReturnPoint> {
        self.risk
            .values()
            .filter_map(|summary| {
                summary.stats.map(|s| RiskReturnPoint {
                    symbol: summary.symbol.clone(),
                    annualized_return: s.annualized_return,
                    annualized_volatility: s.annualized_volatility,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cache::CacheKey;
    use crate::models::symbol::SymbolSet;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, day).unwrap()
    }

    fn analytics(series: Vec<(&str, Vec<(NaiveDate, f64)>)>) -> Analytics {
        let symbols = SymbolSet::new(series.iter().map(|(s, _)| *s));
        let table = PriceTable::from_series(
            series.into_iter().map(|(s, points)| (Symbol::new(s), points)),
        )
        .unwrap();
        Analytics::from_entry(Arc::new(CacheEntry::derive(CacheKey::new(symbols, d(1)), table)))
    }

    fn scenario() -> Analytics {
        analytics(vec![
            ("A", vec![(d(1), 100.0), (d(2), 110.0), (d(3), 121.0)]),
            ("B", vec![(d(1), 50.0), (d(2), 55.0)]),
        ])
    }

    #[test]
    fn test_scenario_correlation_is_insufficient_history() {
        let a = scenario();
        assert_eq!(
            a.correlation(&Symbol::new("A"), &Symbol::new("B")),
            Availability::InsufficientHistory {
                required: 2,
                observed: 1
            }
        );
        assert!(a.correlation_matrix().is_empty());
    }

    #[test]
    fn test_scenario_risk_and_normalized() {
        let a = scenario();
        let stats = a.risk_summary(&Symbol::new("A")).available().unwrap();
        assert!(stats.mean_return.abs() > 0.0);
        assert!(stats.std_dev_return.abs() < 1e-12);
        assert_eq!(
            a.risk_summary(&Symbol::new("B")),
            Availability::InsufficientHistory {
                required: 2,
                observed: 1
            }
        );

        let norm = a.normalized(&Symbol::new("A")).available().unwrap();
        assert!((norm.value_at(d(3)).unwrap() - 121.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_price_symbol() {
        let a = analytics(vec![
            ("A", vec![(d(1), 10.0), (d(2), 11.0), (d(3), 10.5)]),
            ("NEW", vec![(d(3), 20.0)]),
        ]);
        let new = Symbol::new("NEW");
        let returns = a.returns(&new).available().unwrap();
        assert!(returns.is_empty());
        assert_eq!(
            a.risk_summary(&new),
            Availability::InsufficientHistory {
                required: 2,
                observed: 0
            }
        );
        let norm = a.normalized(&new).available().unwrap();
        assert_eq!(norm.points.len(), 1);
        assert_eq!(norm.points[0].value, 100.0);
        assert_eq!(
            a.correlation(&Symbol::new("A"), &new),
            Availability::InsufficientHistory {
                required: 2,
                observed: 0
            }
        );
    }

    #[test]
    fn test_unknown_symbol_is_missing() {
        let a = scenario();
        let z = Symbol::new("ZZZ");
        assert_eq!(a.normalized(&z), Availability::Missing);
        assert_eq!(a.returns(&z), Availability::Missing);
        assert_eq!(a.risk_summary(&z), Availability::Missing);
        assert_eq!(a.correlation(&Symbol::new("A"), &z), Availability::Missing);
        assert_eq!(a.snapshot(&z, &[]), Availability::Missing);
    }

    #[test]
    fn test_correlation_available_and_degenerate() {
        let a = analytics(vec![
            ("A", vec![(d(1), 10.0), (d(2), 11.0), (d(3), 10.5), (d(4), 11.5)]),
            ("B", vec![(d(1), 20.0), (d(2), 22.5), (d(3), 21.0), (d(4), 23.0)]),
            ("FLAT", vec![(d(1), 5.0), (d(2), 5.5), (d(3), 6.05), (d(4), 6.655)]),
        ]);
        let (sa, sb, flat) = (Symbol::new("A"), Symbol::new("B"), Symbol::new("FLAT"));
        let r = a.correlation(&sa, &sb).available().unwrap();
        assert!(r > 0.9 && r <= 1.0);
        assert_eq!(a.correlation(&sa, &sb), a.correlation(&sb, &sa));
        assert_eq!(a.correlation(&sa, &sa), Availability::Available(1.0));

        // FLAT grows 10% per day: its returns differ only by rounding
        assert_eq!(a.correlation(&sa, &flat), Availability::Degenerate);
        assert_eq!(a.correlation(&flat, &sa), Availability::Degenerate);
    }

    #[test]
    fn test_snapshot_reference_changes() {
        let a = analytics(vec![("KLAR", vec![(d(10), 45.82), (d(11), 44.0), (d(12), 20.0)])]);
        let refs = vec![
            ReferenceLevel {
                symbol: Symbol::new("KLAR"),
                label: "IPO".into(),
                price: 40.0,
            },
            ReferenceLevel {
                symbol: Symbol::new("AFRM"),
                label: "ignored".into(),
                price: 1.0,
            },
        ];
        let snap = a.snapshot(&Symbol::new("KLAR"), &refs).available().unwrap();
        assert_eq!(snap.last_date, d(12));
        assert_eq!(snap.last_price, 20.0);
        assert!((snap.last_return_pct.unwrap() - (20.0 / 44.0 - 1.0) * 100.0).abs() < 1e-9);
        assert!((snap.period_change_pct - (20.0 / 45.82 * 100.0 - 100.0)).abs() < 1e-9);
        assert_eq!(snap.reference_changes.len(), 1);
        assert!((snap.reference_changes[0].change_pct + 50.0).abs() < 1e-9);
        assert!(snap.annualized_volatility.is_available());
    }

    #[test]
    fn test_risk_return_points_skip_short_history() {
        let a = scenario();
        let points = a.risk_return_points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].symbol, Symbol::new("A"));
    }

    #[test]
    fn test_rolling_and_distribution_lookups() {
        let a = scenario();
        assert_eq!(
            a.rolling_volatility(&Symbol::new("A"), 21),
            Availability::InsufficientHistory {
                required: 21,
                observed: 2
            }
        );
        assert_eq!(a.rolling_volatility(&Symbol::new("A"), 2).available().unwrap().len(), 1);
        let dist = a.distribution(&Symbol::new("B"), 40).available().unwrap();
        assert_eq!(dist.bins.iter().map(|b| b.count).sum::<usize>(), 1);
    }
}
