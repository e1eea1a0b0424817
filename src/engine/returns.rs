use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::price::PriceTable;
use crate::models::series::{DatedValue, ReturnSeries};
use crate::models::symbol::Symbol;

/// Simple returns for every symbol in the table.
///
/// A symbol with fewer than two populated prices gets an empty series.
pub fn compute_returns(table: &PriceTable) -> BTreeMap<Symbol, ReturnSeries> {
    table
        .symbols()
        .map(|symbol| {
            let series = table.series(symbol).unwrap_or_default();
            (symbol.clone(), simple_returns(symbol, &series))
        })
        .collect()
}

/// `price[t] / price[t-1] - 1` between consecutive populated observations.
///
/// Missing dates are skipped, never filled, so the result always has one
/// entry fewer than the populated input.
pub fn simple_returns(symbol: &Symbol, series: &[(NaiveDate, f64)]) -> ReturnSeries {
    let points = series
        .windows(2)
        .map(|w| {
            let (_, prev) = w[0];
            let (date, price) = w[1];
            DatedValue::new(date, price / prev - 1.0)
        })
        .collect();

    ReturnSeries {
        symbol: symbol.clone(),
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, day).unwrap()
    }

    #[test]
    fn test_scenario_returns() {
        let table = PriceTable::from_series([
            (Symbol::new("A"), vec![(d(1), 100.0), (d(2), 110.0), (d(3), 121.0)]),
            (Symbol::new("B"), vec![(d(1), 50.0), (d(2), 55.0)]),
        ])
        .unwrap();
        let returns = compute_returns(&table);

        let a = &returns[&Symbol::new("A")];
        assert_eq!(a.len(), 2);
        assert_eq!(a.points[0].date, d(2));
        assert_eq!(a.points[1].date, d(3));
        assert!((a.points[0].value - 0.10).abs() < 1e-12);
        assert!((a.points[1].value - 0.10).abs() < 1e-12);

        let b = &returns[&Symbol::new("B")];
        assert_eq!(b.len(), 1);
        assert_eq!(b.points[0].date, d(2));
        assert!((b.points[0].value - 0.10).abs() < 1e-12);
        assert_eq!(b.value_at(d(1)), None);
    }

    #[test]
    fn test_single_price_gives_empty_series() {
        let table = PriceTable::from_series([(Symbol::new("A"), vec![(d(5), 42.0)])]).unwrap();
        let returns = compute_returns(&table);
        assert!(returns[&Symbol::new("A")].is_empty());
    }

    #[test]
    fn test_gap_is_skipped_not_zero_filled() {
        let mut columns = BTreeMap::new();
        columns.insert(
            Symbol::new("A"),
            vec![Some(100.0), None, Some(120.0), Some(108.0)],
        );
        let table = PriceTable::new(vec![d(1), d(2), d(3), d(4)], columns).unwrap();
        let a = &compute_returns(&table)[&Symbol::new("A")];

        assert_eq!(a.len(), 2);
        assert_eq!(a.value_at(d(2)), None);
        assert!((a.value_at(d(3)).unwrap() - 0.20).abs() < 1e-12);
        assert!((a.value_at(d(4)).unwrap() + 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_length_invariant_on_random_tables() {
        let mut rng = StdRng::seed_from_u64(7);
        let dates: Vec<NaiveDate> = (1..=28).map(d).collect();
        for _ in 0..50 {
            let mut columns = BTreeMap::new();
            for name in ["A", "B", "C"] {
                let mut price = 50.0;
                let cells: Vec<Option<f64>> = dates
                    .iter()
                    .map(|_| {
                        price *= 1.0 + rng.gen_range(-0.05..0.05);
                        rng.gen_bool(0.7).then_some(price)
                    })
                    .collect();
                columns.insert(Symbol::new(name), cells);
            }
            let table = PriceTable::new(dates.clone(), columns).unwrap();
            let returns = compute_returns(&table);

            for symbol in table.symbols() {
                let populated = table.populated_count(symbol);
                let series = table.series(symbol).unwrap();
                let r = &returns[symbol];
                assert_eq!(r.len(), populated.saturating_sub(1));
                for (w, point) in series.windows(2).zip(&r.points) {
                    assert_eq!(point.date, w[1].0);
                    assert!((point.value - (w[1].1 / w[0].1 - 1.0)).abs() < 1e-12);
                }
            }
        }
    }
}
