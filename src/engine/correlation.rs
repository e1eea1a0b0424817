use std::collections::BTreeMap;

use rayon::prelude::*;
use statrs::statistics::Statistics;

use super::risk::MIN_OBSERVATIONS;
use crate::models::analytics::{CorrelationMatrix, PairCorrelation};
use crate::models::series::ReturnSeries;
use crate::models::symbol::Symbol;

/// Pairwise-complete-case Pearson correlation of daily returns.
///
/// Only symbols with at least `MIN_OBSERVATIONS` returns take part; with
/// fewer than two such symbols the matrix is empty. Each pair is aligned on
/// its own shared dates, so different pairs may use different samples.
pub fn correlation_matrix(returns: &BTreeMap<Symbol, ReturnSeries>) -> CorrelationMatrix {
    let qualifying: Vec<&ReturnSeries> = returns
        .values()
        .filter(|r| r.len() >= MIN_OBSERVATIONS)
        .collect();

    if qualifying.len() < 2 {
        return CorrelationMatrix::default();
    }

    let n = qualifying.len();
    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .collect();

    // Upper triangle in parallel; each cell is independent of the others
    let upper: Vec<((usize, usize), PairCorrelation)> = pairs
        .par_iter()
        .map(|&(i, j)| ((i, j), pair_correlation(qualifying[i], qualifying[j])))
        .collect();

    let diagonal = |i: usize| PairCorrelation {
        coefficient: Some(1.0),
        samples: qualifying[i].len(),
    };
    let mut cells: Vec<Vec<PairCorrelation>> =
        (0..n).map(|i| vec![diagonal(i); n]).collect();
    for ((i, j), cell) in upper {
        cells[i][j] = cell;
        cells[j][i] = cell;
    }

    CorrelationMatrix {
        symbols: qualifying.iter().map(|r| r.symbol.clone()).collect(),
        cells,
    }
}

/// Correlation of two return series over the dates both have a value.
pub fn pair_correlation(a: &ReturnSeries, b: &ReturnSeries) -> PairCorrelation {
    let (xs, ys) = aligned_values(a, b);
    let samples = xs.len();
    PairCorrelation {
        coefficient: pearson(&xs, &ys),
        samples,
    }
}

/// Values of `a` and `b` on their common dates. Both series are date-sorted.
fn aligned_values(a: &ReturnSeries, b: &ReturnSeries) -> (Vec<f64>, Vec<f64>) {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.points.len() && j < b.points.len() {
        let (pa, pb) = (&a.points[i], &b.points[j]);
        match pa.date.cmp(&pb.date) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                xs.push(pa.value);
                ys.push(pb.value);
                i += 1;
                j += 1;
            }
        }
    }
    (xs, ys)
}

/// Relative dispersion below which a sample counts as constant.
pub const DEGENERATE_TOLERANCE: f64 = 1e-12;

/// Sample Pearson coefficient, clamped to [-1, 1]. `None` for fewer than
/// `MIN_OBSERVATIONS` samples or a zero-variance side.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < MIN_OBSERVATIONS {
        return None;
    }
    let sx = xs.iter().std_dev();
    let sy = ys.iter().std_dev();
    if is_constant(xs, sx) || is_constant(ys, sy) {
        return None;
    }
    let cov = xs.iter().covariance(ys.iter());
    let r = cov / (sx * sy);
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// A constant-rate series has returns that differ only by rounding noise,
/// so the standard deviation is compared against the values' own scale.
fn is_constant(values: &[f64], std_dev: f64) -> bool {
    let mean_abs = values.iter().map(|v| v.abs()).sum::<f64>() / values.len() as f64;
    !(std_dev > DEGENERATE_TOLERANCE * mean_abs.max(1.0))
}

/// Whether the pair shares enough dates for a coefficient.
pub fn has_enough_samples(cell: &PairCorrelation) -> bool {
    cell.samples >= MIN_OBSERVATIONS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::returns::compute_returns;
    use crate::models::price::PriceTable;
    use crate::models::series::DatedValue;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, day).unwrap()
    }

    fn series(name: &str, points: &[(u32, f64)]) -> ReturnSeries {
        ReturnSeries {
            symbol: Symbol::new(name),
            points: points.iter().map(|&(day, v)| DatedValue::new(d(day), v)).collect(),
        }
    }

    fn map(series: Vec<ReturnSeries>) -> BTreeMap<Symbol, ReturnSeries> {
        series.into_iter().map(|s| (s.symbol.clone(), s)).collect()
    }

    #[test]
    fn test_perfectly_correlated_and_anticorrelated() {
        let returns = map(vec![
            series("A", &[(2, 0.01), (3, 0.02), (4, -0.01)]),
            series("B", &[(2, 0.02), (3, 0.04), (4, -0.02)]),
            series("C", &[(2, -0.01), (3, -0.02), (4, 0.01)]),
        ]);
        let m = correlation_matrix(&returns);
        let (a, b, c) = (Symbol::new("A"), Symbol::new("B"), Symbol::new("C"));
        assert!((m.get(&a, &b).unwrap().coefficient.unwrap() - 1.0).abs() < 1e-12);
        assert!((m.get(&a, &c).unwrap().coefficient.unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(m.get(&a, &b).unwrap().samples, 3);
    }

    #[test]
    fn test_scenario_single_shared_date_excludes_short_symbol() {
        // A: 100, 110, 121; B: 50, 55 -> B has one return
        let table = PriceTable::from_series([
            (Symbol::new("A"), vec![(d(1), 100.0), (d(2), 110.0), (d(3), 121.0)]),
            (Symbol::new("B"), vec![(d(1), 50.0), (d(2), 55.0)]),
        ])
        .unwrap();
        let m = correlation_matrix(&compute_returns(&table));
        assert!(m.is_empty());
    }

    #[test]
    fn test_pairwise_alignment_uses_each_pairs_own_dates() {
        let returns = map(vec![
            series("A", &[(2, 0.01), (3, 0.03), (4, -0.02), (5, 0.01)]),
            series("B", &[(2, 0.02), (3, 0.01), (4, -0.01), (5, 0.00)]),
            series("C", &[(4, 0.03), (5, -0.01)]),
        ]);
        let m = correlation_matrix(&returns);
        let (a, b, c) = (Symbol::new("A"), Symbol::new("B"), Symbol::new("C"));
        assert_eq!(m.get(&a, &b).unwrap().samples, 4);
        assert_eq!(m.get(&a, &c).unwrap().samples, 2);

        let (xs, ys) = (vec![0.01, 0.03, -0.02, 0.01], vec![0.02, 0.01, -0.01, 0.00]);
        let full = pearson(&xs, &ys).unwrap();
        assert_eq!(m.get(&a, &b).unwrap().coefficient, Some(full));
    }

    #[test]
    fn test_pair_with_one_shared_date_has_no_coefficient() {
        let returns = map(vec![
            series("A", &[(2, 0.01), (3, 0.02)]),
            series("B", &[(3, 0.05), (4, 0.01)]),
        ]);
        let m = correlation_matrix(&returns);
        let cell = m.get(&Symbol::new("A"), &Symbol::new("B")).unwrap();
        assert_eq!(cell.samples, 1);
        assert!(cell.coefficient.is_none());
        assert!(!has_enough_samples(cell));
    }

    #[test]
    fn test_zero_variance_has_no_coefficient() {
        let returns = map(vec![
            series("A", &[(2, 0.0), (3, 0.0), (4, 0.0)]),
            series("B", &[(2, 0.02), (3, 0.03), (4, -0.01)]),
        ]);
        let m = correlation_matrix(&returns);
        let cell = m.get(&Symbol::new("A"), &Symbol::new("B")).unwrap();
        assert_eq!(cell.samples, 3);
        assert!(cell.coefficient.is_none());
        assert_eq!(m.get(&Symbol::new("A"), &Symbol::new("A")).unwrap().coefficient, Some(1.0));
    }

    #[test]
    fn test_rounding_noise_counts_as_zero_variance() {
        // 10% growth per day: 5.0, 5.5, 6.05, 6.655
        let returns = map(vec![
            series("A", &[(2, 0.1), (3, -0.045454545454545), (4, 0.095238095238095)]),
            series(
                "FLAT",
                &[(2, 0.10000000000000009), (3, 0.09999999999999987), (4, 0.10000000000000009)],
            ),
        ]);
        let m = correlation_matrix(&returns);
        let cell = m.get(&Symbol::new("A"), &Symbol::new("FLAT")).unwrap();
        assert_eq!(cell.samples, 3);
        assert!(cell.coefficient.is_none());
        assert!(has_enough_samples(cell));

        // Small but real dispersion is kept
        assert!(pearson(&[0.001, 0.002, 0.0015], &[0.002, 0.004, 0.003]).is_some());
    }

    #[test]
    fn test_symmetry_diagonal_and_bounds_on_random_walks() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let returns = map(
                ["A", "B", "C", "D"]
                    .iter()
                    .map(|name| {
                        let mut points: Vec<(u32, f64)> = Vec::new();
                        for day in 2..=28 {
                            if rng.gen_bool(0.8) {
                                points.push((day, rng.gen_range(-0.05..0.05)));
                            }
                        }
                        series(name, &points)
                    })
                    .collect(),
            );
            let m = correlation_matrix(&returns);
            for (i, a) in m.symbols.iter().enumerate() {
                assert_eq!(m.cells[i][i].coefficient, Some(1.0));
                for b in &m.symbols {
                    let ab = m.get(a, b).unwrap();
                    let ba = m.get(b, a).unwrap();
                    assert_eq!(ab, ba);
                    if let Some(r) = ab.coefficient {
                        assert!((-1.0..=1.0).contains(&r));
                    }
                }
            }
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let returns = map(vec![
            series("A", &[(2, 0.01), (3, 0.03), (4, -0.02), (5, 0.01)]),
            series("B", &[(2, 0.02), (3, 0.01), (4, -0.01), (5, 0.00)]),
            series("C", &[(3, 0.03), (4, 0.02), (5, -0.01)]),
        ]);
        let m = correlation_matrix(&returns);
        let a = &returns[&Symbol::new("A")];
        let c = &returns[&Symbol::new("C")];
        assert_eq!(*m.get(&a.symbol, &c.symbol).unwrap(), pair_correlation(a, c));
    }
}
