use statrs::statistics::Statistics;

use crate::models::analytics::{HistogramBin, ReturnDistribution, RiskStats, RiskSummary};
use crate::models::series::{DatedValue, ReturnSeries};

/// Trading days per year used for annualization.
pub const TRADING_PERIODS_PER_YEAR: f64 = 252.0;

/// Fewest returns a dispersion statistic is reported for.
pub const MIN_OBSERVATIONS: usize = 2;

/// Mean, sample standard deviation and their annualized forms.
pub fn summarize(returns: &ReturnSeries) -> RiskSummary {
    let values = returns.values();
    RiskSummary {
        symbol: returns.symbol.clone(),
        observations: values.len(),
        stats: risk_stats(&values),
    }
}

/// `None` below `MIN_OBSERVATIONS`.
pub fn risk_stats(values: &[f64]) -> Option<RiskStats> {
    if values.len() < MIN_OBSERVATIONS {
        return None;
    }
    let mean_return = values.iter().mean();
    let std_dev_return = values.iter().std_dev();

    Some(RiskStats {
        mean_return,
        std_dev_return,
        annualized_return: mean_return * TRADING_PERIODS_PER_YEAR,
        annualized_volatility: annualize_volatility(std_dev_return),
    })
}

pub fn annualize_volatility(std_dev: f64) -> f64 {
    std_dev * TRADING_PERIODS_PER_YEAR.sqrt()
}

/// Annualized volatility over each trailing window of `window` returns,
/// dated at the window's last return.
pub fn rolling_volatility(returns: &ReturnSeries, window: usize) -> Vec<DatedValue> {
    if window < MIN_OBSERVATIONS {
        return Vec::new();
    }
    returns
        .points
        .windows(window)
        .filter_map(|w| {
            let last = w.last()?;
            let std_dev = w.iter().map(|p| p.value).std_dev();
            Some(DatedValue::new(last.date, annualize_volatility(std_dev)))
        })
        .collect()
}

/// Equal-width histogram of returns. `None` for an empty series.
pub fn return_distribution(returns: &ReturnSeries, bins: usize) -> Option<ReturnDistribution> {
    if returns.is_empty() || bins == 0 {
        return None;
    }
    let values = returns.values();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().mean();

    // A constant series still gets one populated bin
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };
    let mut counts = vec![0usize; bins];
    for v in &values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count,
        })
        .collect();

    Some(ReturnDistribution {
        symbol: returns.symbol.clone(),
        mean,
        bins,
    })
}
