use serde::{Deserialize, Serialize};

use super::symbol::Symbol;

/// One fiscal year of company fundamentals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualFundamentals {
    pub year: i32,
    pub revenue_m: f64,
    pub net_income_m: f64,
    pub gmv_b: f64,
    pub active_users_m: f64,
    pub merchants_k: f64,
    pub headcount: u32,
}

impl AnnualFundamentals {
    /// Revenue per active user, in USD.
    pub fn arpu(&self) -> f64 {
        self.revenue_m / self.active_users_m
    }

    /// Revenue as a percentage of gross merchandise volume.
    pub fn take_rate_pct(&self) -> f64 {
        self.revenue_m / (self.gmv_b * 1000.0) * 100.0
    }

    /// Year-over-year revenue growth, given the prior year's row.
    pub fn revenue_growth_pct(&self, prior: &AnnualFundamentals) -> f64 {
        (self.revenue_m / prior.revenue_m - 1.0) * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyFundamentals {
    pub quarter: String,
    pub revenue_m: f64,
    pub net_income_m: f64,
    pub gmv_b: f64,
    pub users_m: f64,
    pub merchants_k: f64,
}

/// A funding round or market valuation milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationEvent {
    pub event: String,
    pub date: String,
    pub valuation_b: f64,
    /// Share price, only once publicly listed.
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelinquencyRate {
    pub category: String,
    pub rate_pct: f64,
    pub source: String,
}

/// Share of a generation reporting a late BNPL payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatePaymentRate {
    pub demographic: String,
    pub rate_2024_pct: f64,
    pub rate_2025_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSizePoint {
    pub year: i32,
    pub global_b: f64,
    pub us_b: f64,
    pub projected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorMetrics {
    pub company: String,
    pub ticker: String,
    pub users_m: f64,
    pub revenue_growth_pct: f64,
    pub market_cap_b: f64,
    pub price_to_sales: f64,
    pub profitable: bool,
    pub return_since_ipo_pct: f64,
}

/// Share of BNPL users reporting a late payment, by year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatePaymentTrendPoint {
    pub year: i32,
    pub late_pct: f64,
}

/// 1 (poor) to 5 (excellent) rating of every scorecard ticker on one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorecardMetric {
    pub metric: String,
    /// Aligned with `CompetitorScorecard::tickers`.
    pub scores: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorScorecard {
    pub tickers: Vec<Symbol>,
    pub metrics: Vec<ScorecardMetric>,
}

impl CompetitorScorecard {
    pub const MAX_SCORE: u32 = 5;

    /// Sum of a ticker's scores across all metrics.
    pub fn total(&self, ticker: &Symbol) -> Option<u32> {
        let i = self.tickers.iter().position(|t| t == ticker)?;
        self.metrics
            .iter()
            .map(|m| m.scores.get(i).map(|&s| u32::from(s)))
            .sum()
    }

    pub fn max_total(&self) -> u32 {
        self.metrics.len() as u32 * Self::MAX_SCORE
    }
}
