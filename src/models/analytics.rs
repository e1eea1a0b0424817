use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::symbol::Symbol;

/// Outcome of a presentation lookup. Expected absence is a value, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Availability<T> {
    Available(T),
    /// The symbol exists but has too few observations for this statistic.
    InsufficientHistory { required: usize, observed: usize },
    /// Enough observations, but the sample has zero variance.
    Degenerate,
    /// The symbol is not part of the loaded data.
    Missing,
    /// Live market data could not be loaded.
    Unavailable { message: String },
}

impl<T> Availability<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available(_))
    }

    pub fn available(self) -> Option<T> {
        match self {
            Availability::Available(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Availability<U> {
        match self {
            Availability::Available(v) => Availability::Available(f(v)),
            Availability::InsufficientHistory { required, observed } => {
                Availability::InsufficientHistory { required, observed }
            }
            Availability::Degenerate => Availability::Degenerate,
            Availability::Missing => Availability::Missing,
            Availability::Unavailable { message } => Availability::Unavailable { message },
        }
    }
}

/// Per-symbol descriptive statistics over daily returns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskStats {
    pub mean_return: f64,
    pub std_dev_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
}

/// `stats` is `None` when the return series is too short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub symbol: Symbol,
    pub observations: usize,
    pub stats: Option<RiskStats>,
}

/// One cell of the correlation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairCorrelation {
    /// Pearson coefficient, or `None` for too few aligned samples or zero variance.
    pub coefficient: Option<f64>,
    /// Dates where both symbols have a return.
    pub samples: usize,
}

/// Square, symmetric matrix over the symbols with enough history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub symbols: Vec<Symbol>,
    pub cells: Vec<Vec<PairCorrelation>>,
}

impl CorrelationMatrix {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, a: &Symbol, b: &Symbol) -> Option<&PairCorrelation> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        self.cells.get(i).and_then(|row| row.get(j))
    }

    fn index_of(&self, symbol: &Symbol) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

/// Change of the latest price against a named reference level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceChange {
    pub label: String,
    pub reference_price: f64,
    pub change_pct: f64,
}

/// Headline figures for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub symbol: Symbol,
    pub last_date: NaiveDate,
    pub last_price: f64,
    /// Latest daily return in percent.
    pub last_return_pct: Option<f64>,
    /// Percent change since the symbol's first populated date.
    pub period_change_pct: f64,
    pub annualized_volatility: Availability<f64>,
    pub reference_changes: Vec<ReferenceChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Histogram of daily returns plus their mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnDistribution {
    pub symbol: Symbol,
    pub mean: f64,
    pub bins: Vec<HistogramBin>,
}

/// One marker of the risk vs return scatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReturnPoint {
    pub symbol: Symbol,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
}
