use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::data::static_data::StaticDataset;
use crate::data::PriceStore;
use crate::engine::analytics::Analytics;
use crate::engine::cache::{CacheEntry, CacheKey, ResultCache};
use crate::errors::{AppError, FetchFailure};
use crate::models::analytics::{
    Availability, CorrelationMatrix, PriceSnapshot, ReturnDistribution, RiskReturnPoint, RiskStats,
    RiskSummary,
};
use crate::models::config::DashboardConfig;
use crate::models::series::{DatedValue, NormalizedSeries, ReturnSeries};
use crate::models::symbol::Symbol;

/// Host-facing entry point: one price store, one result cache, the bundled tables.
pub struct Dashboard<S: PriceStore> {
    config: DashboardConfig,
    store: S,
    cache: Arc<ResultCache>,
    static_data: StaticDataset,
}

impl<S: PriceStore> Dashboard<S> {
    pub fn new(config: DashboardConfig, store: S) -> Self {
        let cache = Arc::new(ResultCache::new(config.cache_ttl(), config.fetch_timeout()));
        Self::with_cache(config, store, cache)
    }

    /// Use a cache shared with other dashboards or owned by the host.
    pub fn with_cache(config: DashboardConfig, store: S, cache: Arc<ResultCache>) -> Self {
        Dashboard {
            config,
            store,
            cache,
            static_data: StaticDataset::bundled(),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn static_data(&self) -> &StaticDataset {
        &self.static_data
    }

    fn key(&self) -> CacheKey {
        CacheKey::new(self.config.symbol_set(), self.config.start_date)
    }

    /// Live analytics for one rendering pass. Exactly one cache lookup.
    pub async fn live_data(&self) -> LiveData {
        let key = self.key();
        let result = self
            .cache
            .get_or_fetch(&key, || self.store.fetch(&key.symbols, key.start_date))
            .await;
        LiveData::from_result(result)
    }

    /// Drop everything cached, then load again.
    pub async fn force_refresh(&self) -> LiveData {
        info!("Forced refresh requested");
        self.cache.invalidate();
        self.live_data().await
    }

    /// Take a live-data snapshot and assemble the full report.
    pub async fn report(&self) -> DashboardReport {
        let live = self.live_data().await;
        DashboardReport::build(&self.config, &live, &self.static_data)
    }
}

/// Result of a live-data lookup.
#[derive(Debug, Clone)]
pub enum LiveData {
    Ready(Analytics),
    Unavailable { reason: FetchFailure },
}

impl LiveData {
    fn from_result(result: Result<Arc<CacheEntry>, AppError>) -> Self {
        match result {
            Ok(entry) => LiveData::Ready(Analytics::from_entry(entry)),
            Err(err) => {
                let reason = err
                    .fetch_failure()
                    .cloned()
                    .unwrap_or_else(|| FetchFailure::malformed(err.to_string()));
                warn!("Live data unavailable: {}", reason);
                LiveData::Unavailable { reason }
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LiveData::Ready(_))
    }

    pub fn analytics(&self) -> Option<&Analytics> {
        match self {
            LiveData::Ready(a) => Some(a),
            LiveData::Unavailable { .. } => None,
        }
    }

    /// User-facing notice while live data is down.
    pub fn unavailable_message(&self) -> Option<String> {
        match self {
            LiveData::Ready(_) => None,
            LiveData::Unavailable { reason } => Some(format!(
                "Live market data is currently unavailable ({}). Try refresh.",
                reason
            )),
        }
    }

    fn with<'a, T>(&'a self, f: impl FnOnce(&'a Analytics) -> Availability<T>) -> Availability<T> {
        match self {
            LiveData::Ready(a) => f(a),
            LiveData::Unavailable { .. } => Availability::Unavailable {
                message: self.unavailable_message().unwrap_or_default(),
            },
        }
    }

    pub fn normalized(&self, symbol: &Symbol) -> Availability<&NormalizedSeries> {
        self.with(|a| a.normalized(symbol))
    }

    pub fn returns(&self, symbol: &Symbol) -> Availability<&ReturnSeries> {
        self.with(|a| a.returns(symbol))
    }

    pub fn risk_summary(&self, symbol: &Symbol) -> Availability<&RiskStats> {
        self.with(|a| a.risk_summary(symbol))
    }

    pub fn correlation(&self, a: &Symbol, b: &Symbol) -> Availability<f64> {
        self.with(|x| x.correlation(a, b))
    }

    pub fn correlation_matrix(&self) -> Availability<&CorrelationMatrix> {
        self.with(|a| Availability::Available(a.correlation_matrix()))
    }

    pub fn rolling_volatility(&self, symbol: &Symbol, window: usize) -> Availability<Vec<DatedValue>> {
        self.with(|a| a.rolling_volatility(symbol, window))
    }

    pub fn distribution(&self, symbol: &Symbol, bins: usize) -> Availability<ReturnDistribution> {
        self.with(|a| a.distribution(symbol, bins))
    }

    pub fn snapshot(&self, symbol: &Symbol, config: &DashboardConfig) -> Availability<PriceSnapshot> {
        self.with(|a| a.snapshot(symbol, &config.references))
    }

    /// Empty while live data is down.
    pub fn risk_return_points(&self) -> Vec<RiskReturnPoint> {
        self.analytics()
            .map(Analytics::risk_return_points)
            .unwrap_or_default()
    }
}

/// Everything the dashboard shows, in one serializable document.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub generated_at: DateTime<Utc>,
    pub start_date: NaiveDate,
    pub symbols: Vec<Symbol>,
    pub live: Availability<LiveReport>,
    pub static_data: StaticDataset,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveReport {
    pub fetched_at: DateTime<Utc>,
    pub trading_days: usize,
    pub snapshots: BTreeMap<Symbol, Availability<PriceSnapshot>>,
    pub normalized: Vec<NormalizedSeries>,
    pub risk: Vec<RiskSummary>,
    pub correlation: CorrelationMatrix,
    pub risk_return: Vec<RiskReturnPoint>,
    pub rolling_volatility: BTreeMap<Symbol, Availability<Vec<DatedValue>>>,
    pub distributions: BTreeMap<Symbol, Availability<ReturnDistribution>>,
}

impl DashboardReport {
    pub fn build(config: &DashboardConfig, live: &LiveData, static_data: &StaticDataset) -> Self {
        let symbols: Vec<Symbol> = config.symbol_set().iter().cloned().collect();

        let live_report = match live {
            LiveData::Ready(a) => Availability::Available(LiveReport {
                fetched_at: a.entry().fetched_at,
                trading_days: a.prices().dates().len(),
                snapshots: per_symbol(&symbols, |s| a.snapshot(s, &config.references)),
                normalized: a.entry().normalized.values().cloned().collect(),
                risk: a.risk_summaries().cloned().collect(),
                correlation: a.correlation_matrix().clone(),
                risk_return: a.risk_return_points(),
                rolling_volatility: per_symbol(&symbols, |s| {
                    a.rolling_volatility(s, config.rolling_window)
                }),
                distributions: per_symbol(&symbols, |s| a.distribution(s, config.histogram_bins)),
            }),
            LiveData::Unavailable { .. } => Availability::Unavailable {
                message: live.unavailable_message().unwrap_or_default(),
            },
        };

        DashboardReport {
            generated_at: Utc::now(),
            start_date: config.start_date,
            symbols,
            live: live_report,
            static_data: static_data.clone(),
        }
    }
}

fn per_symbol<T>(
    symbols: &[Symbol],
    f: impl Fn(&Symbol) -> Availability<T>,
) -> BTreeMap<Symbol, Availability<T>> {
    symbols.iter().map(|s| (s.clone(), f(s))).collect()
}
