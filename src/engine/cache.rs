use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use super::normalize::normalize_table;
use super::returns::compute_returns;
use crate::errors::{AppError, FetchFailure};
use crate::models::price::PriceTable;
use crate::models::series::{NormalizedSeries, ReturnSeries};
use crate::models::symbol::{Symbol, SymbolSet};

/// Identifies one fetch-and-derive result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbols: SymbolSet,
    pub start_date: NaiveDate,
}

impl CacheKey {
    pub fn new(symbols: SymbolSet, start_date: NaiveDate) -> Self {
        CacheKey { symbols, start_date }
    }
}

/// Raw prices plus the series derived directly from them. Immutable once built.
#[derive(Debug)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub prices: PriceTable,
    pub normalized: BTreeMap<Symbol, NormalizedSeries>,
    pub returns: BTreeMap<Symbol, ReturnSeries>,
    pub created_at: Instant,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Run the normalizer and return calculator over a fresh table.
    pub fn derive(key: CacheKey, prices: PriceTable) -> Self {
        let normalized = normalize_table(&prices);
        let returns = compute_returns(&prices);
        CacheEntry {
            key,
            prices,
            normalized,
            returns,
            created_at: Instant::now(),
            fetched_at: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// Time-bounded cache around the price fetch and the derivations that
/// depend only on raw prices.
///
/// Readers clone an `Arc` of a complete entry; replacement swaps the `Arc`,
/// so a reader never observes a half-built entry.
///
/// Concurrent misses on the same key are NOT coalesced: each caller runs its
/// own fetch and the last one to finish wins. That is fine for a single
/// requester per rendering pass. Serving many simultaneous clients needs a
/// per-key single-flight guard in front of `load`.
pub struct ResultCache {
    ttl: Duration,
    fetch_timeout: Duration,
    entries: DashMap<CacheKey, Arc<CacheEntry>>,
    /// Last failed fetch per key, cleared by a successful load or `invalidate`.
    failures: DashMap<CacheKey, FetchFailure>,
}

impl ResultCache {
    pub fn new(ttl: Duration, fetch_timeout: Duration) -> Self {
        ResultCache {
            ttl,
            fetch_timeout,
            entries: DashMap::new(),
            failures: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached entry for `key` if still fresh, otherwise fetch.
    ///
    /// After a failed fetch this keeps returning `DataUnavailable` without
    /// calling `fetch` again until `refresh` or `invalidate`.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        fetch: F,
    ) -> Result<Arc<CacheEntry>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PriceTable, FetchFailure>>,
    {
        if let Some(entry) = self.fresh_entry(key) {
            debug!(
                "Cache hit for {} since {} (age {:?})",
                key.symbols,
                key.start_date,
                entry.age()
            );
            return Ok(entry);
        }

        if let Some(failure) = self.failures.get(key).map(|f| f.value().clone()) {
            debug!("Cached failure for {}: {}", key.symbols, failure);
            return Err(AppError::DataUnavailable(failure));
        }

        self.load(key, fetch).await
    }

    /// Fetch now and replace the entry for `key` on success.
    /// On failure the previous entry, if any, is left as it was.
    pub async fn refresh<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<Arc<CacheEntry>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PriceTable, FetchFailure>>,
    {
        self.load(key, fetch).await
    }

    /// Drop every entry and failure marker regardless of age.
    pub fn invalidate(&self) {
        let dropped = self.entries.len();
        self.entries.clear();
        self.failures.clear();
        info!("Result cache invalidated ({} entries dropped)", dropped);
    }

    /// Stored entry for `key`, fresh or not.
    pub fn peek(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.entries.get(key).map(|e| Arc::clone(e.value()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fresh entry for `key`; an expired one is evicted.
    fn fresh_entry(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let ttl = self.ttl;
        if self.entries.remove_if(key, |_, e| !e.is_fresh(ttl)).is_some() {
            info!("Cache entry for {} expired", key.symbols);
            return None;
        }
        self.peek(key)
    }

    async fn load<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<Arc<CacheEntry>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PriceTable, FetchFailure>>,
    {
        info!("Fetching prices for {} since {}", key.symbols, key.start_date);
        let started = Instant::now();

        let outcome = match timeout(self.fetch_timeout, fetch()).await {
            Ok(Ok(table)) if !has_observations(&table) => {
                Err(FetchFailure::empty("price store returned no observations"))
            }
            Ok(result) => result,
            Err(_) => Err(FetchFailure::timed_out(format!(
                "no response within {:?}",
                self.fetch_timeout
            ))),
        };

        match outcome {
            Ok(table) => {
                let entry = Arc::new(CacheEntry::derive(key.clone(), table));
                self.entries.insert(key.clone(), Arc::clone(&entry));
                self.failures.remove(key);
                info!(
                    "Cached {} symbols x {} dates in {:?}",
                    entry.normalized.len(),
                    entry.prices.dates().len(),
                    started.elapsed()
                );
                Ok(entry)
            }
            Err(failure) => {
                warn!("Price fetch for {} failed: {}", key.symbols, failure);
                self.failures.insert(key.clone(), failure.clone());
                Err(AppError::DataUnavailable(failure))
            }
        }
    }
}

fn has_observations(table: &PriceTable) -> bool {
    table.symbols().any(|s| table.populated_count(s) > 0)
}
