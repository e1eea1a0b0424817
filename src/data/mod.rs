pub mod csv_store;
pub mod memory;
pub mod static_data;
pub mod yahoo;

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::errors::{AppError, FetchFailure};
use crate::models::config::{DashboardConfig, ProviderConfig};
use crate::models::price::PriceTable;
use crate::models::symbol::SymbolSet;

/// Source of daily closing prices.
///
/// Symbols the source knows nothing about are left out of the table rather
/// than failing the whole fetch.
pub trait PriceStore: Send + Sync {
    fn fetch(
        &self,
        symbols: &SymbolSet,
        start_date: NaiveDate,
    ) -> impl Future<Output = Result<PriceTable, FetchFailure>> + Send;
}

impl<T: PriceStore> PriceStore for Arc<T> {
    fn fetch(
        &self,
        symbols: &SymbolSet,
        start_date: NaiveDate,
    ) -> impl Future<Output = Result<PriceTable, FetchFailure>> + Send {
        (**self).fetch(symbols, start_date)
    }
}

/// The store selected by configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredStore {
    Yahoo(yahoo::YahooPriceStore),
    Csv(csv_store::CsvPriceStore),
}

impl ConfiguredStore {
    pub fn from_config(config: &DashboardConfig) -> Result<Self, AppError> {
        match &config.provider {
            ProviderConfig::Yahoo { base_url } => {
                let store = yahoo::YahooPriceStore::new(base_url.clone(), config.fetch_timeout())
                    .map_err(|e| AppError::InvalidConfig(e.to_string()))?;
                Ok(ConfiguredStore::Yahoo(store))
            }
            ProviderConfig::Csv { path } => {
                let store = csv_store::CsvPriceStore::new(path);
                info!("Reading prices from {}", store.path().display());
                Ok(ConfiguredStore::Csv(store))
            }
        }
    }
}

impl PriceStore for ConfiguredStore {
    async fn fetch(
        &self,
        symbols: &SymbolSet,
        start_date: NaiveDate,
    ) -> Result<PriceTable, FetchFailure> {
        match self {
            ConfiguredStore::Yahoo(store) => store.fetch(symbols, start_date).await,
            ConfiguredStore::Csv(store) => store.fetch(symbols, start_date).await,
        }
    }
}
