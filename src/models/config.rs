use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::symbol::{Symbol, SymbolSet};
use crate::errors::AppError;

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Where live prices come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderConfig {
    Yahoo { base_url: String },
    /// Wide CSV file: `date,SYM1,SYM2,...`
    Csv { path: PathBuf },
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Yahoo {
            base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
        }
    }
}

/// A named price level the latest price is compared against (IPO price, ATH).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLevel {
    pub symbol: Symbol,
    pub label: String,
    pub price: f64,
}

/// Dashboard backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub symbols: Vec<Symbol>,
    pub start_date: NaiveDate,
    pub cache_ttl_secs: u64,
    pub fetch_timeout_secs: u64,
    pub provider: ProviderConfig,
    pub references: Vec<ReferenceLevel>,
    /// Trailing window (in returns) for rolling volatility.
    pub rolling_window: usize,
    pub histogram_bins: usize,
    /// Write CSV exports here after each snapshot, if set.
    pub export_dir: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            symbols: ["KLAR", "AFRM", "PYPL", "SQ", "^GSPC"]
                .into_iter()
                .map(Symbol::new)
                .collect(),
            // Klarna IPO day
            start_date: NaiveDate::from_ymd_opt(2025, 9, 10).unwrap_or(NaiveDate::MIN),
            cache_ttl_secs: 3600,
            fetch_timeout_secs: 15,
            provider: ProviderConfig::default(),
            references: vec![
                ReferenceLevel {
                    symbol: Symbol::new("KLAR"),
                    label: "IPO".to_string(),
                    price: 40.0,
                },
                ReferenceLevel {
                    symbol: Symbol::new("KLAR"),
                    label: "ATH".to_string(),
                    price: 57.20,
                },
            ],
            rolling_window: 21,
            histogram_bins: 40,
            export_dir: None,
        }
    }
}

impl DashboardConfig {
    /// Load from an optional JSON file, apply `MICROSCOPE_*` overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut config = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .map_err(|e| AppError::FileRead(format!("{}: {}", p.display(), e)))?;
                serde_json::from_str(&text)
                    .map_err(|e| AppError::InvalidConfig(format!("{}: {}", p.display(), e)))?
            }
            None => DashboardConfig::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), AppError> {
        if let Some(v) = env_opt("MICROSCOPE_SYMBOLS") {
            self.symbols = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(Symbol::new)
                .collect();
        }
        if let Some(v) = env_opt("MICROSCOPE_START_DATE") {
            self.start_date = NaiveDate::parse_from_str(&v, "%Y-%m-%d").map_err(|e| {
                AppError::InvalidConfig(format!("MICROSCOPE_START_DATE={}: {}", v, e))
            })?;
        }
        if let Some(v) = env_parse::<u64>("MICROSCOPE_CACHE_TTL_SECS")? {
            self.cache_ttl_secs = v;
        }
        if let Some(v) = env_parse::<u64>("MICROSCOPE_FETCH_TIMEOUT_SECS")? {
            self.fetch_timeout_secs = v;
        }
        if let Some(v) = env_opt("MICROSCOPE_CSV_PATH") {
            self.provider = ProviderConfig::Csv { path: PathBuf::from(v) };
        } else if let Some(v) = env_opt("MICROSCOPE_YAHOO_URL") {
            self.provider = ProviderConfig::Yahoo { base_url: v };
        }
        if let Some(v) = env_opt("MICROSCOPE_EXPORT_DIR") {
            self.export_dir = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.symbols.is_empty() {
            return Err(AppError::InvalidConfig("at least one symbol is required".into()));
        }
        if self.cache_ttl_secs == 0 {
            return Err(AppError::InvalidConfig("cache_ttl_secs must be positive".into()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(AppError::InvalidConfig("fetch_timeout_secs must be positive".into()));
        }
        if self.rolling_window < 2 {
            return Err(AppError::InvalidConfig("rolling_window must be at least 2".into()));
        }
        if self.histogram_bins == 0 {
            return Err(AppError::InvalidConfig("histogram_bins must be positive".into()));
        }
        if let Some(r) = self.references.iter().find(|r| !r.price.is_finite() || r.price <= 0.0) {
            return Err(AppError::InvalidConfig(format!(
                "reference {} for {} must have a positive price",
                r.label, r.symbol
            )));
        }
        Ok(())
    }

    pub fn symbol_set(&self) -> SymbolSet {
        SymbolSet::new(self.symbols.iter().cloned())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn references_for(&self, symbol: &Symbol) -> Vec<ReferenceLevel> {
        self.references
            .iter()
            .filter(|r| &r.symbol == symbol)
            .cloned()
            .collect()
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>, AppError>
where
    T::Err: std::fmt::Display,
{
    match env_opt(name) {
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|e| AppError::InvalidConfig(format!("{}={}: {}", name, v, e))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DashboardConfig::default();
        config.validate().unwrap();
        assert_eq!(config.symbols.len(), 5);
        assert_eq!(config.start_date.to_string(), "2025-09-10");
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.references_for(&Symbol::new("KLAR")).len(), 2);
        assert!(config.references_for(&Symbol::new("AFRM")).is_empty());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: DashboardConfig = serde_json::from_str(
            r#"{"symbols":["KLAR","AFRM"],"provider":{"kind":"csv","path":"prices.csv"}}"#,
        )
        .unwrap();
        assert_eq!(config.symbols, vec![Symbol::new("KLAR"), Symbol::new("AFRM")]);
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(
            config.provider,
            ProviderConfig::Csv {
                path: PathBuf::from("prices.csv")
            }
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = DashboardConfig::default();
        config.cache_ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.symbols.clear();
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.rolling_window = 1;
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.references[0].price = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"start_date":"2025-10-01","histogram_bins":20}"#).unwrap();
        let config = DashboardConfig::load(Some(&path)).unwrap();
        assert_eq!(config.histogram_bins, 20);
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = DashboardConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig(_)));
    }
}
