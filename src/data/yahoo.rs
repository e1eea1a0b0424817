use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{info, warn};

use super::PriceStore;
use crate::errors::FetchFailure;
use crate::models::price::PriceTable;
use crate::models::symbol::{Symbol, SymbolSet};

const USER_AGENT: &str = concat!("bnpl-microscope/", env!("CARGO_PKG_VERSION"));

// ── Chart API payload ──

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Daily closes from the Yahoo Finance chart API.
///
/// Uses adjusted closes when the payload carries them, raw closes otherwise.
#[derive(Debug, Clone)]
pub struct YahooPriceStore {
    client: Client,
    base_url: String,
}

impl YahooPriceStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchFailure> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchFailure::network(format!("Cannot build HTTP client: {}", e)))?;
        Ok(YahooPriceStore {
            client,
            base_url: base_url.into(),
        })
    }

    fn chart_url(&self, symbol: &Symbol) -> Result<Url, FetchFailure> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FetchFailure::network(format!("Bad base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| FetchFailure::network(format!("Base URL {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .push(symbol.as_str());
        Ok(url)
    }

    /// One symbol's populated closes. An unknown symbol yields an empty vec.
    async fn fetch_symbol(
        &self,
        symbol: &Symbol,
        start_date: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, FetchFailure> {
        let period1 = start_date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0);
        let period2 = Utc::now().timestamp();

        let response = self
            .client
            .get(self.chart_url(symbol)?)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!("No chart data for {} (404)", symbol);
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(FetchFailure::network(format!(
                "HTTP {} fetching {}",
                status, symbol
            )));
        }

        let body = response.text().await?;
        parse_chart(symbol, &body)
    }
}

impl PriceStore for YahooPriceStore {
    async fn fetch(
        &self,
        symbols: &SymbolSet,
        start_date: NaiveDate,
    ) -> Result<PriceTable, FetchFailure> {
        let mut series = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let points = self.fetch_symbol(symbol, start_date).await?;
            if points.is_empty() {
                warn!("{} has no prices since {}", symbol, start_date);
                continue;
            }
            info!("Fetched {} closes for {}", points.len(), symbol);
            series.push((symbol.clone(), points));
        }

        if series.is_empty() {
            return Err(FetchFailure::empty(format!(
                "no prices for any of {} since {}",
                symbols, start_date
            )));
        }
        PriceTable::from_series(series).map_err(|e| FetchFailure::malformed(e.to_string()))
    }
}

/// Decode a chart payload into populated `(date, close)` pairs.
fn parse_chart(symbol: &Symbol, body: &str) -> Result<Vec<(NaiveDate, f64)>, FetchFailure> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| FetchFailure::malformed(format!("{}: {}", symbol, e)))?;

    if let Some(err) = response.chart.error {
        if err.code.eq_ignore_ascii_case("Not Found") {
            return Ok(Vec::new());
        }
        return Err(FetchFailure::malformed(format!(
            "{}: {} ({})",
            symbol, err.description, err.code
        )));
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let closes = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|a| a.adjclose)
        .filter(|c| !c.is_empty())
        .or_else(|| result.indicators.quote.into_iter().next().map(|q| q.close))
        .unwrap_or_default();

    if closes.len() != result.timestamp.len() {
        return Err(FetchFailure::malformed(format!(
            "{}: {} timestamps but {} closes",
            symbol,
            result.timestamp.len(),
            closes.len()
        )));
    }

    let mut points = Vec::with_capacity(closes.len());
    for (ts, close) in result.timestamp.iter().zip(closes) {
        let Some(price) = close.filter(|p| p.is_finite() && *p > 0.0) else {
            continue;
        };
        let date = DateTime::<Utc>::from_timestamp(*ts, 0)
            .ok_or_else(|| FetchFailure::malformed(format!("{}: bad timestamp {}", symbol, ts)))?
            .date_naive();
        points.push((date, price));
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::FetchFailureKind;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // 2025-09-10, 2025-09-11, 2025-09-12 at 13:30 UTC
    const SAMPLE: &str = r#"{"chart":{"result":[{"meta":{"symbol":"KLAR"},
        "timestamp":[1757511000,1757597400,1757683800],
        "indicators":{"quote":[{"close":[45.82,44.1,null]}],
                      "adjclose":[{"adjclose":[45.80,44.0,null]}]}}],"error":null}}"#;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, day).unwrap()
    }

    #[test]
    fn test_parse_prefers_adjusted_and_skips_nulls() {
        let points = parse_chart(&Symbol::new("KLAR"), SAMPLE).unwrap();
        assert_eq!(points, vec![(d(10), 45.80), (d(11), 44.0)]);
    }

    #[test]
    fn test_parse_falls_back_to_close() {
        let body = r#"{"chart":{"result":[{"timestamp":[1757511000],
            "indicators":{"quote":[{"close":[45.82]}]}}],"error":null}}"#;
        let points = parse_chart(&Symbol::new("KLAR"), body).unwrap();
        assert_eq!(points, vec![(d(10), 45.82)]);
    }

    #[test]
    fn test_parse_length_mismatch_is_malformed() {
        let body = r#"{"chart":{"result":[{"timestamp":[1757511000,1757597400],
            "indicators":{"quote":[{"close":[45.82]}]}}],"error":null}}"#;
        let err = parse_chart(&Symbol::new("KLAR"), body).unwrap_err();
        assert_eq!(err.kind, FetchFailureKind::MalformedResponse);
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        let err = parse_chart(&Symbol::new("KLAR"), "<html>rate limited</html>").unwrap_err();
        assert_eq!(err.kind, FetchFailureKind::MalformedResponse);
    }

    #[test]
    fn test_parse_not_found_error_is_empty() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(parse_chart(&Symbol::new("SQ"), body).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_skips_unknown_symbol() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chart/KLAR"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/chart/SQ"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store =
            YahooPriceStore::new(format!("{}/chart", server.uri()), Duration::from_secs(5)).unwrap();
        let table = store.fetch(&SymbolSet::new(["KLAR", "SQ"]), d(10)).await.unwrap();
        assert!(table.contains(&Symbol::new("KLAR")));
        assert!(!table.contains(&Symbol::new("SQ")));
        assert_eq!(table.populated_count(&Symbol::new("KLAR")), 2);
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let store = YahooPriceStore::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = store.fetch(&SymbolSet::new(["KLAR"]), d(10)).await.unwrap_err();
        assert_eq!(err.kind, FetchFailureKind::Network);
    }

    #[tokio::test]
    async fn test_fetch_all_unknown_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = YahooPriceStore::new(server.uri(), Duration::from_secs(5)).unwrap();
        let err = store.fetch(&SymbolSet::new(["NOPE"]), d(10)).await.unwrap_err();
        assert_eq!(err.kind, FetchFailureKind::EmptyResponse);
    }
}
