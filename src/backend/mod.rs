//! Sentiment backend client
//!
//! The backend base URL is user-configured at runtime; everything here takes
//! it as an explicit constructor argument rather than reading ambient state.
//! The ML-classified buildup service runs on port 8092 of the same host and
//! its URL is derived from the base URL.

pub mod types;

use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use types::*;
use url::Url;

/// Port of the ML buildup classifier service.
const ML_PORT: u16 = 8092;

/// Default backend when the user submits an empty base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Scope of the index/sector series endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesScope {
    Index,
    Sector,
}

/// Market trend filter for the index/sector series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarketTrend {
    #[default]
    None,
    Bullish,
    Bearish,
}

/// Time-window filter for the index/sector series. The backend takes the
/// window as an opaque bucket number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    #[default]
    All,
    Min15,
    Min30,
    Min45,
    Min60,
    Min120,
}

impl TimeWindow {
    fn query_value(&self) -> Option<&'static str> {
        match self {
            TimeWindow::All => None,
            TimeWindow::Min15 => Some("1"),
            TimeWindow::Min30 => Some("2"),
            TimeWindow::Min45 => Some("3"),
            TimeWindow::Min60 => Some("4"),
            TimeWindow::Min120 => Some("5"),
        }
    }
}

/// Query parameters for the index/sector series endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeriesQuery {
    pub trend: MarketTrend,
    pub window: TimeWindow,
}

impl SeriesQuery {
    fn params(&self) -> Vec<(&'static str, &'static str)> {
        let mut params = vec![("chartData", "true")];
        match self.trend {
            MarketTrend::Bullish => params.push(("bullish", "true")),
            MarketTrend::Bearish => params.push(("bullish", "false")),
            MarketTrend::None => {}
        }
        if let Some(last) = self.window.query_value() {
            params.push(("last", last));
        }
        params
    }
}

/// Index symbols accepted by the Greek chart endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSymbol {
    Nifty50,
    NiftyBank,
}

impl IndexSymbol {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexSymbol::Nifty50 => "Nifty 50",
            IndexSymbol::NiftyBank => "Nifty Bank",
        }
    }
}

/// Read access to every backend endpoint the screens consume.
#[async_trait]
pub trait SentimentFeed: Send + Sync {
    async fn index_info(&self, query: &SeriesQuery) -> Result<LabelledSeries>;
    async fn sector_info(&self, query: &SeriesQuery) -> Result<LabelledSeries>;
    async fn bullish_oi(&self) -> Result<BuildupMap>;
    async fn bearish_oi(&self) -> Result<BuildupMap>;
    async fn ml_bullish(&self) -> Result<MlBuildupMap>;
    async fn ml_bearish(&self) -> Result<MlBuildupMap>;
    async fn option_chain(&self) -> Result<OptionChainMap>;
    async fn greek_diff(&self) -> Result<Vec<GreekDiffEntry>>;
    async fn oi_bullish_stocks(&self) -> Result<StockRankingMap>;
    async fn greek_chart(&self, symbol: IndexSymbol) -> Result<Vec<GreekSample>>;
    async fn oi_buildup(&self, token: &str) -> Result<PackedBuildupMap>;
    async fn advance_decline(&self) -> Result<AdvanceDecline>;
}

/// Normalize a user-entered base URL.
///
/// A bare host gets an `http://` scheme; an empty input falls back to the
/// default localhost backend.
pub fn normalize_base_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    let candidate = if trimmed.is_empty() {
        DEFAULT_BASE_URL.to_string()
    } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let url = Url::parse(&candidate)
        .map_err(|e| AppError::Config(format!("invalid base URL {:?}: {}", input, e)))?;

    if url.host_str().is_none() {
        return Err(AppError::Config(format!("base URL {:?} has no host", input)));
    }

    Ok(url)
}

/// HTTP implementation of [`SentimentFeed`].
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    ml_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;

        let mut ml_url = base_url.clone();
        ml_url
            .set_port(Some(ML_PORT))
            .map_err(|_| AppError::Config(format!("cannot derive ML port on {}", base_url)))?;

        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url,
            ml_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::Config(format!("bad endpoint path {:?}: {}", path, e)))
    }

    fn ml_endpoint(&self, path: &str) -> Result<Url> {
        self.ml_url
            .join(path)
            .map_err(|e| AppError::Config(format!("bad ML endpoint path {:?}: {}", path, e)))
    }

    async fn get_json<T>(&self, url: Url, query: &[(&str, &str)]) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

#[async_trait]
impl SentimentFeed for HttpBackend {
    async fn index_info(&self, query: &SeriesQuery) -> Result<LabelledSeries> {
        self.get_json(self.endpoint("/api/v1/getIndexInfo")?, &query.params())
            .await
    }

    async fn sector_info(&self, query: &SeriesQuery) -> Result<LabelledSeries> {
        self.get_json(self.endpoint("/api/v1/getSectorInfo")?, &query.params())
            .await
    }

    async fn bullish_oi(&self) -> Result<BuildupMap> {
        self.get_json(self.endpoint("/api/v1/getBullishOIData")?, &[])
            .await
    }

    async fn bearish_oi(&self) -> Result<BuildupMap> {
        self.get_json(self.endpoint("/api/v1/getBearishOIData")?, &[])
            .await
    }

    async fn ml_bullish(&self) -> Result<MlBuildupMap> {
        self.get_json(self.ml_endpoint("/bullish")?, &[]).await
    }

    async fn ml_bearish(&self) -> Result<MlBuildupMap> {
        self.get_json(self.ml_endpoint("/bearish")?, &[]).await
    }

    async fn option_chain(&self) -> Result<OptionChainMap> {
        self.get_json(
            self.endpoint("/api/v1/options/getOptionChainData")?,
            &[("local", "true")],
        )
        .await
    }

    async fn greek_diff(&self) -> Result<Vec<GreekDiffEntry>> {
        self.get_json(
            self.endpoint("/api/v1/options/optionGreekDiff")?,
            &[("smartAPI", "true")],
        )
        .await
    }

    async fn oi_bullish_stocks(&self) -> Result<StockRankingMap> {
        self.get_json(self.endpoint("/api/v1/options/OIBullishStocks")?, &[])
            .await
    }

    async fn greek_chart(&self, symbol: IndexSymbol) -> Result<Vec<GreekSample>> {
        self.get_json(
            self.endpoint("/api/v1/index/getChartData")?,
            &[("symbol", symbol.as_str())],
        )
        .await
    }

    async fn oi_buildup(&self, token: &str) -> Result<PackedBuildupMap> {
        self.get_json(self.endpoint("/api/v1/getOIBuildUp")?, &[("token", token)])
            .await
    }

    async fn advance_decline(&self) -> Result<AdvanceDecline> {
        self.get_json(self.endpoint("/api/v1/getOIAdvanceDecline")?, &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bare_host() {
        let url = normalize_base_url("192.168.1.20:8080").unwrap();
        assert_eq!(url.as_str(), "http://192.168.1.20:8080/");
    }

    #[test]
    fn test_normalize_keeps_scheme() {
        let url = normalize_base_url("https://oi.example.com").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_normalize_empty_falls_back() {
        let url = normalize_base_url("   ").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_ml_url_swaps_port() {
        let backend = HttpBackend::new("http://localhost:8080").unwrap();
        assert_eq!(backend.ml_url.port(), Some(8092));
        assert_eq!(backend.ml_url.host_str(), Some("localhost"));
    }

    #[test]
    fn test_series_query_params() {
        let query = SeriesQuery {
            trend: MarketTrend::Bearish,
            window: TimeWindow::Min60,
        };
        assert_eq!(
            query.params(),
            vec![("chartData", "true"), ("bullish", "false"), ("last", "4")]
        );

        let default = SeriesQuery::default();
        assert_eq!(default.params(), vec![("chartData", "true")]);
    }
}
