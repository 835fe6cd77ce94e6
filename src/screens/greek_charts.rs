//! Option Greek chart screen
//!
//! Per-index Greek time series: one CE/PE series pair per Greek, with
//! y-axis bounds taken from the extremes of both series.

use crate::backend::types::GreekSample;
use crate::backend::{IndexSymbol, SentimentFeed};
use crate::error::Result;
use crate::scheduler::Fetcher;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub const FLOOR: Duration = Duration::from_secs(60);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// A CE/PE series pair for one Greek.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GreekSeries {
    pub labels: Vec<String>,
    pub ce: Vec<f64>,
    pub pe: Vec<f64>,
}

impl GreekSeries {
    /// Chart y-axis bounds: min and max over both legs. None when empty.
    pub fn y_bounds(&self) -> Option<(f64, f64)> {
        let mut values = self.ce.iter().chain(self.pe.iter());
        let first = *values.next()?;
        let (min, max) = values.fold((first, first), |(min, max), &v| {
            (min.min(v), max.max(v))
        });
        Some((min, max))
    }
}

/// The four charts the screen renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GreekChartSet {
    pub delta: GreekSeries,
    pub vega: GreekSeries,
    pub theta: GreekSeries,
    pub gamma: GreekSeries,
}

pub fn chart_set(samples: &[GreekSample]) -> GreekChartSet {
    let labels: Vec<String> = samples.iter().map(|s| s.time.clone()).collect();

    let series = |ce: fn(&GreekSample) -> f64, pe: fn(&GreekSample) -> f64| GreekSeries {
        labels: labels.clone(),
        ce: samples.iter().map(ce).collect(),
        pe: samples.iter().map(pe).collect(),
    };

    GreekChartSet {
        delta: series(|s| s.ce_delta, |s| s.pe_delta),
        vega: series(|s| s.ce_vega, |s| s.pe_vega),
        theta: series(|s| s.ce_theta, |s| s.pe_theta),
        gamma: series(|s| s.ce_gamma, |s| s.pe_gamma),
    }
}

/// Poll-session fetcher for one index symbol.
pub struct GreekChartFetcher {
    feed: Arc<dyn SentimentFeed>,
    symbol: IndexSymbol,
}

impl GreekChartFetcher {
    pub fn new(feed: Arc<dyn SentimentFeed>, symbol: IndexSymbol) -> Self {
        Self { feed, symbol }
    }
}

#[async_trait]
impl Fetcher for GreekChartFetcher {
    type Rows = GreekChartSet;

    async fn fetch(&self) -> Result<GreekChartSet> {
        let samples = self.feed.greek_chart(self.symbol).await?;
        Ok(chart_set(&samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn samples() -> Vec<GreekSample> {
        serde_json::from_value(json!([
            {
                "time": "09:15:00:000",
                "CE delta": 0.5, "PE delta": -0.5,
                "CE vega": 10.0, "PE vega": 12.0,
                "CE theta": -3.0, "PE theta": -2.5,
                "CE gamma": 0.01, "PE gamma": 0.02
            },
            {
                "time": "09:16:00:000",
                "CE delta": 0.6, "PE delta": -0.4,
                "CE vega": 11.0, "PE vega": 9.0,
                "CE theta": -3.2, "PE theta": -2.7,
                "CE gamma": 0.015, "PE gamma": 0.018
            }
        ]))
        .unwrap()
    }

    #[test]
    fn test_chart_set_splits_legs() {
        let set = chart_set(&samples());
        assert_eq!(set.delta.labels, vec!["09:15:00:000", "09:16:00:000"]);
        assert_eq!(set.delta.ce, vec![0.5, 0.6]);
        assert_eq!(set.delta.pe, vec![-0.5, -0.4]);
        assert_eq!(set.gamma.pe, vec![0.02, 0.018]);
    }

    #[test]
    fn test_y_bounds_cover_both_legs() {
        let set = chart_set(&samples());
        assert_eq!(set.vega.y_bounds(), Some((9.0, 12.0)));
        assert_eq!(GreekSeries::default().y_bounds(), None);
    }
}
