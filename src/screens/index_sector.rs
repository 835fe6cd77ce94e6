//! Index/sector analysis screen
//!
//! Reshapes the labelled time series payload into one series per index or
//! sector label. Payload rows that carry nothing but a `time` key are
//! dropped before sorting.

use crate::backend::types::LabelledSeries;
use crate::backend::{SentimentFeed, SeriesQuery, SeriesScope};
use crate::error::Result;
use crate::scheduler::Fetcher;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const FLOOR: Duration = Duration::from_secs(60);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Chart-ready series, one per label, aligned on the shared time axis.
/// A missing reading at a point in time stays `None` (a gap in the chart).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabelledChart {
    pub labels: Vec<String>,
    pub series: BTreeMap<String, Vec<Option<f64>>>,
}

/// Compact `HH:MM` form of a series timestamp, for bar-chart axes.
pub fn short_time(time: &str) -> String {
    let mut parts = time.split(':');
    match (parts.next(), parts.next()) {
        (Some(h), Some(m)) => format!("{:0>2}:{:0>2}", h, m),
        _ => time.to_string(),
    }
}

pub fn labelled_chart(payload: &LabelledSeries) -> LabelledChart {
    // The label set comes from the first payload row, as served.
    let Some(first) = payload.first() else {
        return LabelledChart::default();
    };
    let labels: Vec<String> = first.keys().filter(|k| *k != "time").cloned().collect();

    let mut points: Vec<&serde_json::Map<String, serde_json::Value>> = payload
        .iter()
        .filter(|item| item.len() > 1)
        .collect();
    points.sort_by(|a, b| {
        let ta = a.get("time").and_then(|v| v.as_str()).unwrap_or("");
        let tb = b.get("time").and_then(|v| v.as_str()).unwrap_or("");
        ta.cmp(tb)
    });

    let times: Vec<String> = points
        .iter()
        .map(|item| {
            item.get("time")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        })
        .collect();

    let series = labels
        .iter()
        .map(|label| {
            let values = points
                .iter()
                .map(|item| item.get(label.as_str()).and_then(|v| v.as_f64()))
                .collect();
            (label.clone(), values)
        })
        .collect();

    LabelledChart {
        labels: times,
        series,
    }
}

/// Poll-session fetcher for either the index or the sector series.
pub struct IndexSectorFetcher {
    feed: Arc<dyn SentimentFeed>,
    scope: SeriesScope,
    query: SeriesQuery,
}

impl IndexSectorFetcher {
    pub fn new(feed: Arc<dyn SentimentFeed>, scope: SeriesScope, query: SeriesQuery) -> Self {
        Self { feed, scope, query }
    }
}

#[async_trait]
impl Fetcher for IndexSectorFetcher {
    type Rows = LabelledChart;

    async fn fetch(&self) -> Result<LabelledChart> {
        let payload = match self.scope {
            SeriesScope::Index => self.feed.index_info(&self.query).await?,
            SeriesScope::Sector => self.feed.sector_info(&self.query).await?,
        };
        Ok(labelled_chart(&payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> LabelledSeries {
        serde_json::from_value(json!([
            { "time": "10:05:00", "Nifty IT": 1.2, "Nifty Auto": -0.4 },
            { "time": "10:00:00", "Nifty IT": 0.8, "Nifty Auto": -0.1 },
            { "time": "10:10:00" },
            { "time": "10:15:00", "Nifty IT": 1.5 }
        ]))
        .unwrap()
    }

    #[test]
    fn test_chart_sorts_and_drops_time_only_rows() {
        let chart = labelled_chart(&payload());

        // The time-only row is gone; the rest are time-sorted.
        assert_eq!(chart.labels, vec!["10:00:00", "10:05:00", "10:15:00"]);
        assert_eq!(
            chart.series["Nifty IT"],
            vec![Some(0.8), Some(1.2), Some(1.5)]
        );
        // Missing reading stays a gap.
        assert_eq!(
            chart.series["Nifty Auto"],
            vec![Some(-0.1), Some(-0.4), None]
        );
    }

    #[test]
    fn test_empty_payload() {
        let chart = labelled_chart(&Vec::new());
        assert!(chart.labels.is_empty());
        assert!(chart.series.is_empty());
    }

    #[test]
    fn test_short_time() {
        assert_eq!(short_time("9:5:00"), "09:05");
        assert_eq!(short_time("10:15:00"), "10:15");
    }
}
