//! OI details screen
//!
//! Four tables: bullish and bearish OI buildup plus their ML-classified
//! counterparts. Each poll tick fetches all four endpoints concurrently and
//! flattens every per-stock series to one row carrying only the newest
//! sample.

use crate::backend::types::{BuildupMap, MlBuildupMap};
use crate::backend::SentimentFeed;
use crate::error::Result;
use crate::scheduler::Fetcher;
use crate::screens::round2;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Minimum refresh interval for this screen.
pub const FLOOR: Duration = Duration::from_secs(60);

/// Default refresh interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// One grid row of the buildup tables, newest sample only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildupRow {
    pub stock: String,
    pub count: i64,
    pub active: bool,
    pub ltp: f64,
    pub time: String,
    pub ce_long_buildup: f64,
    pub ce_short_buildup: f64,
    pub ce_short_covering: f64,
    pub ce_long_unwinding: f64,
    pub pe_long_buildup: f64,
    pub pe_short_buildup: f64,
    pub pe_short_covering: f64,
    pub pe_long_unwinding: f64,
}

/// One grid row of the ML tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MlRow {
    pub stock: String,
    pub count: i64,
    pub active: bool,
    pub added_time: String,
    pub removed_time: Option<String>,
}

/// Everything the screen shows for one tick.
#[derive(Debug, Clone, Serialize)]
pub struct OiDetailsRows {
    pub bullish: Vec<BuildupRow>,
    pub bearish: Vec<BuildupRow>,
    pub ml_bullish: Vec<MlRow>,
    pub ml_bearish: Vec<MlRow>,
}

/// Flatten per-stock buildup series to one row per stock. Stocks with an
/// empty series are dropped.
pub fn flatten_buildup(data: &BuildupMap) -> Vec<BuildupRow> {
    data.iter()
        .filter_map(|(stock, series)| {
            let last = series.time_and_price.last()?;
            Some(BuildupRow {
                stock: stock.clone(),
                count: series.count,
                active: series.active,
                ltp: last.ltp,
                time: last.time.clone(),
                ce_long_buildup: round2(last.ce_long_buildup),
                ce_short_buildup: round2(last.ce_short_buildup),
                ce_short_covering: round2(last.ce_short_covering),
                ce_long_unwinding: round2(last.ce_long_unwinding),
                pe_long_buildup: round2(last.pe_long_buildup),
                pe_short_buildup: round2(last.pe_short_buildup),
                pe_short_covering: round2(last.pe_short_covering),
                pe_long_unwinding: round2(last.pe_long_unwinding),
            })
        })
        .collect()
}

/// Flatten the ML stream to one row per stock, newest add/remove times.
pub fn flatten_ml(data: &MlBuildupMap) -> Vec<MlRow> {
    data.iter()
        .filter_map(|(stock, series)| {
            let last = series.times.last()?;
            Some(MlRow {
                stock: stock.clone(),
                count: series.counter,
                active: series.active,
                added_time: last.added_time.clone(),
                removed_time: last.removed_time.clone(),
            })
        })
        .collect()
}

/// Apply the "show active only" toggle.
pub fn filter_active<R: ActiveRow>(rows: &[R], active_only: bool) -> Vec<R> {
    rows.iter()
        .filter(|row| !active_only || row.is_active())
        .cloned()
        .collect()
}

pub trait ActiveRow: Clone {
    fn is_active(&self) -> bool;
}

impl ActiveRow for BuildupRow {
    fn is_active(&self) -> bool {
        self.active
    }
}

impl ActiveRow for MlRow {
    fn is_active(&self) -> bool {
        self.active
    }
}

/// Poll-session fetcher for the whole screen.
pub struct OiDetailsFetcher {
    feed: Arc<dyn SentimentFeed>,
}

impl OiDetailsFetcher {
    pub fn new(feed: Arc<dyn SentimentFeed>) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl Fetcher for OiDetailsFetcher {
    type Rows = OiDetailsRows;

    async fn fetch(&self) -> Result<OiDetailsRows> {
        let (bearish, bullish, ml_bullish, ml_bearish) = tokio::try_join!(
            self.feed.bearish_oi(),
            self.feed.bullish_oi(),
            self.feed.ml_bullish(),
            self.feed.ml_bearish(),
        )?;

        Ok(OiDetailsRows {
            bullish: flatten_buildup(&bullish),
            bearish: flatten_buildup(&bearish),
            ml_bullish: flatten_ml(&ml_bullish),
            ml_bearish: flatten_ml(&ml_bearish),
        })
    }
}
