//! Stock market analysis screen
//!
//! Two tables: the per-index option Greek deltas with a vega-driven
//! sentiment column, and the OI-derived stock rankings. The vega polarity
//! here is this screen's own table: for puts a rising vega reads bullish,
//! for calls it reads bearish. Other screens classify the same figures
//! differently and keep their own tables.

use crate::backend::types::{GreekDiffEntry, OptionType, StockRankingMap};
use crate::backend::SentimentFeed;
use crate::error::Result;
use crate::scheduler::Fetcher;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Minimum refresh interval for the Greek-diff table.
pub const GREEK_FLOOR: Duration = Duration::from_secs(10);

/// Default refresh interval for the Greek-diff table.
pub const GREEK_DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// Minimum refresh interval for the stock rankings table.
pub const RANKING_FLOOR: Duration = Duration::from_secs(60);

/// Default refresh interval for the stock rankings table.
pub const RANKING_DEFAULT_INTERVAL: Duration = Duration::from_secs(300);

/// Vega magnitude beyond which the move counts as a sentiment signal.
const VEGA_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

/// Cell background tone used by the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tone {
    Green,
    Red,
    Plain,
}

impl Tone {
    /// Display color, when the cell is tinted at all.
    pub fn hex(&self) -> Option<&'static str> {
        match self {
            Tone::Green => Some("#8ec984"),
            Tone::Red => Some("#ff6f6f"),
            Tone::Plain => None,
        }
    }
}

/// Vega sentiment, per this screen's polarity table.
pub fn vega_sentiment(option_type: OptionType, vega: f64) -> Sentiment {
    match option_type {
        OptionType::Pe => {
            if vega > VEGA_THRESHOLD {
                Sentiment::Bullish
            } else if vega < -VEGA_THRESHOLD {
                Sentiment::Bearish
            } else {
                Sentiment::Neutral
            }
        }
        OptionType::Ce => {
            if vega > VEGA_THRESHOLD {
                Sentiment::Bearish
            } else if vega < -VEGA_THRESHOLD {
                Sentiment::Bullish
            } else {
                Sentiment::Neutral
            }
        }
    }
}

/// Vega cell tone. Same thresholds as the sentiment, same inversion
/// between calls and puts.
pub fn vega_tone(option_type: OptionType, vega: f64) -> Tone {
    match vega_sentiment(option_type, vega) {
        Sentiment::Bullish => Tone::Green,
        Sentiment::Bearish => Tone::Red,
        Sentiment::Neutral => Tone::Plain,
    }
}

/// Delta cell tone: sign-driven, inverted for calls.
pub fn delta_tone(option_type: OptionType, delta: f64) -> Tone {
    match option_type {
        OptionType::Pe => {
            if delta > 0.0 {
                Tone::Green
            } else {
                Tone::Red
            }
        }
        OptionType::Ce => {
            if delta > 0.0 {
                Tone::Red
            } else {
                Tone::Green
            }
        }
    }
}

/// One row of the Greek-diff table, one per (index, option type).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GreekDiffRow {
    pub index: String,
    pub option_type: OptionType,
    pub sentiment: Sentiment,
    pub vega: f64,
    pub vega_tone: Tone,
    /// Positive vega is flagged as IV decay in the grid.
    pub decay: bool,
    pub theta: f64,
    pub delta: f64,
    pub delta_tone: Tone,
}

pub fn greek_diff_rows(entries: &[GreekDiffEntry]) -> Vec<GreekDiffRow> {
    entries
        .iter()
        .map(|entry| GreekDiffRow {
            index: entry.index.clone(),
            option_type: entry.option_type,
            sentiment: vega_sentiment(entry.option_type, entry.vega),
            vega: entry.vega,
            vega_tone: vega_tone(entry.option_type, entry.vega),
            decay: entry.vega > 0.0,
            theta: entry.theta,
            delta: entry.delta,
            delta_tone: delta_tone(entry.option_type, entry.delta),
        })
        .collect()
}

/// One row of the stock rankings table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockRankingRow {
    pub stock: String,
    pub call_short_covering: Option<f64>,
    pub put_long_covering: Option<f64>,
}

pub fn ranking_rows(data: &StockRankingMap) -> Vec<StockRankingRow> {
    data.iter()
        .map(|(stock, values)| StockRankingRow {
            stock: stock.clone(),
            call_short_covering: values.get("Call Short Covering").copied(),
            put_long_covering: values.get("Put Long Covering").copied(),
        })
        .collect()
}

/// Poll-session fetcher for the Greek-diff table.
pub struct GreekDiffFetcher {
    feed: Arc<dyn SentimentFeed>,
}

impl GreekDiffFetcher {
    pub fn new(feed: Arc<dyn SentimentFeed>) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl Fetcher for GreekDiffFetcher {
    type Rows = Vec<GreekDiffRow>;

    async fn fetch(&self) -> Result<Vec<GreekDiffRow>> {
        let entries = self.feed.greek_diff().await?;
        Ok(greek_diff_rows(&entries))
    }
}

/// Poll-session fetcher for the stock rankings table.
pub struct StockRankingFetcher {
    feed: Arc<dyn SentimentFeed>,
}

impl StockRankingFetcher {
    pub fn new(feed: Arc<dyn SentimentFeed>) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl Fetcher for StockRankingFetcher {
    type Rows = Vec<StockRankingRow>;

    async fn fetch(&self) -> Result<Vec<StockRankingRow>> {
        let data = self.feed.oi_bullish_stocks().await?;
        Ok(ranking_rows(&data))
    }
}
