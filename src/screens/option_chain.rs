//! Option buildup analysis screen
//!
//! Classifies per-strike call/put buildup labels into display tones and
//! computes the put-call ratio per strike.

use crate::backend::types::{ChainStrike, OptionChainMap};
use crate::backend::SentimentFeed;
use crate::error::Result;
use crate::scheduler::Fetcher;
use crate::screens::round2;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const FLOOR: Duration = Duration::from_secs(60);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Cell tone of a buildup classification. This screen's own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildupTone {
    DarkGreen,
    DarkRed,
    LightGreen,
    Orange,
    Grey,
}

/// Map a backend buildup label to its cell tone. Unknown labels fall
/// through to grey.
pub fn buildup_tone(label: &str) -> BuildupTone {
    match label {
        "Call Buying" | "Put Buying" | "Long Buildup" => BuildupTone::DarkGreen,
        "Call Writing" | "Put Writing" | "Short Buildup" => BuildupTone::DarkRed,
        "Call Short Covering" | "Put Short Covering" | "Short Covering" => {
            BuildupTone::LightGreen
        }
        "Call Long Covering" | "Put Long Covering" | "Long Unwinding" => BuildupTone::Orange,
        _ => BuildupTone::Grey,
    }
}

/// One strike column of the chain table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainRow {
    pub strike: f64,
    pub call_tone: BuildupTone,
    pub put_tone: BuildupTone,
    /// Put-call ratio, `None` when there is no call OI to divide by.
    pub pcr: Option<f64>,
}

pub fn chain_rows(strikes: &[ChainStrike]) -> Vec<ChainRow> {
    strikes
        .iter()
        .map(|strike| ChainRow {
            strike: strike.strike_price,
            call_tone: buildup_tone(&strike.calls_builtup),
            put_tone: buildup_tone(&strike.puts_builtup),
            pcr: if strike.calls_oi > 0.0 {
                Some(round2(strike.puts_oi / strike.calls_oi))
            } else {
                None
            },
        })
        .collect()
}

/// Poll-session fetcher: the whole chain snapshot, keyed by underlying.
pub struct OptionChainFetcher {
    feed: Arc<dyn SentimentFeed>,
}

impl OptionChainFetcher {
    pub fn new(feed: Arc<dyn SentimentFeed>) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl Fetcher for OptionChainFetcher {
    type Rows = BTreeMap<String, Vec<ChainRow>>;

    async fn fetch(&self) -> Result<Self::Rows> {
        let chain: OptionChainMap = self.feed.option_chain().await?;
        Ok(chain
            .iter()
            .map(|(key, strikes)| (key.clone(), chain_rows(strikes)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_buildup_tone_table() {
        assert_eq!(buildup_tone("Call Buying"), BuildupTone::DarkGreen);
        assert_eq!(buildup_tone("Long Buildup"), BuildupTone::DarkGreen);
        assert_eq!(buildup_tone("Put Writing"), BuildupTone::DarkRed);
        assert_eq!(buildup_tone("Short Covering"), BuildupTone::LightGreen);
        assert_eq!(buildup_tone("Put Long Covering"), BuildupTone::Orange);
        assert_eq!(buildup_tone("Long Unwinding"), BuildupTone::Orange);
        assert_eq!(buildup_tone("No Signal"), BuildupTone::Grey);
        assert_eq!(buildup_tone(""), BuildupTone::Grey);
    }

    #[test]
    fn test_chain_rows_pcr() {
        let strikes: Vec<ChainStrike> = serde_json::from_value(json!([
            {
                "strike_price": 22500.0,
                "calls_builtup": "Call Writing",
                "puts_builtup": "Put Buying",
                "calls_oi": 1000.0,
                "puts_oi": 1555.0
            },
            {
                "strike_price": 22600.0,
                "calls_builtup": "Short Covering",
                "puts_builtup": "Long Unwinding",
                "calls_oi": 0.0,
                "puts_oi": 900.0
            }
        ]))
        .unwrap();

        let rows = chain_rows(&strikes);
        assert_eq!(rows[0].pcr, Some(1.56));
        assert_eq!(rows[0].call_tone, BuildupTone::DarkRed);
        assert_eq!(rows[0].put_tone, BuildupTone::DarkGreen);
        // Zero call OI: no ratio instead of infinity.
        assert_eq!(rows[1].pcr, None);
    }
}
