//! Market breadth bar
//!
//! Advance/decline counts split into bar percentages.

use crate::backend::types::AdvanceDecline;
use crate::backend::SentimentFeed;
use crate::error::Result;
use crate::scheduler::Fetcher;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

pub const FLOOR: Duration = Duration::from_secs(60);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreadthGauge {
    pub advance: i64,
    pub decline: i64,
    pub advance_pct: f64,
    pub decline_pct: f64,
}

pub fn gauge(counts: &AdvanceDecline) -> BreadthGauge {
    let total = counts.advance + counts.decline;
    let (advance_pct, decline_pct) = if total > 0 {
        (
            counts.advance as f64 / total as f64 * 100.0,
            counts.decline as f64 / total as f64 * 100.0,
        )
    } else {
        (0.0, 0.0)
    };

    BreadthGauge {
        advance: counts.advance,
        decline: counts.decline,
        advance_pct,
        decline_pct,
    }
}

pub struct BreadthFetcher {
    feed: Arc<dyn SentimentFeed>,
}

impl BreadthFetcher {
    pub fn new(feed: Arc<dyn SentimentFeed>) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl Fetcher for BreadthFetcher {
    type Rows = BreadthGauge;

    async fn fetch(&self) -> Result<BreadthGauge> {
        let counts = self.feed.advance_decline().await?;
        Ok(gauge(&counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_split() {
        let g = gauge(&AdvanceDecline {
            advance: 120,
            decline: 80,
        });
        assert_eq!(g.advance_pct, 60.0);
        assert_eq!(g.decline_pct, 40.0);
    }

    #[test]
    fn test_gauge_zero_total() {
        let g = gauge(&AdvanceDecline {
            advance: 0,
            decline: 0,
        });
        assert_eq!(g.advance_pct, 0.0);
        assert_eq!(g.decline_pct, 0.0);
    }
}
