//! Per-stock OI buildup detail (the stock drill-down)
//!
//! Fetched on demand when a stock is selected rather than on a timer. The
//! backend packs the four CE and four PE buildup figures into comma-packed
//! string fields; sample times are raw backend clock values that get shifted
//! back 5h30m and rendered as IST `HH:MM` labels.

use crate::backend::types::{PackedBuildupMap, PackedLegs};
use crate::backend::SentimentFeed;
use crate::error::{AppError, Result};
use chrono::{NaiveDate, NaiveTime, TimeDelta};
use chrono_tz::Asia::Kolkata;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// One parsed sample of a stock's buildup detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailPoint {
    /// IST `HH:MM` chart label.
    pub time: String,
    #[serde(flatten)]
    pub legs: DetailLegs,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetailLegs {
    pub ce_short_buildup: f64,
    pub ce_long_buildup: f64,
    pub ce_short_covering: f64,
    pub ce_long_unwinding: f64,
    pub pe_short_buildup: f64,
    pub pe_long_buildup: f64,
    pub pe_short_covering: f64,
    pub pe_long_unwinding: f64,
}

/// Shift a raw backend sample time back 5h30m and format it as an IST
/// `HH:MM` label, aligning the first market sample to 09:15.
pub fn ist_label(raw: &str) -> Result<String> {
    // Sample times arrive either as HH:MM:SS or with a colon-separated
    // millisecond field.
    let time = NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S:%3f"))
        .map_err(|_| AppError::Payload(format!("bad sample time {:?}", raw)))?;

    let utc = NaiveDate::from_ymd_opt(1970, 1, 1)
        .unwrap()
        .and_time(time)
        .and_utc()
        - TimeDelta::minutes(330);

    Ok(utc.with_timezone(&Kolkata).format("%H:%M").to_string())
}

/// Parse one stock's series out of the `getOIBuildUp` payload.
pub fn detail_points(token: &str, payload: &PackedBuildupMap) -> Result<Vec<DetailPoint>> {
    let samples = payload
        .get(token)
        .ok_or_else(|| AppError::NotFound(format!("no OI detail for {}", token)))?;

    samples
        .iter()
        .map(|sample| {
            let ce = PackedLegs::parse(&sample.ce)?;
            let pe = PackedLegs::parse(&sample.pe)?;
            Ok(DetailPoint {
                time: ist_label(&sample.time)?,
                legs: DetailLegs {
                    ce_short_buildup: ce.short_buildup,
                    ce_long_buildup: ce.long_buildup,
                    ce_short_covering: ce.short_covering,
                    ce_long_unwinding: ce.long_unwinding,
                    pe_short_buildup: pe.short_buildup,
                    pe_long_buildup: pe.long_buildup,
                    pe_short_covering: pe.short_covering,
                    pe_long_unwinding: pe.long_unwinding,
                },
            })
        })
        .collect()
}

/// On-demand detail loader with a per-stock cache of the last parsed
/// series, so re-selecting a stock shows data immediately while a fresh
/// fetch runs.
pub struct StockDetailScreen {
    feed: Arc<dyn SentimentFeed>,
    cache: DashMap<String, Vec<DetailPoint>>,
}

impl StockDetailScreen {
    pub fn new(feed: Arc<dyn SentimentFeed>) -> Self {
        Self {
            feed,
            cache: DashMap::new(),
        }
    }

    /// Fetch and parse the detail series for one stock token.
    pub async fn load(&self, token: &str) -> Result<Vec<DetailPoint>> {
        info!("StockDetailScreen::load - {}", token);

        let payload = self.feed.oi_buildup(token).await?;
        let points = detail_points(token, &payload)?;
        self.cache.insert(token.to_string(), points.clone());
        Ok(points)
    }

    /// Last successfully parsed series for a stock, if any.
    pub fn cached(&self, token: &str) -> Option<Vec<DetailPoint>> {
        self.cache.get(token).map(|entry| entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ist_label_aligns_market_open() {
        // The backend's 09:15 sample comes over the wire as 09:15:00;
        // shifted back 5h30 and rendered in IST it stays 09:15.
        assert_eq!(ist_label("09:15:00").unwrap(), "09:15");
        assert_eq!(ist_label("15:30:00").unwrap(), "15:30");
        assert_eq!(ist_label("10:05:30:250").unwrap(), "10:05");
    }

    #[test]
    fn test_ist_label_rejects_garbage() {
        assert!(ist_label("not-a-time").is_err());
        assert!(ist_label("").is_err());
    }

    #[test]
    fn test_detail_points_parse_packed_fields() {
        let payload: PackedBuildupMap = serde_json::from_value(json!({
            "RELIANCE": [
                { "time": "09:15:00", "CE": "1.0,2.0,3.0,4.0", "PE": "5.0,6.0,7.0,8.0" }
            ]
        }))
        .unwrap();

        let points = detail_points("RELIANCE", &payload).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].time, "09:15");
        assert_eq!(points[0].legs.ce_short_buildup, 1.0);
        assert_eq!(points[0].legs.ce_long_unwinding, 4.0);
        assert_eq!(points[0].legs.pe_short_buildup, 5.0);
        assert_eq!(points[0].legs.pe_long_unwinding, 8.0);
    }

    #[test]
    fn test_detail_points_unknown_token() {
        let payload = PackedBuildupMap::new();
        assert!(matches!(
            detail_points("TCS", &payload),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_detail_points_bad_packing() {
        let payload: PackedBuildupMap = serde_json::from_value(json!({
            "TCS": [
                { "time": "09:15:00", "CE": "1.0,2.0", "PE": "5.0,6.0,7.0,8.0" }
            ]
        }))
        .unwrap();

        assert!(matches!(
            detail_points("TCS", &payload),
            Err(AppError::Payload(_))
        ));
    }
}
