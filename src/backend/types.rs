//! Wire types for the sentiment backend
//!
//! Field names mirror the backend JSON exactly, including its inconsistent
//! casing (`CE_LongBuildup` vs `PE_LongBuildUp`). Several endpoints pack four
//! floats into a single comma-separated string field; see [`PackedLegs`].

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One time-series sample of a stock's OI buildup figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildupSample {
    pub ltp: f64,
    pub time: String,
    #[serde(rename = "CE_ShortBuildup")]
    pub ce_short_buildup: f64,
    #[serde(rename = "CE_LongBuildup")]
    pub ce_long_buildup: f64,
    #[serde(rename = "CE_ShortCovering")]
    pub ce_short_covering: f64,
    #[serde(rename = "CE_LongUnwinding")]
    pub ce_long_unwinding: f64,
    #[serde(rename = "PE_ShortBuildUp")]
    pub pe_short_buildup: f64,
    #[serde(rename = "PE_LongBuildUp")]
    pub pe_long_buildup: f64,
    #[serde(rename = "PE_ShortCovering")]
    pub pe_short_covering: f64,
    #[serde(rename = "PE_LongUnwinding")]
    pub pe_long_unwinding: f64,
}

/// Per-stock OI buildup series from `getBullishOIData` / `getBearishOIData`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildupSeries {
    pub count: i64,
    pub active: bool,
    #[serde(rename = "timeAndPrice")]
    pub time_and_price: Vec<BuildupSample>,
}

pub type BuildupMap = BTreeMap<String, BuildupSeries>;

/// One sample of the ML-classified buildup stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlSample {
    pub added_time: String,
    pub removed_time: Option<String>,
}

/// Per-stock series from the `:8092/bullish` and `:8092/bearish` services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlSeries {
    pub counter: i64,
    pub active: bool,
    pub times: Vec<MlSample>,
}

pub type MlBuildupMap = BTreeMap<String, MlSeries>;

/// One strike of the option chain snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainStrike {
    pub strike_price: f64,
    pub calls_builtup: String,
    pub puts_builtup: String,
    pub calls_oi: f64,
    pub puts_oi: f64,
}

pub type OptionChainMap = BTreeMap<String, Vec<ChainStrike>>;

/// One per-(index, option type) entry from `optionGreekDiff`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreekDiffEntry {
    pub index: String,
    #[serde(rename = "optionType")]
    pub option_type: OptionType,
    pub delta: f64,
    pub theta: f64,
    pub vega: f64,
}

/// Stock -> classification label -> value, from `OIBullishStocks`.
pub type StockRankingMap = BTreeMap<String, BTreeMap<String, f64>>;

/// One sample of the per-index Greek time series from `getChartData`.
///
/// The backend keys these columns with embedded spaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreekSample {
    pub time: String,
    #[serde(rename = "CE delta")]
    pub ce_delta: f64,
    #[serde(rename = "PE delta")]
    pub pe_delta: f64,
    #[serde(rename = "CE vega")]
    pub ce_vega: f64,
    #[serde(rename = "PE vega")]
    pub pe_vega: f64,
    #[serde(rename = "CE theta")]
    pub ce_theta: f64,
    #[serde(rename = "PE theta")]
    pub pe_theta: f64,
    #[serde(rename = "CE gamma")]
    pub ce_gamma: f64,
    #[serde(rename = "PE gamma")]
    pub pe_gamma: f64,
}

/// One comma-packed sample from `getOIBuildUp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackedSample {
    pub time: String,
    #[serde(rename = "CE")]
    pub ce: String,
    #[serde(rename = "PE")]
    pub pe: String,
}

pub type PackedBuildupMap = BTreeMap<String, Vec<PackedSample>>;

/// Market breadth counts from `getOIAdvanceDecline`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceDecline {
    #[serde(rename = "Advance")]
    pub advance: i64,
    #[serde(rename = "Decline")]
    pub decline: i64,
}

/// Index/sector series payload: one map per point in time, keyed by label,
/// plus a `time` key. The label set is open-ended, so this stays dynamic.
pub type LabelledSeries = Vec<serde_json::Map<String, serde_json::Value>>;

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionType {
    #[serde(rename = "CE")]
    Ce,
    #[serde(rename = "PE")]
    Pe,
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionType::Ce => write!(f, "CE"),
            OptionType::Pe => write!(f, "PE"),
        }
    }
}

/// The four buildup figures packed into a `CE`/`PE` field, in wire order:
/// short buildup, long buildup, short covering, long unwinding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackedLegs {
    pub short_buildup: f64,
    pub long_buildup: f64,
    pub short_covering: f64,
    pub long_unwinding: f64,
}

impl PackedLegs {
    /// Parse a comma-packed field such as `"1.0,2.0,3.0,4.0"`.
    pub fn parse(field: &str) -> Result<Self> {
        let values = field
            .split(',')
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .map_err(|_| AppError::Payload(format!("bad packed float: {:?}", v)))
            })
            .collect::<Result<Vec<f64>>>()?;

        match values.as_slice() {
            [sb, lb, sc, lu] => Ok(Self {
                short_buildup: *sb,
                long_buildup: *lb,
                short_covering: *sc,
                long_unwinding: *lu,
            }),
            _ => Err(AppError::Payload(format!(
                "expected 4 packed values, got {}",
                values.len()
            ))),
        }
    }
}
