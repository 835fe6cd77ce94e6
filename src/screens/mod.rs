//! Screen view-models
//!
//! One module per dashboard screen. Each owns its reshape step (wire payload
//! to display rows) and its own sentiment/color tables. The tables are
//! intentionally not shared between screens; where two screens read the same
//! figure differently, each screen's mapping is authoritative for itself.

pub mod breadth;
pub mod greek_charts;
pub mod index_sector;
pub mod oi_details;
pub mod option_chain;
pub mod stock_analysis;
pub mod stock_detail;

/// Round a display figure to two decimals, the grid precision every table
/// uses.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
