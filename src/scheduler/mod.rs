//! Scheduler module
//!
//! One poll session per screen: an immediate fetch on start, a repeating
//! timer after that, and a latest-snapshot cell published over a watch
//! channel.

mod poll_session;

pub use poll_session::{Fetcher, PollConfig, PollSession, Snapshot};
