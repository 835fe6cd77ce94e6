//! OIScope - Options Market Sentiment Dashboard Engine
//!
//! Polls a configurable REST backend for open-interest buildup, option
//! Greek, and market breadth data, reshapes the payloads into display-ready
//! rows, and publishes the latest snapshot per screen over watch channels.

pub mod backend;
pub mod db;
pub mod error;
pub mod scheduler;
pub mod screens;
pub mod state;

use backend::{IndexSymbol, SentimentFeed, SeriesQuery, SeriesScope};
use scheduler::{Fetcher, PollConfig, PollSession, Snapshot};
use state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oiscope=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Run the headless dashboard: one poll session per screen, snapshot
/// transitions logged, sessions stopped on Ctrl-C.
pub async fn run(data_dir: PathBuf, base_url: Option<String>) -> error::Result<()> {
    tracing::info!("Starting OIScope...");

    let state = AppState::new(data_dir)?;
    let backend = state.backend(base_url.as_deref())?;
    tracing::info!("Backend: {}", backend.base_url());
    let feed: Arc<dyn SentimentFeed> = backend;

    let oi_details = PollSession::spawn(
        "oi-details",
        PollConfig::new(
            screens::oi_details::DEFAULT_INTERVAL,
            screens::oi_details::FLOOR,
        ),
        Arc::new(screens::oi_details::OiDetailsFetcher::new(Arc::clone(&feed))),
    );
    watch_and_log(&oi_details, |rows| {
        format!(
            "{} bullish / {} bearish / {} ml rows",
            rows.bullish.len(),
            rows.bearish.len(),
            rows.ml_bullish.len() + rows.ml_bearish.len()
        )
    });

    let greek_diff = PollSession::spawn(
        "greek-diff",
        PollConfig::new(
            screens::stock_analysis::GREEK_DEFAULT_INTERVAL,
            screens::stock_analysis::GREEK_FLOOR,
        ),
        Arc::new(screens::stock_analysis::GreekDiffFetcher::new(Arc::clone(
            &feed,
        ))),
    );
    watch_and_log(&greek_diff, |rows| format!("{} index rows", rows.len()));

    let rankings = PollSession::spawn(
        "stock-rankings",
        PollConfig::new(
            screens::stock_analysis::RANKING_DEFAULT_INTERVAL,
            screens::stock_analysis::RANKING_FLOOR,
        ),
        Arc::new(screens::stock_analysis::StockRankingFetcher::new(
            Arc::clone(&feed),
        )),
    );
    watch_and_log(&rankings, |rows| format!("{} stocks", rows.len()));

    let option_chain = PollSession::spawn(
        "option-chain",
        PollConfig::new(
            screens::option_chain::DEFAULT_INTERVAL,
            screens::option_chain::FLOOR,
        ),
        Arc::new(screens::option_chain::OptionChainFetcher::new(Arc::clone(
            &feed,
        ))),
    );
    watch_and_log(&option_chain, |chain| {
        format!("{} underlyings", chain.len())
    });

    let nifty_greeks = PollSession::spawn(
        "greek-charts-nifty",
        PollConfig::new(
            screens::greek_charts::DEFAULT_INTERVAL,
            screens::greek_charts::FLOOR,
        ),
        Arc::new(screens::greek_charts::GreekChartFetcher::new(
            Arc::clone(&feed),
            IndexSymbol::Nifty50,
        )),
    );
    watch_and_log(&nifty_greeks, |set| {
        format!("{} samples", set.delta.labels.len())
    });

    let index_series = PollSession::spawn(
        "index-series",
        PollConfig::new(
            screens::index_sector::DEFAULT_INTERVAL,
            screens::index_sector::FLOOR,
        ),
        Arc::new(screens::index_sector::IndexSectorFetcher::new(
            Arc::clone(&feed),
            SeriesScope::Index,
            SeriesQuery::default(),
        )),
    );
    watch_and_log(&index_series, |chart| {
        format!("{} series x {} points", chart.series.len(), chart.labels.len())
    });

    let breadth = PollSession::spawn(
        "breadth",
        PollConfig::new(screens::breadth::DEFAULT_INTERVAL, screens::breadth::FLOOR),
        Arc::new(screens::breadth::BreadthFetcher::new(Arc::clone(&feed))),
    );
    watch_and_log(&breadth, |gauge| {
        format!("advance {} / decline {}", gauge.advance, gauge.decline)
    });

    tracing::info!("All poll sessions started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    oi_details.stop();
    greek_diff.stop();
    rankings.stop();
    option_chain.stop();
    nifty_greeks.stop();
    index_series.stop();
    breadth.stop();

    Ok(())
}

/// Log every snapshot transition of a session.
fn watch_and_log<F: Fetcher>(
    session: &PollSession<F>,
    describe: impl Fn(&F::Rows) -> String + Send + 'static,
) {
    let name = session.name().to_string();
    let mut rx = session.subscribe();

    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let line = match &*rx.borrow_and_update() {
                Snapshot::Loading => "loading".to_string(),
                Snapshot::Live { rows, as_of } => {
                    format!("live at {}: {}", as_of.format("%H:%M:%S"), describe(rows))
                }
                Snapshot::Stale { error, as_of, .. } => {
                    format!("stale (last good {}): {}", as_of.format("%H:%M:%S"), error)
                }
                Snapshot::Error { error } => format!("error: {}", error),
            };
            tracing::info!("{}: {}", name, line);
        }
    });
}
