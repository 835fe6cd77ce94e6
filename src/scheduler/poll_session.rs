//! Polling view-model shared by every screen
//!
//! A [`PollSession`] owns exactly one timer. Interval changes are applied
//! inside the driver task itself, so clearing and re-arming the timer is
//! atomic and duplicate timers cannot leak. Fetches run as separate tasks
//! and may overlap; every fetch carries a sequence number and a result is
//! published only if no later-issued fetch has published before it
//! (last-issued wins, never last-resolved). After [`PollSession::stop`],
//! late results are discarded at the publish gate.

use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Screen-specific fetch-and-reshape step of one poll tick.
#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    type Rows: Clone + Send + Sync + 'static;

    async fn fetch(&self) -> Result<Self::Rows>;
}

/// Latest state of one screen's data.
///
/// A failed fetch never erases previously fetched rows; it demotes them to
/// `Stale` with the error attached. `Error` only occurs when the very first
/// fetch fails.
#[derive(Debug, Clone)]
pub enum Snapshot<T> {
    Loading,
    Live {
        rows: T,
        as_of: DateTime<Utc>,
    },
    Stale {
        rows: T,
        as_of: DateTime<Utc>,
        error: String,
    },
    Error {
        error: String,
    },
}

impl<T> Snapshot<T> {
    /// Rows to display, live or stale.
    pub fn rows(&self) -> Option<&T> {
        match self {
            Snapshot::Live { rows, .. } | Snapshot::Stale { rows, .. } => Some(rows),
            Snapshot::Loading | Snapshot::Error { .. } => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Snapshot::Loading)
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Snapshot::Stale { .. })
    }
}

/// Timer configuration with a per-screen minimum interval.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    interval: Duration,
    floor: Duration,
}

impl PollConfig {
    /// A sub-floor initial interval is clamped up to the floor.
    pub fn new(interval: Duration, floor: Duration) -> Self {
        let interval = if interval < floor {
            warn!(
                "poll interval {:?} below floor {:?}, clamping",
                interval, floor
            );
            floor
        } else {
            interval
        };
        Self { interval, floor }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn floor(&self) -> Duration {
        self.floor
    }
}

enum Command {
    Refresh,
    SetInterval(Duration),
    Stop,
}

/// Publish gate shared between the driver task and in-flight fetch tasks.
struct Gate<T> {
    issued: AtomicU64,
    stopped: AtomicBool,
    published: Mutex<u64>,
    tx: watch::Sender<Snapshot<T>>,
}

impl<T: Clone> Gate<T> {
    fn publish(&self, name: &str, seq: u64, result: Result<T>) {
        // The lock covers the seq check and the send together, so two
        // racing results cannot interleave between check and publish.
        let mut published = self.published.lock();

        if self.stopped.load(Ordering::Acquire) {
            debug!("{}: discarding result #{} after stop", name, seq);
            return;
        }
        if seq < *published {
            debug!(
                "{}: discarding superseded result #{} (latest is #{})",
                name, seq, *published
            );
            return;
        }
        *published = seq;

        let next = match result {
            Ok(rows) => Snapshot::Live {
                rows,
                as_of: Utc::now(),
            },
            Err(e) => match &*self.tx.borrow() {
                Snapshot::Live { rows, as_of } | Snapshot::Stale { rows, as_of, .. } => {
                    Snapshot::Stale {
                        rows: rows.clone(),
                        as_of: *as_of,
                        error: e.to_string(),
                    }
                }
                Snapshot::Loading | Snapshot::Error { .. } => Snapshot::Error {
                    error: e.to_string(),
                },
            },
        };

        let _ = self.tx.send(next);
    }
}

/// A running poll session for one screen.
pub struct PollSession<F: Fetcher> {
    name: String,
    floor: Duration,
    interval: Mutex<Duration>,
    gate: Arc<Gate<F::Rows>>,
    cmd: mpsc::UnboundedSender<Command>,
}

impl<F: Fetcher> PollSession<F> {
    /// Start a session: immediate fetch, then a repeating timer.
    pub fn spawn(name: impl Into<String>, config: PollConfig, fetcher: Arc<F>) -> Self {
        let name = name.into();
        let (snapshot_tx, _) = watch::channel(Snapshot::Loading);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let gate = Arc::new(Gate {
            issued: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            published: Mutex::new(0),
            tx: snapshot_tx,
        });

        tokio::spawn(drive(
            name.clone(),
            config.interval,
            Arc::clone(&gate),
            fetcher,
            cmd_rx,
        ));

        info!("{}: poll session started, every {:?}", name, config.interval);

        Self {
            name,
            floor: config.floor,
            interval: Mutex::new(config.interval),
            gate,
            cmd: cmd_tx,
        }
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<F::Rows>> {
        self.gate.tx.subscribe()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Snapshot<F::Rows> {
        self.gate.tx.borrow().clone()
    }

    /// Trigger an out-of-band fetch.
    pub fn refresh(&self) {
        let _ = self.cmd.send(Command::Refresh);
    }

    /// Change the timer interval. A value below the screen's floor is
    /// rejected and the previous interval stays in force.
    pub fn set_interval(&self, interval: Duration) -> Result<()> {
        if interval < self.floor {
            warn!(
                "{}: interval {:?} below floor {:?}, keeping {:?}",
                self.name,
                interval,
                self.floor,
                *self.interval.lock()
            );
            return Err(AppError::Validation(format!(
                "refresh interval must be at least {} seconds",
                self.floor.as_secs()
            )));
        }

        *self.interval.lock() = interval;
        let _ = self.cmd.send(Command::SetInterval(interval));
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        *self.interval.lock()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tear the session down. The timer stops and any in-flight fetch
    /// result is discarded when it eventually resolves.
    pub fn stop(&self) {
        self.gate.stopped.store(true, Ordering::Release);
        let _ = self.cmd.send(Command::Stop);
        info!("{}: poll session stopped", self.name);
    }
}

impl<F: Fetcher> Drop for PollSession<F> {
    fn drop(&mut self) {
        self.gate.stopped.store(true, Ordering::Release);
        let _ = self.cmd.send(Command::Stop);
    }
}

/// Driver task: owns the single timer and issues fetches.
async fn drive<F: Fetcher>(
    name: String,
    mut interval: Duration,
    gate: Arc<Gate<F::Rows>>,
    fetcher: Arc<F>,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
) {
    // First tick of tokio's interval completes immediately, giving the
    // fetch-on-start behavior.
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                issue_fetch(&name, &gate, &fetcher);
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::Refresh) => issue_fetch(&name, &gate, &fetcher),
                    Some(Command::SetInterval(next)) => {
                        interval = next;
                        // Re-arm without an immediate extra tick.
                        ticker = tokio::time::interval_at(
                            tokio::time::Instant::now() + interval,
                            interval,
                        );
                        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                        debug!("{}: timer re-armed at {:?}", name, interval);
                    }
                    Some(Command::Stop) | None => break,
                }
            }
        }
    }
}

fn issue_fetch<F: Fetcher>(name: &str, gate: &Arc<Gate<F::Rows>>, fetcher: &Arc<F>) {
    let seq = gate.issued.fetch_add(1, Ordering::SeqCst) + 1;
    let gate = Arc::clone(gate);
    let fetcher = Arc::clone(fetcher);
    let name = name.to_string();

    tokio::spawn(async move {
        debug!("{}: fetch #{} issued", name, seq);
        let result = fetcher.fetch().await;
        if let Err(e) = &result {
            warn!("{}: fetch #{} failed: {}", name, seq, e);
        }
        gate.publish(&name, seq, result);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns the call number; the first call resolves much slower than
    /// the rest.
    struct SlowFirstFetcher {
        calls: AtomicU64,
    }

    #[async_trait]
    impl Fetcher for SlowFirstFetcher {
        type Rows = u64;

        async fn fetch(&self) -> Result<u64> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let delay = if call == 1 {
                Duration::from_secs(30)
            } else {
                Duration::from_secs(1)
            };
            tokio::time::sleep(delay).await;
            Ok(call)
        }
    }

    struct NeverResolves;

    #[async_trait]
    impl Fetcher for NeverResolves {
        type Rows = u64;

        async fn fetch(&self) -> Result<u64> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(0)
        }
    }

    struct FailsOnce {
        calls: AtomicU64,
    }

    #[async_trait]
    impl Fetcher for FailsOnce {
        type Rows = u64;

        async fn fetch(&self) -> Result<u64> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == 2 {
                Err(AppError::Backend("boom".to_string()))
            } else {
                Ok(call)
            }
        }
    }

    fn config() -> PollConfig {
        PollConfig::new(Duration::from_secs(60), Duration::from_secs(10))
    }

    #[test]
    fn test_config_clamps_to_floor() {
        let cfg = PollConfig::new(Duration::from_secs(3), Duration::from_secs(10));
        assert_eq!(cfg.interval(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sub_floor_interval_keeps_previous() {
        let session = PollSession::spawn(
            "test",
            config(),
            Arc::new(SlowFirstFetcher {
                calls: AtomicU64::new(0),
            }),
        );

        assert!(session.set_interval(Duration::from_secs(5)).is_err());
        assert_eq!(session.interval(), Duration::from_secs(60));

        session.set_interval(Duration::from_secs(15)).unwrap();
        assert_eq!(session.interval(), Duration::from_secs(15));
        session.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_issued_wins() {
        let session = PollSession::spawn(
            "test",
            config(),
            Arc::new(SlowFirstFetcher {
                calls: AtomicU64::new(0),
            }),
        );
        let mut rx = session.subscribe();

        // Fetch #1 (the startup tick) is in flight and slow; a manual
        // refresh issues fetch #2 which resolves first.
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.refresh();

        rx.changed().await.unwrap();
        match &*rx.borrow() {
            Snapshot::Live { rows, .. } => assert_eq!(*rows, 2),
            other => panic!("expected Live, got {:?}", other),
        }

        // Let the slow fetch #1 resolve; its result must be discarded.
        tokio::time::sleep(Duration::from_secs(35)).await;
        let snap = session.snapshot();
        assert_eq!(snap.rows(), Some(&2));
        session.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_publish_after_stop() {
        let session = PollSession::spawn("test", config(), Arc::new(NeverResolves));
        let rx = session.subscribe();

        tokio::time::sleep(Duration::from_millis(10)).await;
        session.stop();

        // The in-flight fetch resolves long after stop.
        tokio::time::sleep(Duration::from_secs(7200)).await;
        assert!(rx.borrow().is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_keeps_last_rows_as_stale() {
        let session = PollSession::spawn(
            "test",
            config(),
            Arc::new(FailsOnce {
                calls: AtomicU64::new(0),
            }),
        );
        let mut rx = session.subscribe();

        rx.changed().await.unwrap();
        assert!(matches!(&*rx.borrow(), Snapshot::Live { rows: 1, .. }));

        // Next timer tick fails; previous rows survive, marked stale.
        tokio::time::sleep(Duration::from_secs(61)).await;
        match &*rx.borrow() {
            Snapshot::Stale { rows, error, .. } => {
                assert_eq!(*rows, 1);
                assert!(error.contains("boom"));
            }
            other => panic!("expected Stale, got {:?}", other),
        }

        // The tick after that succeeds again.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(matches!(&*rx.borrow(), Snapshot::Live { rows: 3, .. }));
        session.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_failure_is_error_not_loading() {
        struct AlwaysFails;

        #[async_trait]
        impl Fetcher for AlwaysFails {
            type Rows = u64;

            async fn fetch(&self) -> Result<u64> {
                Err(AppError::Backend("down".to_string()))
            }
        }

        let session = PollSession::spawn("test", config(), Arc::new(AlwaysFails));
        let mut rx = session.subscribe();

        rx.changed().await.unwrap();
        assert!(matches!(&*rx.borrow(), Snapshot::Error { .. }));
        session.stop();
    }
}
