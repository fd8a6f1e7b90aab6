//! Periodic statistics polling
//!
//! One background loop over all connected switches. Requests are fired
//! asynchronously and replies arrive later as events; the poller never
//! waits for one switch before polling the next. A slow switch simply
//! misses a cycle instead of queueing requests.

use slice_flow::{CommandSink, SwitchArena, SwitchCommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Default poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Fires one stats request per connected switch each interval.
pub struct StatsPoller {
    arena: Arc<SwitchArena>,
    sink: Arc<dyn CommandSink>,
    interval: Duration,
}

impl StatsPoller {
    /// Poller over the given arena and sink.
    pub fn new(arena: Arc<SwitchArena>, sink: Arc<dyn CommandSink>, interval: Duration) -> Self {
        Self { arena, sink, interval }
    }

    /// Run until the shutdown signal flips to `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        // swallow the immediate first tick so the cadence matches the interval
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.poll_once().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("stats poller stopped");
    }

    /// One polling pass over every connected switch.
    pub async fn poll_once(&self) {
        for dpid in self.arena.connected_datapaths() {
            if let Err(e) = self.sink.send(SwitchCommand::FlowStatsRequest { dpid }).await {
                // transient: the switch gets polled again next cycle
                debug!(dpid, error = %e, "stats request failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slice_flow::RecordingSink;

    #[tokio::test(start_paused = true)]
    async fn test_polls_every_connected_switch() {
        let arena = Arc::new(SwitchArena::new());
        arena.connect(1);
        arena.connect(2);
        arena.connect(3);
        arena.disconnect(3);

        let sink = Arc::new(RecordingSink::new());
        let poller = StatsPoller::new(arena, sink.clone(), Duration::from_secs(5));
        poller.poll_once().await;

        let polled: Vec<u64> = sink.commands().iter().map(|c| c.dpid()).collect();
        assert_eq!(polled.len(), 2);
        assert!(polled.contains(&1) && polled.contains(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_loop() {
        let arena = Arc::new(SwitchArena::new());
        arena.connect(1);
        let sink = Arc::new(RecordingSink::new());
        let (tx, rx) = watch::channel(false);

        let poller = StatsPoller::new(arena, sink.clone(), Duration::from_secs(5));
        let handle = tokio::spawn(poller.run(rx));

        // two ticks elapse, then shutdown
        tokio::time::sleep(Duration::from_secs(11)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(sink.commands().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_does_not_stop_polling() {
        let arena = Arc::new(SwitchArena::new());
        arena.connect(1);
        let sink = Arc::new(RecordingSink::new());
        sink.set_failing(true);

        let poller = StatsPoller::new(arena.clone(), sink.clone(), Duration::from_secs(5));
        poller.poll_once().await;
        assert!(sink.commands().is_empty());

        // retried on the next scheduled cycle
        sink.set_failing(false);
        poller.poll_once().await;
        assert_eq!(sink.commands().len(), 1);
    }
}
