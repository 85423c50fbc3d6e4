//! Periodic progress reporting
//!
//! The reporter only reads counter snapshots. It stops when the run finishes or
//! when the run's cancellation token fires, whichever comes first.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::counters::{CounterSnapshot, Counters};

pub struct ProgressReporter {
    counters: Arc<Counters>,
    started: Instant,
    period: Duration,
}

impl ProgressReporter {
    pub fn new(counters: Arc<Counters>, started: Instant, period: Duration) -> Self {
        Self {
            counters,
            started,
            period,
        }
    }

    pub fn spawn(self, finished: CancellationToken, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(finished, cancel))
    }

    pub async fn run(self, finished: CancellationToken, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = finished.cancelled() => return,
                _ = cancel.cancelled() => {
                    info!("processor_context_cancelled");
                    return;
                }
                _ = ticker.tick() => {
                    if let Some(line) = self.render() {
                        info!("{line}");
                    }
                }
            }
        }
    }

    /// Current progress line, or `None` while nothing has been read
    pub fn render(&self) -> Option<String> {
        let snapshot = self.counters.snapshot();
        if snapshot.read == 0 {
            return None;
        }
        Some(progress_line(&snapshot, self.started.elapsed()))
    }
}

pub fn progress_line(s: &CounterSnapshot, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        s.completed() as f64 / secs
    } else {
        0.0
    };

    format!(
        "progress read={} enqueued={} inserted={} updated={} duplicates={} failed={} invalid={} rate={:.1} rec/s elapsed={:.0}s",
        s.read, s.enqueued, s.inserted, s.updated, s.duplicates, s.failed, s.invalid, rate, secs
    )
}

pub fn summary_line(s: &CounterSnapshot, elapsed: Duration) -> String {
    format!(
        "processor_finished read={} enqueued={} inserted={} updated={} duplicates={} failed={} invalid={} elapsed={:?}",
        s.read, s.enqueued, s.inserted, s.updated, s.duplicates, s.failed, s.invalid, elapsed
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line_format() {
        let snapshot = CounterSnapshot {
            read: 10,
            enqueued: 8,
            inserted: 5,
            updated: 2,
            duplicates: 1,
            failed: 0,
            invalid: 2,
        };
        assert_eq!(
            progress_line(&snapshot, Duration::from_secs(4)),
            "progress read=10 enqueued=8 inserted=5 updated=2 duplicates=1 failed=0 invalid=2 rate=2.0 rec/s elapsed=4s"
        );
    }

    #[test]
    fn test_summary_line_format() {
        let snapshot = CounterSnapshot {
            read: 3,
            enqueued: 2,
            inserted: 1,
            updated: 0,
            duplicates: 0,
            failed: 1,
            invalid: 1,
        };
        assert_eq!(
            summary_line(&snapshot, Duration::from_millis(1500)),
            "processor_finished read=3 enqueued=2 inserted=1 updated=0 duplicates=0 failed=1 invalid=1 elapsed=1.5s"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_suppressed_until_first_read() {
        let counters = Arc::new(Counters::new());
        let reporter = ProgressReporter::new(counters.clone(), Instant::now(), Duration::from_secs(2));
        assert!(reporter.render().is_none());

        counters.record_read();
        tokio::time::advance(Duration::from_secs(2)).await;
        let line = reporter.render().unwrap();
        assert!(line.starts_with("progress read=1 "), "{line}");
        assert!(line.ends_with("elapsed=2s"), "{line}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_stops_when_finished() {
        let counters = Arc::new(Counters::new());
        let finished = CancellationToken::new();
        let handle = ProgressReporter::new(counters, Instant::now(), Duration::from_secs(2))
            .spawn(finished.clone(), CancellationToken::new());

        tokio::time::sleep(Duration::from_secs(7)).await;
        assert!(!handle.is_finished());

        finished.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_stops_on_cancellation() {
        let counters = Arc::new(Counters::new());
        let cancel = CancellationToken::new();
        let handle = ProgressReporter::new(counters, Instant::now(), Duration::from_secs(2))
            .spawn(CancellationToken::new(), cancel.clone());

        cancel.cancel();
        handle.await.unwrap();
    }
}
