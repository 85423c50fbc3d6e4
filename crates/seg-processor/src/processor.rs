//! Ingestion run coordinator
//!
//! One producer streams and validates rows into the bounded dispatch queue, a
//! pool of workers upserts them, and a reporter logs progress. The coordinator
//! owns shutdown ordering: close the queue, wait for every worker, stop the
//! reporter, then log the summary.
//!
//! Cancellation is cooperative. Records already buffered when the signal arrives
//! may still be stored by workers that have not yet observed it; workers that do
//! observe it leave the rest of the queue behind. Only setup failures are errors.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ProcessorConfig;
use crate::counters::{CounterSnapshot, Counters};
use crate::dispatch::{dispatch_queue, DispatchSender};
use crate::error::ProcessorError;
use crate::lifecycle::{DrainReason, Lifecycle, LifecycleState};
use crate::progress::{summary_line, ProgressReporter};
use crate::source::SourceReader;
use crate::store::SegmentationStore;
use crate::validate::validate;
use crate::worker::Worker;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Input exhausted and every enqueued record reached the store
    Completed,
    /// Stopped early; counters are partial
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub counters: CounterSnapshot,
    pub elapsed: Duration,
    pub outcome: RunOutcome,
    /// Why the reader stopped
    pub drain_reason: DrainReason,
    pub final_state: LifecycleState,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }
}

pub struct Processor<S: ?Sized> {
    config: ProcessorConfig,
    store: Arc<S>,
}

impl<S> Processor<S>
where
    S: SegmentationStore + ?Sized + 'static,
{
    pub fn new(config: ProcessorConfig, store: Arc<S>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Ingest the configured file into the store
    ///
    /// Fails only when the configuration is invalid or the input cannot be opened or
    /// its header read; nothing has been spawned at that point. Cancellation, invalid
    /// rows and store failures are reported through the returned summary.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunSummary, ProcessorError> {
        self.config.validate()?;
        let path = self
            .config
            .data_file_path
            .as_deref()
            .ok_or_else(|| seg_common::SegError::Config("no input file configured".into()))?;

        let mut source = SourceReader::open(path).await?;

        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let counters = Arc::new(Counters::new());
        let lifecycle = Lifecycle::new();
        let capacity = self.config.queue_capacity();

        info!(
            "processor_started run_id={} path={} workers={} queue_capacity={}",
            run_id,
            path.display(),
            self.config.workers,
            capacity
        );

        let (sender, receiver) = dispatch_queue(capacity);
        let finished = CancellationToken::new();
        let reporter =
            ProgressReporter::new(counters.clone(), started, self.config.progress_interval)
                .spawn(finished.clone(), cancel.clone());

        let workers: Vec<JoinHandle<u64>> = (0..self.config.workers)
            .map(|id| {
                let worker = Worker::new(
                    id,
                    self.store.clone(),
                    counters.clone(),
                    receiver.clone(),
                    cancel.clone(),
                );
                tokio::spawn(worker.run())
            })
            .collect();
        // Workers hold the only receivers, so the queue closes for the producer if they all quit.
        drop(receiver);

        let reason = produce(&mut source, &sender, &counters, &cancel).await;
        sender.close();
        lifecycle.begin_draining(reason);

        for (id, joined) in join_all(workers).await.into_iter().enumerate() {
            match joined {
                Ok(handled) => debug!(worker = id, handled, "worker exited"),
                Err(e) => error!("worker_panicked worker={} err={}", id, e),
            }
        }

        lifecycle.finish();
        finished.cancel();
        if let Err(e) = reporter.await {
            error!("reporter_panicked err={}", e);
        }

        let elapsed = started.elapsed();
        let snapshot = counters.snapshot();
        info!("{}", summary_line(&snapshot, elapsed));

        let drained = snapshot.consumed() == snapshot.enqueued;
        let outcome = if reason == DrainReason::EndOfInput && drained {
            RunOutcome::Completed
        } else {
            RunOutcome::Cancelled
        };

        Ok(RunSummary {
            run_id,
            counters: snapshot,
            elapsed,
            outcome,
            drain_reason: reason,
            final_state: lifecycle.state(),
        })
    }
}

/// Read, validate and hand off rows until input ends or the run is cancelled
///
/// `enqueued` is counted as the producer commits to a hand-off, so
/// `read == invalid + enqueued` holds after every row.
async fn produce(
    source: &mut SourceReader,
    sender: &DispatchSender,
    counters: &Counters,
    cancel: &CancellationToken,
) -> DrainReason {
    loop {
        if cancel.is_cancelled() {
            info!("producer_context_cancelled");
            return DrainReason::Cancelled;
        }

        let Some(raw) = source.next_row().await else {
            return DrainReason::EndOfInput;
        };
        counters.record_read();

        match validate(&raw.fields) {
            Ok(record) => {
                counters.record_enqueued();
                if sender.send(record).await.is_err() {
                    warn!("dispatch_closed row={}", raw.row);
                    return DrainReason::QueueClosed;
                }
            }
            Err(rejection) => {
                counters.record_invalid();
                warn!("{}", rejection.log_line(raw.row));
            }
        }
    }
}
