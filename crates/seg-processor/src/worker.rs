//! Upsert workers
//!
//! Each worker pulls records until the dispatch queue is closed and drained, or
//! until it sees cancellation before its next pull. Store failures are counted and
//! logged; the record is not retried.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::counters::Counters;
use crate::dispatch::DispatchReceiver;
use crate::record::{Record, UpsertOutcome};
use crate::store::{SegmentationStore, StoreError};

pub struct Worker<S: ?Sized> {
    id: usize,
    store: Arc<S>,
    counters: Arc<Counters>,
    queue: DispatchReceiver,
    cancel: CancellationToken,
}

impl<S> Worker<S>
where
    S: SegmentationStore + ?Sized + 'static,
{
    pub fn new(
        id: usize,
        store: Arc<S>,
        counters: Arc<Counters>,
        queue: DispatchReceiver,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            store,
            counters,
            queue,
            cancel,
        }
    }

    /// Consume records until the queue is exhausted or the run is cancelled
    ///
    /// Returns the number of records this worker took to the store.
    pub async fn run(self) -> u64 {
        let mut handled = 0;

        loop {
            if self.cancel.is_cancelled() {
                debug!(worker = self.id, handled, "worker observed cancellation");
                break;
            }

            let Some(record) = self.queue.pull().await else {
                break;
            };

            self.process(&record).await;
            handled += 1;
        }

        handled
    }

    async fn process(&self, record: &Record) {
        match self.store.upsert(record).await {
            Ok(outcome) => {
                match outcome {
                    UpsertOutcome::Inserted => self.counters.record_inserted(),
                    UpsertOutcome::Updated => self.counters.record_updated(),
                    UpsertOutcome::NoOp => self.counters.record_duplicate(),
                }
                info!("{}", outcome_line(self.id, record, outcome));
            }
            Err(err) => {
                self.counters.record_failed();
                warn!("{}", error_line(self.id, record, &err));
            }
        }
    }
}

/// `upsert_inserted|upsert_updated|upsert_noop worker= user_id= seg_type= seg_name=`
pub fn outcome_line(worker: usize, record: &Record, outcome: UpsertOutcome) -> String {
    format!(
        "{} worker={} user_id={} seg_type={} seg_name={}",
        outcome.event(),
        worker,
        record.subject_id(),
        record.category(),
        record.name()
    )
}

pub fn error_line(worker: usize, record: &Record, err: &StoreError) -> String {
    format!(
        "upsert_error worker={} user_id={} seg_type={} seg_name={} err={}",
        worker,
        record.subject_id(),
        record.category(),
        record.name(),
        err
    )
}
