//! Bounded FIFO hand-off between the reader and the worker pool
//!
//! A full queue suspends the producer, which is what couples read speed to
//! store throughput. The pool shares one receiver; a worker holds the lock only
//! while it waits for its next record, so each record goes to exactly one worker.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::record::Record;

/// Create a queue holding at most `capacity` records
///
/// # Panics
/// If `capacity` is zero.
pub fn dispatch_queue(capacity: usize) -> (DispatchSender, DispatchReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        DispatchSender { tx },
        DispatchReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer side; dropping it (or calling [`close`](Self::close)) ends the input
#[derive(Debug)]
pub struct DispatchSender {
    tx: mpsc::Sender<Record>,
}

impl DispatchSender {
    /// Hand a record to the pool, waiting while the queue is full
    ///
    /// Gives the record back if every receiver is gone.
    pub async fn send(&self, record: Record) -> Result<(), Record> {
        self.tx.send(record).await.map_err(|err| err.0)
    }

    /// Signal "no more input"; records already queued are still delivered
    pub fn close(self) {
        drop(self.tx);
    }
}

/// Consumer side, cloned into every worker
#[derive(Debug, Clone)]
pub struct DispatchReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Record>>>,
}

impl DispatchReceiver {
    /// Next record, or `None` once the queue is closed and drained
    pub async fn pull(&self) -> Option<Record> {
        self.rx.lock().await.recv().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(id: u64) -> Record {
        Record::new(id, "drug".into(), format!("n{id}"), b"{}".to_vec())
    }

    #[tokio::test]
    async fn test_fifo_then_closed() {
        let (tx, rx) = dispatch_queue(4);
        for id in 1..=3 {
            tx.send(record(id)).await.unwrap();
        }
        tx.close();

        let mut seen = Vec::new();
        while let Some(r) = rx.pull().await {
            seen.push(r.subject_id());
        }
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_full_queue_blocks_sender() {
        let (tx, rx) = dispatch_queue(1);
        tx.send(record(1)).await.unwrap();

        let blocked = tokio::time::timeout(Duration::from_millis(50), tx.send(record(2))).await;
        assert!(blocked.is_err(), "send into a full queue should wait");

        assert_eq!(rx.pull().await.unwrap().subject_id(), 1);
        tx.send(record(3)).await.unwrap();
        assert_eq!(rx.pull().await.unwrap().subject_id(), 3);
    }

    #[tokio::test]
    async fn test_send_after_receivers_dropped_returns_record() {
        let (tx, rx) = dispatch_queue(2);
        drop(rx);

        let returned = tx.send(record(9)).await.unwrap_err();
        assert_eq!(returned.subject_id(), 9);
    }

    #[tokio::test]
    async fn test_each_record_delivered_once_across_clones() {
        let (tx, rx) = dispatch_queue(8);
        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let rx = rx.clone();
                tokio::spawn(async move {
                    let mut ids = Vec::new();
                    while let Some(r) = rx.pull().await {
                        ids.push(r.subject_id());
                    }
                    ids
                })
            })
            .collect();
        drop(rx);

        for id in 0..200 {
            tx.send(record(id)).await.unwrap();
        }
        tx.close();

        let mut all = Vec::new();
        for consumer in consumers {
            all.extend(consumer.await.unwrap());
        }
        all.sort_unstable();
        assert_eq!(all, (0..200).collect::<Vec<_>>());
    }
}
