//! Outbound delivery pipeline.
//!
//! Decouples computing a delta from pushing it. Inbound handlers enqueue a
//! batch and return immediately; a single worker drains the queue, sending
//! one record message per record. A failed send is logged and the worker
//! moves on to the next record.
//!
//! The queue is bounded. `submit` waits for room, `try_submit` refuses with
//! [`SyncError::PipelineFull`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Notify};

use rumor_core::{Endpoint, Record};

use crate::error::{Result, SyncError};
use crate::messages::RecordMessage;
use crate::transport::Transport;

/// Default number of batches the queue holds before back-pressure.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Records destined for one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryBatch {
    pub destination: Endpoint,
    pub records: Vec<Record>,
}

impl DeliveryBatch {
    pub fn new(destination: Endpoint, records: Vec<Record>) -> Self {
        Self {
            destination,
            records,
        }
    }
}

/// Totals reported by a worker when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Batches taken off the queue.
    pub batches: usize,
    /// Record messages the destination accepted.
    pub sent: usize,
    /// Record messages that failed or timed out.
    pub failed: usize,
}

struct PipelineState {
    pending: AtomicUsize,
    idle: Notify,
}

impl PipelineState {
    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Marks one batch finished when dropped, so a batch counts as done even if
/// the worker is cancelled mid-send.
struct Finished(Arc<PipelineState>);

impl Drop for Finished {
    fn drop(&mut self) {
        self.0.finish_one();
    }
}

/// Producer side of the pipeline. Cheap to clone.
#[derive(Clone)]
pub struct DeliveryHandle {
    tx: mpsc::Sender<DeliveryBatch>,
    state: Arc<PipelineState>,
}

impl DeliveryHandle {
    /// Enqueue a batch, waiting while the queue is full.
    pub async fn submit(&self, batch: DeliveryBatch) -> Result<()> {
        self.state.pending.fetch_add(1, Ordering::AcqRel);
        if self.tx.send(batch).await.is_err() {
            self.state.finish_one();
            return Err(SyncError::PipelineClosed);
        }
        Ok(())
    }

    /// Enqueue a batch without waiting.
    pub fn try_submit(&self, batch: DeliveryBatch) -> Result<()> {
        self.state.pending.fetch_add(1, Ordering::AcqRel);
        match self.tx.try_send(batch) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.state.finish_one();
                match e {
                    mpsc::error::TrySendError::Full(_) => Err(SyncError::PipelineFull),
                    mpsc::error::TrySendError::Closed(_) => Err(SyncError::PipelineClosed),
                }
            }
        }
    }

    /// Batches submitted but not yet fully delivered.
    pub fn pending(&self) -> usize {
        self.state.pending.load(Ordering::Acquire)
    }

    /// Wait until every submitted batch has been processed, or dropped
    /// along with a cancelled worker.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.state.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Constructor for the producer/consumer pair.
pub struct DeliveryPipeline;

impl DeliveryPipeline {
    /// Build a pipeline. `reply_endpoint` is stamped on every outgoing
    /// record; each send is bounded by `send_timeout`.
    pub fn new<T: Transport>(
        transport: T,
        reply_endpoint: Endpoint,
        capacity: usize,
        send_timeout: Duration,
    ) -> (DeliveryHandle, DeliveryWorker<T>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let state = Arc::new(PipelineState {
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
        });

        let handle = DeliveryHandle {
            tx,
            state: Arc::clone(&state),
        };
        let worker = DeliveryWorker {
            rx,
            state,
            transport,
            reply_endpoint,
            send_timeout,
            stats: DeliveryStats::default(),
        };
        (handle, worker)
    }
}

/// Consumer side of the pipeline.
pub struct DeliveryWorker<T: Transport> {
    rx: mpsc::Receiver<DeliveryBatch>,
    state: Arc<PipelineState>,
    transport: T,
    reply_endpoint: Endpoint,
    send_timeout: Duration,
    stats: DeliveryStats,
}

impl<T: Transport> DeliveryWorker<T> {
    /// Process batches until every handle is dropped.
    pub async fn run(mut self) -> DeliveryStats {
        while let Some(batch) = self.rx.recv().await {
            self.deliver(batch).await;
        }
        self.stats
    }

    /// Process batches until `shutdown` flips to true, then drain whatever
    /// was already queued and stop.
    pub async fn run_until_shutdown(mut self, mut shutdown: watch::Receiver<bool>) -> DeliveryStats {
        loop {
            tokio::select! {
                batch = self.rx.recv() => match batch {
                    Some(batch) => self.deliver(batch).await,
                    None => return self.stats,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.rx.close();
        let mut drained = 0;
        while let Some(batch) = self.rx.recv().await {
            self.deliver(batch).await;
            drained += 1;
        }
        tracing::debug!(drained, "delivery worker stopped");
        self.stats
    }

    async fn deliver(&mut self, batch: DeliveryBatch) {
        let _finished = Finished(Arc::clone(&self.state));
        let DeliveryBatch {
            destination,
            records,
        } = batch;
        let total = records.len();
        let mut sent = 0;

        for record in records {
            let label = record.label();
            let message = RecordMessage::new(record, self.reply_endpoint.clone()).into();

            let outcome =
                match tokio::time::timeout(self.send_timeout, self.transport.send(&destination, message))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(SyncError::Timeout(format!("sending {} to {}", label, destination))),
                };

            match outcome {
                Ok(()) => sent += 1,
                Err(e) => {
                    self.stats.failed += 1;
                    tracing::warn!(peer = %destination, record = %label, error = %e, "failed to push record");
                }
            }
        }

        self.stats.batches += 1;
        self.stats.sent += sent;
        tracing::info!(peer = %destination, sent, total, "delivered batch");
    }
}

impl<T: Transport> Drop for DeliveryWorker<T> {
    fn drop(&mut self) {
        self.rx.close();
        let mut abandoned = 0;
        while let Ok(_batch) = self.rx.try_recv() {
            self.state.finish_one();
            abandoned += 1;
        }
        if abandoned > 0 {
            tracing::warn!(abandoned, "delivery worker dropped with batches queued");
        }
    }
}
