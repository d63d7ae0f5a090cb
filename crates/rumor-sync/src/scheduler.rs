//! Periodic anti-entropy.
//!
//! Every interval the node sends its current summary vector to each known
//! peer. Peers answer by pushing whatever the summary shows is missing, so
//! a round needs no reply handling here.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use rumor_core::Endpoint;
use rumor_store::Store;

use crate::error::{Result, SyncError};
use crate::messages::WantMessage;
use crate::reconcile::ReconciliationEngine;
use crate::registry::PeerRegistry;
use crate::transport::Transport;

/// Default time between rounds.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Outcome of a single round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundReport {
    /// Peers targeted this round.
    pub peers: usize,
    /// Want messages the peer accepted.
    pub sent: usize,
    /// Want messages that failed.
    pub failed: usize,
}

/// Drives anti-entropy rounds for one node.
pub struct AntiEntropyScheduler<S: Store, T: Transport> {
    engine: ReconciliationEngine<S>,
    registry: PeerRegistry<S>,
    transport: T,
    self_endpoint: Endpoint,
    interval: Duration,
    send_timeout: Duration,
}

impl<S: Store, T: Transport> AntiEntropyScheduler<S, T> {
    pub fn new(
        engine: ReconciliationEngine<S>,
        registry: PeerRegistry<S>,
        transport: T,
        self_endpoint: Endpoint,
        interval: Duration,
        send_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            registry,
            transport,
            self_endpoint,
            interval,
            send_timeout,
        }
    }

    /// Run one round now.
    ///
    /// The summary is built once and sent to every peer in turn. A failed
    /// send is logged and the round continues. Only a store failure aborts.
    pub async fn run_round(&self) -> Result<RoundReport> {
        let peers = self.registry.list_peer_endpoints().await?;
        let mut report = RoundReport::default();

        if peers.is_empty() {
            tracing::debug!("anti-entropy round: no peers");
            return Ok(report);
        }

        let want = self.engine.build_local_summary().await?;

        for peer in peers {
            if peer == self.self_endpoint {
                continue;
            }
            report.peers += 1;

            let message = WantMessage {
                want: want.clone(),
                reply_endpoint: self.self_endpoint.clone(),
            };

            let outcome =
                match tokio::time::timeout(self.send_timeout, self.transport.send(&peer, message.into()))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(SyncError::Timeout(format!("want to {}", peer))),
                };

            match outcome {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(peer = %peer, error = %e, "failed to send want");
                }
            }
        }

        tracing::info!(
            peers = report.peers,
            sent = report.sent,
            failed = report.failed,
            streams = want.len(),
            "anti-entropy round complete"
        );
        Ok(report)
    }

    /// Run rounds every interval until `shutdown` flips to true.
    ///
    /// The first round fires one full interval after start. A round that
    /// overruns delays the next tick instead of bunching them.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_secs = self.interval.as_secs(), "anti-entropy scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_round().await {
                        tracing::error!(error = %e, "anti-entropy round failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("anti-entropy scheduler stopped");
    }
}
