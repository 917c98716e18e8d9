//! Heartbeat monitor
//!
//! A dedicated Tokio task ticks at the configured interval and signals the
//! connection loop, which writes the ping frame to the live socket. Keeping
//! the write on the connection loop means a failed ping surfaces as a
//! connection failure and routes through the reconnect path.
//!
//! The monitor is started on every successful open and stopped on every
//! close or replacement; no ticks fire on a closed connection.

use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Handle to a running heartbeat task
pub(crate) struct HeartbeatHandle {
    ticks: mpsc::Receiver<()>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl HeartbeatHandle {
    /// Wait for the next heartbeat tick
    ///
    /// Returns `None` only after the task has been stopped.
    pub(crate) async fn tick(&mut self) -> Option<()> {
        self.ticks.recv().await
    }

    /// Stop the heartbeat task
    pub(crate) fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Spawn a heartbeat task ticking at `interval`
pub(crate) fn spawn_heartbeat(interval: Duration) -> HeartbeatHandle {
    let (tick_tx, tick_rx) = mpsc::channel(1);
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip the first immediate tick - wait for the first interval
        ticker.tick().await;
        // If we miss ticks due to slow processing, skip them rather than bursting
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        debug!(?interval, "heartbeat task started");

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    debug!("heartbeat task received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    if tick_tx.send(()).await.is_err() {
                        debug!("heartbeat channel closed, stopping heartbeat task");
                        break;
                    }
                }
            }
        }

        debug!("heartbeat task exiting");
    });

    HeartbeatHandle {
        ticks: tick_rx,
        shutdown: Some(shutdown_tx),
    }
}
