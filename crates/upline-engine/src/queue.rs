//! Background propagation queue.
//!
//! Workflows that must not wait on the ancestor walk submit events here.
//! A single tokio task drains the channel in order and runs each walk on the
//! blocking pool, since store calls are synchronous.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use upline_ledger::{HierarchyStore, ParticipantId};

use crate::engine::Engine;
use crate::event::LifecycleEvent;

#[derive(Debug, Clone)]
struct QueuedEvent {
    participant: ParticipantId,
    event: LifecycleEvent,
}

/// Sender side of the queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct QueueHandle {
    tx: mpsc::UnboundedSender<QueuedEvent>,
}

impl QueueHandle {
    /// Enqueue an event. Returns `false` if the worker has stopped.
    pub fn submit(&self, participant: ParticipantId, event: LifecycleEvent) -> bool {
        let queued = QueuedEvent { participant, event };
        match self.tx.send(queued) {
            Ok(()) => true,
            Err(mpsc::error::SendError(lost)) => {
                warn!(participant = %lost.participant, "propagation queue closed, event dropped");
                false
            }
        }
    }
}

pub struct PropagationQueue;

impl PropagationQueue {
    /// Start the worker. It exits once every handle is dropped and the
    /// queue is drained, yielding the number of walks it ran.
    pub fn spawn<S>(engine: Arc<Engine<S>>) -> (QueueHandle, JoinHandle<u64>)
    where
        S: HierarchyStore + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueuedEvent>();

        let worker = tokio::spawn(async move {
            let mut processed = 0u64;
            while let Some(queued) = rx.recv().await {
                let engine = Arc::clone(&engine);
                let walk = tokio::task::spawn_blocking(move || {
                    engine.apply_event(&queued.participant, &queued.event)
                })
                .await;
                match walk {
                    Ok(report) => {
                        debug!(
                            participant = %report.participant,
                            levels = report.levels_reached(),
                            stop = ?report.stop,
                            "queued event applied"
                        );
                        processed += 1;
                    }
                    Err(e) => error!(error = %e, "propagation task panicked"),
                }
            }
            processed
        });

        (QueueHandle { tx }, worker)
    }
}
