//! Event subscription: historical replay plus live delivery.
//!
//! Each event type gets its own bounded queue and worker task, so events
//! of one type are handled as a single logical stream while types run
//! concurrently. A dispatcher task routes envelopes from the chain
//! client's broadcast channel into the queues.
//!
//! States: `Idle -> Listening -> Stopped`. Starting twice without an
//! intervening `stop()` is an error; a stopped subscriber can be started
//! again.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::errors::SyncError;
use crate::domain::models::{EventEnvelope, EventType, SyncConfig};
use crate::domain::ports::ChainClient;

use super::sync_processor::SyncProcessor;

enum SubscriberState {
    Idle,
    Listening(ListenerHandles),
    Stopped,
}

struct ListenerHandles {
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

pub struct EventSubscriber {
    chain: Arc<dyn ChainClient>,
    processor: Arc<SyncProcessor>,
    config: SyncConfig,
    state: Mutex<SubscriberState>,
}

impl EventSubscriber {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        processor: Arc<SyncProcessor>,
        config: SyncConfig,
    ) -> Self {
        Self {
            chain,
            processor,
            config,
            state: Mutex::new(SubscriberState::Idle),
        }
    }

    pub async fn is_listening(&self) -> bool {
        matches!(*self.state.lock().await, SubscriberState::Listening(_))
    }

    /// Move to `Listening`: re-drive unprocessed ledger entries, replay
    /// the historical window if requested, then attach the live queues.
    pub async fn start(&self, from_block: u64, historical: bool) -> Result<(), SyncError> {
        let mut state = self.state.lock().await;
        if matches!(*state, SubscriberState::Listening(_)) {
            return Err(SyncError::AlreadyListening);
        }

        let recovered = self.processor.recover().await?;
        if recovered > 0 {
            info!(count = recovered, "re-drove unprocessed ledger entries");
        }

        // Subscribe before the historical scan: events emitted during
        // replay sit in the broadcast buffer and are deduplicated against
        // the ledger when the dispatcher drains them.
        let events = self.chain.subscribe();

        if historical {
            self.replay_historical(from_block).await?;
        }

        let mut senders: HashMap<EventType, mpsc::Sender<EventEnvelope>> = HashMap::new();
        let mut workers = Vec::with_capacity(EventType::ALL.len());
        for event_type in EventType::ALL {
            let (tx, mut rx) = mpsc::channel::<EventEnvelope>(self.config.queue_capacity);
            let processor = self.processor.clone();
            workers.push(tokio::spawn(async move {
                while let Some(envelope) = rx.recv().await {
                    processor.dispatch(&envelope).await;
                }
            }));
            senders.insert(event_type, tx);
        }

        let dispatcher = tokio::spawn(Self::dispatch_loop(events, senders));

        *state = SubscriberState::Listening(ListenerHandles {
            dispatcher,
            workers,
        });
        info!(from_block, historical, "event subscriber listening");
        Ok(())
    }

    async fn dispatch_loop(
        mut events: broadcast::Receiver<EventEnvelope>,
        senders: HashMap<EventType, mpsc::Sender<EventEnvelope>>,
    ) {
        loop {
            match events.recv().await {
                Ok(envelope) => {
                    let event_type = envelope.event.event_type();
                    if let Some(tx) = senders.get(&event_type) {
                        if tx.send(envelope).await.is_err() {
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    // The ledger's unprocessed set covers the gap on the
                    // next recovery pass.
                    warn!(missed, "live event delivery lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("live event channel closed");
                    break;
                }
            }
        }
    }

    /// Scan `[from_block, latest]` for every event type and dispatch in
    /// ascending block order. The processor's ledger check makes events
    /// already seen live (or in a previous run) no-ops.
    async fn replay_historical(&self, from_block: u64) -> Result<(), SyncError> {
        let latest = self.chain.latest_block().await?;
        if latest < from_block {
            return Ok(());
        }

        let mut batch: Vec<EventEnvelope> = Vec::new();
        for event_type in EventType::ALL {
            batch.extend(
                self.chain
                    .query_events(event_type, from_block, latest)
                    .await?,
            );
        }
        batch.sort_by(|a, b| {
            (a.block_number, a.transaction_hash.as_str())
                .cmp(&(b.block_number, b.transaction_hash.as_str()))
        });

        info!(
            count = batch.len(),
            from_block, latest, "replaying historical events"
        );
        for envelope in &batch {
            self.processor.dispatch(envelope).await;
        }

        Ok(())
    }

    /// Detach live dispatch and drain in-flight handlers, bounded by the
    /// configured drain timeout. Safe to call while handlers are running;
    /// a no-op (with a warning) when not listening.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        let handles = match std::mem::replace(&mut *state, SubscriberState::Stopped) {
            SubscriberState::Listening(handles) => handles,
            previous => {
                *state = previous;
                warn!("event subscriber is not listening");
                return;
            }
        };

        // Aborting the dispatcher drops the queue senders; workers finish
        // whatever is already queued and then exit.
        handles.dispatcher.abort();

        let deadline = Instant::now() + Duration::from_millis(self.config.drain_timeout_ms);
        let mut drained = true;
        for mut worker in handles.workers {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if tokio::time::timeout(remaining, &mut worker).await.is_err() {
                worker.abort();
                drained = false;
            }
        }

        if drained {
            info!("event subscriber stopped");
        } else {
            warn!("shutdown drain timed out, proceeding anyway");
        }
    }
}
