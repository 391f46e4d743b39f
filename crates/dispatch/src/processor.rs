//! [`EventProcessor`]: ordered event intake in front of the rule engine.
//!
//! Events are queued with [`enqueue`](EventProcessor::enqueue) and evaluated
//! one at a time in arrival order. Every alert the engine returns is handed
//! to the [`Dispatcher`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use seawatch_core::VesselEvent;
use seawatch_rules::RuleEngine;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::dispatcher::Dispatcher;
use crate::traits::DispatchError;

/// Counters reported when the processing loop ends.
#[derive(Debug, Default)]
pub struct ProcessorStats {
    pub events: AtomicU64,
    pub alerts: AtomicU64,
    pub failed_deliveries: AtomicU64,
}

impl ProcessorStats {
    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Relaxed)
    }

    pub fn alerts(&self) -> u64 {
        self.alerts.load(Ordering::Relaxed)
    }

    pub fn failed_deliveries(&self) -> u64 {
        self.failed_deliveries.load(Ordering::Relaxed)
    }
}

pub struct EventProcessor {
    engine: Arc<RuleEngine>,
    dispatcher: Arc<Dispatcher>,
    tx: Mutex<Option<mpsc::UnboundedSender<VesselEvent>>>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<VesselEvent>>>,
    stats: Arc<ProcessorStats>,
}

impl EventProcessor {
    pub fn new(engine: Arc<RuleEngine>, dispatcher: Arc<Dispatcher>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            engine,
            dispatcher,
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            stats: Arc::new(ProcessorStats::default()),
        }
    }

    /// Queue an event for evaluation.
    pub fn enqueue(&self, event: VesselEvent) -> Result<(), DispatchError> {
        let tx = lock(&self.tx);
        let Some(tx) = tx.as_ref() else {
            return Err(DispatchError::QueueClosed);
        };
        tx.send(event).map_err(|_| DispatchError::QueueClosed)
    }

    /// Stop accepting events. The loop exits once the queue is drained.
    pub fn close(&self) {
        lock(&self.tx).take();
    }

    pub fn stats(&self) -> Arc<ProcessorStats> {
        Arc::clone(&self.stats)
    }

    /// Spawn the processing loop. Can be called once.
    ///
    /// The loop runs until the token is cancelled or the queue is closed and
    /// drained.
    pub fn start(&self, cancel: CancellationToken) -> Result<JoinHandle<()>, DispatchError> {
        let rx = lock(&self.rx).take().ok_or(DispatchError::AlreadyStarted)?;
        let engine = Arc::clone(&self.engine);
        let dispatcher = Arc::clone(&self.dispatcher);
        let stats = Arc::clone(&self.stats);

        Ok(tokio::spawn(run(rx, engine, dispatcher, stats, cancel)))
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<VesselEvent>,
    engine: Arc<RuleEngine>,
    dispatcher: Arc<Dispatcher>,
    stats: Arc<ProcessorStats>,
    cancel: CancellationToken,
) {
    info!("event processor started");
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        stats.events.fetch_add(1, Ordering::Relaxed);
        let event_id = event.id.clone();
        let alerts = engine.evaluate(event).await;
        debug!(event_id = %event_id, alerts = alerts.len(), "event evaluated");

        for alert in &alerts {
            stats.alerts.fetch_add(1, Ordering::Relaxed);
            let failed = dispatcher
                .dispatch(alert)
                .await
                .iter()
                .filter(|r| !r.success)
                .count();
            stats
                .failed_deliveries
                .fetch_add(failed as u64, Ordering::Relaxed);
        }
    }
    info!(
        events = stats.events(),
        alerts = stats.alerts(),
        failed_deliveries = stats.failed_deliveries(),
        "event processor stopped"
    );
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
