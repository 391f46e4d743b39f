//! Per-event completion barrier.
//!
//! One [`Cycle`] is created per `evaluate` call. Every worker the event is
//! broadcast to receives a [`Ticket`]; a ticket acknowledges when dropped, so
//! finishing, failing, terminating, and being torn down all count.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use seawatch_core::Alert;
use tokio::sync::Notify;

pub(crate) struct Cycle {
    pending: AtomicUsize,
    done: Notify,
    alerts: Mutex<Vec<Alert>>,
}

impl Cycle {
    pub(crate) fn new(expected: usize) -> Arc<Self> {
        Arc::new(Self {
            pending: AtomicUsize::new(expected),
            done: Notify::new(),
            alerts: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn ticket(self: &Arc<Self>) -> Ticket {
        Ticket {
            cycle: Arc::clone(self),
        }
    }

    /// Wait until every ticket is acknowledged or `limit` elapses.
    ///
    /// Returns `false` on timeout.
    pub(crate) async fn wait(&self, limit: Duration) -> bool {
        if self.pending.load(Ordering::Acquire) == 0 {
            return true;
        }
        tokio::time::timeout(limit, self.done.notified()).await.is_ok()
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Take the alerts collected so far.
    pub(crate) fn drain(&self) -> Vec<Alert> {
        let mut alerts = match self.alerts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *alerts)
    }
}

/// A worker's obligation to acknowledge one event.
pub(crate) struct Ticket {
    cycle: Arc<Cycle>,
}

impl Ticket {
    pub(crate) fn push(&self, alert: Alert) {
        let mut alerts = match self.cycle.alerts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        alerts.push(alert);
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if self.cycle.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            // `notify_one` stores a permit if `wait` is not polling yet.
            self.cycle.done.notify_one();
        }
    }
}
