//! One evaluation task per active rule.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use seawatch_core::{Alert, VesselEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::cycle::Ticket;
use super::EngineError;
use crate::context::EvalContext;
use crate::schema::{CombineLogic, Rule};
use crate::state::RuleState;

/// An event on its way to one worker.
pub(crate) struct WorkItem {
    pub(crate) event: Arc<VesselEvent>,
    pub(crate) ticket: Ticket,
}

/// Engine-side handle to a running worker.
pub(crate) struct WorkerHandle {
    tx: mpsc::UnboundedSender<WorkItem>,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    pub(crate) fn spawn(
        rule: Arc<Rule>,
        state: Arc<Mutex<RuleState>>,
        ctx: Arc<EvalContext>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let join = tokio::spawn(run(rule, state, ctx, rx, cancel.clone()));
        Self { tx, cancel, join }
    }

    /// Queue an event. A worker that has exited hands the item back.
    pub(crate) fn send(&self, item: WorkItem) -> Result<(), WorkItem> {
        self.tx.send(item).map_err(|e| e.0)
    }

    /// Cancel the worker and wait up to `limit` for it to exit.
    ///
    /// Queued events are dropped, which acknowledges their tickets. A worker
    /// still running after `limit` is aborted.
    pub(crate) async fn stop(self, rule_id: &str, limit: Duration) {
        let WorkerHandle { tx, cancel, mut join } = self;
        cancel.cancel();
        drop(tx);

        match tokio::time::timeout(limit, &mut join).await {
            Ok(Ok(())) => debug!(rule_id = %rule_id, "worker stopped"),
            Ok(Err(e)) => warn!(rule_id = %rule_id, error = %e, "worker task failed"),
            Err(_) => {
                warn!(rule_id = %rule_id, timeout = ?limit, "worker did not stop in time, aborting");
                join.abort();
            }
        }
    }
}

async fn run(
    rule: Arc<Rule>,
    state: Arc<Mutex<RuleState>>,
    ctx: Arc<EvalContext>,
    mut rx: mpsc::UnboundedReceiver<WorkItem>,
    cancel: CancellationToken,
) {
    debug!(rule_id = %rule.id, "worker started");

    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = rx.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        // Evaluation and the state lock stay on the blocking pool.
        let outcome = {
            let rule = Arc::clone(&rule);
            let state = Arc::clone(&state);
            let ctx = Arc::clone(&ctx);
            let event = Arc::clone(&item.event);
            tokio::task::spawn_blocking(move || {
                let mut state = match state.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                evaluate_rule(&rule, &event, &mut state, &ctx)
            })
            .await
        };

        match outcome {
            Ok(Ok(true)) => {
                debug!(rule_id = %rule.id, vessel = %item.event.vessel_id, "rule matched");
                item.ticket.push(alert_for(&rule, &item.event));
            }
            Ok(Ok(false)) => {}
            Ok(Err(e @ EngineError::UnsupportedCombineLogic(_))) => {
                error!(rule_id = %rule.id, error = %e, "worker terminated");
                break;
            }
            Ok(Err(e)) => {
                warn!(
                    rule_id = %rule.id,
                    event_id = %item.event.id,
                    error = %e,
                    "evaluation failed, skipping event"
                );
            }
            Err(e) => {
                error!(
                    rule_id = %rule.id,
                    event_id = %item.event.id,
                    error = %e,
                    "evaluation task failed, skipping event"
                );
            }
        }
    }

    // Remaining queued items drop with `rx`, acknowledging their tickets.
    rx.close();
    debug!(rule_id = %rule.id, "worker exited");
}

/// Combine a rule's conditions for one event.
///
/// A rule without conditions never matches. Evaluation short-circuits in
/// condition order.
pub(crate) fn evaluate_rule(
    rule: &Rule,
    event: &Arc<VesselEvent>,
    state: &mut RuleState,
    ctx: &EvalContext,
) -> Result<bool, EngineError> {
    if rule.conditions.is_empty() {
        return Ok(false);
    }

    match &rule.combine_logic {
        CombineLogic::And => {
            for condition in &rule.conditions {
                if !condition.evaluate(event, state, ctx)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        CombineLogic::Or => {
            for condition in &rule.conditions {
                if condition.evaluate(event, state, ctx)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        CombineLogic::Unsupported(raw) => Err(EngineError::UnsupportedCombineLogic(raw.clone())),
    }
}

fn alert_for(rule: &Rule, event: &VesselEvent) -> Alert {
    Alert {
        id: Uuid::new_v4(),
        rule_id: rule.id.clone(),
        alert_type: rule.action.alert_type.clone(),
        severity: rule.action.severity.clone(),
        entity_id: event.vessel_id.clone(),
        event_id: event.id.clone(),
        timestamp: Utc::now(),
        notify: rule.action.notify.clone(),
    }
}
