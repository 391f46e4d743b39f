//! Concurrent rule engine.
//!
//! One worker task per enabled rule, each fed by its own FIFO queue. The rule
//! topology (rule list, workers, states) sits behind a reader/writer lock:
//! hot updates take the write side, event broadcast takes the read side.
//!
//! ```text
//!  evaluate(event) ──broadcast──▶ worker(rule A) ─┐
//!                  ├────────────▶ worker(rule B) ─┼─▶ Cycle (alerts + barrier)
//!                  └────────────▶ worker(rule C) ─┘          │
//!                                                            ▼
//!                                                  resolve_exclusive ─▶ Vec<Alert>
//! ```

mod cycle;
mod exclusive;
mod worker;

pub use exclusive::resolve_exclusive;

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use seawatch_core::config::EngineConfig;
use seawatch_core::{Alert, VesselEvent};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::conditions::ConditionError;
use crate::context::EvalContext;
use crate::schema::Rule;
use crate::state::RuleState;

use cycle::Cycle;
use worker::{WorkItem, WorkerHandle};

/// Errors raised while evaluating a rule for one event.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Fatal to the rule's worker until the rule is next updated.
    #[error("unsupported combine logic: {0}")]
    UnsupportedCombineLogic(String),

    #[error(transparent)]
    Condition(#[from] ConditionError),
}

// ── Settings ────────────────────────────────────────────────────────

/// Timing knobs for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Upper bound on how long `evaluate` waits for all workers.
    pub settle_timeout: Duration,
    /// Upper bound on joining a stopped worker before aborting it.
    pub join_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for EngineSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            settle_timeout: config.settle_timeout(),
            join_timeout: config.join_timeout(),
        }
    }
}

/// Summary of a hot update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Ids whose content changed; their state was kept.
    pub updated: Vec<String>,
    pub unchanged: usize,
}

impl RuleDiff {
    /// Whether the update changed nothing.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

// ── Engine ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Topology {
    /// Active rules, descending priority.
    rules: Vec<Arc<Rule>>,
    workers: HashMap<String, WorkerHandle>,
    states: HashMap<String, Arc<Mutex<RuleState>>>,
    started: bool,
}

/// Evaluates events against the active rule set.
///
/// Workers start on the first [`evaluate`](RuleEngine::evaluate) call.
/// All operations are safe to call concurrently.
pub struct RuleEngine {
    ctx: Arc<EvalContext>,
    settings: EngineSettings,
    topology: RwLock<Topology>,
}

impl RuleEngine {
    /// Create an engine with no rules.
    pub fn new(ctx: Arc<EvalContext>, settings: EngineSettings) -> Self {
        Self {
            ctx,
            settings,
            topology: RwLock::new(Topology::default()),
        }
    }

    /// Create an engine with an initial rule set. Workers are not started yet.
    pub fn with_rules(ctx: Arc<EvalContext>, settings: EngineSettings, rules: Vec<Rule>) -> Self {
        let mut topology = Topology::default();
        for rule in dedupe(rules) {
            topology
                .states
                .insert(rule.id.clone(), new_state(&rule.id));
            topology.rules.push(rule);
        }
        topology.rules.sort_by_key(|r| Reverse(r.priority));

        Self {
            ctx,
            settings,
            topology: RwLock::new(topology),
        }
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    // ── Hot update ──────────────────────────────────────────────────

    /// Replace the active rule set, diffing by id.
    ///
    /// - Removed ids: worker stopped, state discarded.
    /// - Added ids: fresh state, worker started if enabled.
    /// - Changed ids: worker restarted if still enabled, state kept.
    ///
    /// Rules of equal priority rank in the order given.
    pub async fn hot_update_rules(&self, rules: Vec<Rule>) -> RuleDiff {
        let incoming = dedupe(rules);
        let mut diff = RuleDiff::default();
        let mut topology = self.topology.write().await;

        let keep: HashSet<&str> = incoming.iter().map(|r| r.id.as_str()).collect();
        let gone: Vec<String> = topology
            .rules
            .iter()
            .filter(|r| !keep.contains(r.id.as_str()))
            .map(|r| r.id.clone())
            .collect();

        for id in gone {
            if let Some(worker) = topology.workers.remove(&id) {
                worker.stop(&id, self.settings.join_timeout).await;
            }
            topology.states.remove(&id);
            diff.removed.push(id);
        }
        topology.rules.retain(|r| keep.contains(r.id.as_str()));

        let rank: HashMap<String, usize> = incoming
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        for rule in incoming {
            self.upsert(&mut topology, rule, &mut diff).await;
        }
        // Equal priorities follow the incoming order, not insertion history.
        topology
            .rules
            .sort_by_key(|r| (Reverse(r.priority), rank.get(&r.id).copied().unwrap_or(usize::MAX)));

        info!(
            added = diff.added.len(),
            removed = diff.removed.len(),
            updated = diff.updated.len(),
            unchanged = diff.unchanged,
            workers = topology.workers.len(),
            "rules hot-updated"
        );
        diff
    }

    /// Add or replace a single rule.
    pub async fn hot_update_rule(&self, rule: Rule) -> RuleDiff {
        let mut diff = RuleDiff::default();
        let mut topology = self.topology.write().await;
        self.upsert(&mut topology, Arc::new(rule), &mut diff).await;
        debug!(
            added = diff.added.len(),
            updated = diff.updated.len(),
            "rule hot-updated"
        );
        diff
    }

    async fn upsert(&self, topology: &mut Topology, rule: Arc<Rule>, diff: &mut RuleDiff) {
        let position = topology.rules.iter().position(|r| r.id == rule.id);

        match position {
            Some(i) if *topology.rules[i] == *rule => {
                diff.unchanged += 1;
                return;
            }
            Some(i) => {
                if let Some(worker) = topology.workers.remove(&rule.id) {
                    worker.stop(&rule.id, self.settings.join_timeout).await;
                }
                topology.rules[i] = Arc::clone(&rule);
                diff.updated.push(rule.id.clone());
            }
            None => {
                topology
                    .states
                    .insert(rule.id.clone(), new_state(&rule.id));
                topology.rules.push(Arc::clone(&rule));
                diff.added.push(rule.id.clone());
            }
        }

        if topology.started && rule.enabled {
            self.start_worker(topology, rule);
        }
        topology.rules.sort_by_key(|r| Reverse(r.priority));
    }

    fn start_worker(&self, topology: &mut Topology, rule: Arc<Rule>) {
        let state = topology
            .states
            .entry(rule.id.clone())
            .or_insert_with(|| new_state(&rule.id))
            .clone();
        let id = rule.id.clone();
        let worker = WorkerHandle::spawn(rule, state, Arc::clone(&self.ctx));
        topology.workers.insert(id, worker);
    }

    // ── Evaluation ──────────────────────────────────────────────────

    /// Evaluate one event against every active rule.
    ///
    /// Waits until every worker has processed the event, or until the settle
    /// timeout elapses, then applies exclusivity resolution.
    pub async fn evaluate(&self, event: impl Into<Arc<VesselEvent>>) -> Vec<Alert> {
        self.ensure_started().await;
        let event = event.into();

        let (cycle, rules) = {
            let topology = self.topology.read().await;
            let cycle = Cycle::new(topology.workers.len());
            for (rule_id, worker) in &topology.workers {
                let item = WorkItem {
                    event: Arc::clone(&event),
                    ticket: cycle.ticket(),
                };
                if worker.send(item).is_err() {
                    debug!(rule_id = %rule_id, "worker has exited, event skipped");
                }
            }
            (cycle, topology.rules.clone())
        };

        if !cycle.wait(self.settings.settle_timeout).await {
            warn!(
                event_id = %event.id,
                pending = cycle.pending(),
                timeout = ?self.settings.settle_timeout,
                "settle timeout elapsed, returning partial alerts"
            );
        }

        resolve_exclusive(cycle.drain(), &rules)
    }

    async fn ensure_started(&self) {
        if self.topology.read().await.started {
            return;
        }

        let mut topology = self.topology.write().await;
        if topology.started {
            return;
        }
        topology.started = true;

        let enabled: Vec<Arc<Rule>> = topology.rules.iter().filter(|r| r.enabled).cloned().collect();
        for rule in enabled {
            self.start_worker(&mut topology, rule);
        }
        info!(workers = topology.workers.len(), "rule workers started");
    }

    /// Stop every worker. State is kept; a later `evaluate` restarts them.
    pub async fn shutdown(&self) {
        let mut topology = self.topology.write().await;
        let workers: Vec<(String, WorkerHandle)> = topology.workers.drain().collect();
        let count = workers.len();
        for (id, worker) in workers {
            worker.stop(&id, self.settings.join_timeout).await;
        }
        topology.started = false;
        info!(workers = count, "rule engine shut down");
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// Snapshot of the active rules, descending priority.
    pub async fn rules(&self) -> Vec<Arc<Rule>> {
        self.topology.read().await.rules.clone()
    }

    /// Number of running workers.
    pub async fn active_workers(&self) -> usize {
        self.topology.read().await.workers.len()
    }

    /// Whether state exists for `rule_id`.
    pub async fn has_state(&self, rule_id: &str) -> bool {
        self.topology.read().await.states.contains_key(rule_id)
    }

    /// Copy of the state for `rule_id`.
    pub async fn state_of(&self, rule_id: &str) -> Option<RuleState> {
        let topology = self.topology.read().await;
        let state = topology.states.get(rule_id)?;
        let guard = match state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Some(guard.clone())
    }
}

fn new_state(rule_id: &str) -> Arc<Mutex<RuleState>> {
    Arc::new(Mutex::new(RuleState::new(rule_id)))
}

/// Wrap rules in `Arc`, keeping the last definition of a repeated id.
fn dedupe(rules: Vec<Rule>) -> Vec<Arc<Rule>> {
    let mut out: Vec<Arc<Rule>> = Vec::with_capacity(rules.len());
    for rule in rules {
        match out.iter().position(|r| r.id == rule.id) {
            Some(i) => {
                warn!(rule_id = %rule.id, "duplicate rule id, later definition wins");
                out[i] = Arc::new(rule);
            }
            None => out.push(Arc::new(rule)),
        }
    }
    out
}

#[cfg(test)]
mod tests;
