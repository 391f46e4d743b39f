//! Routes alerts to configured sinks.
//!
//! Each alert names its notify targets. Sinks registered for a target receive
//! the alert; alerts whose targets have no sinks go to the default sinks.
//! Individual sink failures don't block other sinks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use seawatch_core::Alert;

use crate::traits::{AlertSink, DispatchResult};

/// Dispatches alerts to multiple sinks, organized per notify target.
#[derive(Default)]
pub struct Dispatcher {
    /// Notify target → sinks for that target.
    target_sinks: HashMap<String, Vec<Arc<dyn AlertSink>>>,
    /// Fallback sinks used when no target-specific sinks exist.
    default_sinks: Vec<Arc<dyn AlertSink>>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a dispatcher whose sinks receive every alert.
    pub fn with_defaults(sinks: Vec<Arc<dyn AlertSink>>) -> Self {
        Self {
            target_sinks: HashMap::new(),
            default_sinks: sinks,
        }
    }

    /// Replace all sinks for a notify target.
    pub fn set_target_sinks(&mut self, target: impl Into<String>, sinks: Vec<Arc<dyn AlertSink>>) {
        self.target_sinks.insert(target.into(), sinks);
    }

    /// Sinks that should receive `alert`, each at most once.
    fn sinks_for(&self, alert: &Alert) -> Vec<&Arc<dyn AlertSink>> {
        let mut selected: Vec<&Arc<dyn AlertSink>> = Vec::new();
        for target in &alert.notify {
            for sink in self.target_sinks.get(target).into_iter().flatten() {
                if !selected.iter().any(|s| Arc::ptr_eq(s, sink)) {
                    selected.push(sink);
                }
            }
        }
        if selected.is_empty() {
            selected.extend(self.default_sinks.iter());
        }
        selected
    }

    /// Deliver an alert to every matching sink.
    ///
    /// Returns one result per sink delivery.
    pub async fn dispatch(&self, alert: &Alert) -> Vec<DispatchResult> {
        let sinks = self.sinks_for(alert);
        if sinks.is_empty() {
            tracing::debug!(rule_id = %alert.rule_id, "No alert sinks configured");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(sinks.len());
        for sink in sinks {
            let start = Instant::now();
            let result = sink.send(alert).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match result {
                Ok(()) => {
                    tracing::debug!(
                        rule_id = %alert.rule_id,
                        sink = sink.name(),
                        duration_ms,
                        "Alert delivered"
                    );
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(
                        rule_id = %alert.rule_id,
                        sink = sink.name(),
                        error = %e,
                        duration_ms,
                        "Alert delivery failed"
                    );
                    (false, Some(e.to_string()))
                }
            };

            results.push(DispatchResult {
                sink: sink.name().to_string(),
                rule_id: alert.rule_id.clone(),
                success,
                error,
                duration_ms,
            });
        }

        results
    }
}
