//! Exclusivity resolution over one cycle's alerts.

use std::sync::Arc;

use seawatch_core::Alert;

use crate::schema::Rule;

/// Apply winner-takes-all exclusivity.
///
/// `rules` must be sorted by descending priority. If any alert belongs to an
/// exclusive rule, only the alerts of the highest-priority exclusive rule
/// that matched are kept; alerts of non-exclusive rules are dropped too.
/// The result is ordered by rule priority.
pub fn resolve_exclusive(mut alerts: Vec<Alert>, rules: &[Arc<Rule>]) -> Vec<Alert> {
    let rank = |rule_id: &str| {
        rules
            .iter()
            .position(|r| r.id == rule_id)
            .unwrap_or(usize::MAX)
    };
    alerts.sort_by_key(|a| rank(&a.rule_id));

    let winner = rules
        .iter()
        .filter(|r| r.exclusive)
        .find(|r| alerts.iter().any(|a| a.rule_id == r.id));

    match winner {
        Some(rule) => {
            alerts.retain(|a| a.rule_id == rule.id);
            alerts
        }
        None => alerts,
    }
}
