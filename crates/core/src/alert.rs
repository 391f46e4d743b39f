use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A rule match produced during one evaluation cycle.
///
/// Transient: alerts are filtered by exclusivity and handed to the
/// dispatcher, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: Uuid,
    pub rule_id: String,
    pub alert_type: String,
    pub severity: String,
    /// Vessel identifier of the triggering event.
    pub entity_id: String,
    /// Id of the triggering event.
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub notify: Vec<String>,
}
