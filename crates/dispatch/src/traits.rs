//! Alert sink trait definition and shared error types.

use seawatch_core::Alert;

/// Errors that can occur around alert delivery and event intake.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Event queue is closed")]
    QueueClosed,

    #[error("Processor already started")]
    AlreadyStarted,
}

/// Trait for alert output implementations.
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one alert through this sink.
    async fn send(&self, alert: &Alert) -> Result<(), DispatchError>;

    /// Human-readable name for this sink (e.g., "log", "stdout").
    fn name(&self) -> &str;
}

/// Result of delivering an alert to a single sink.
#[derive(Debug)]
pub struct DispatchResult {
    pub sink: String,
    pub rule_id: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
