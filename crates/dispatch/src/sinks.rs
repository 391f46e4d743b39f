//! Built-in alert sinks.

use seawatch_core::Alert;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::traits::{AlertSink, DispatchError};

/// Writes each alert as a structured `tracing` event.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait::async_trait]
impl AlertSink for LogSink {
    async fn send(&self, alert: &Alert) -> Result<(), DispatchError> {
        tracing::info!(
            alert_id = %alert.id,
            rule_id = %alert.rule_id,
            alert_type = %alert.alert_type,
            severity = %alert.severity,
            entity_id = %alert.entity_id,
            event_id = %alert.event_id,
            notify = ?alert.notify,
            "alert raised"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Writes each alert as one JSON document per line.
pub struct JsonLinesSink {
    name: String,
    writer: Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
}

impl JsonLinesSink {
    pub fn new(name: impl Into<String>, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            name: name.into(),
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Sink writing to the process's standard output.
    pub fn stdout() -> Self {
        Self::new("stdout", tokio::io::stdout())
    }
}

#[async_trait::async_trait]
impl AlertSink for JsonLinesSink {
    async fn send(&self, alert: &Alert) -> Result<(), DispatchError> {
        let mut line = serde_json::to_vec(alert)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
