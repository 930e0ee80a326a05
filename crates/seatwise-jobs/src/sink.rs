//! Alert delivery seam.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use seatwise_core::{AlertEvent, AlertSeverity};

/// Errors surfaced by an alert sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink failed to hand the event over.
    #[error("alert delivery failed: {0}")]
    Delivery(String),
}

/// Destination for alert events produced by the recurring scan.
///
/// Implemented by the notification collaborator; the engine decides *that*
/// an alert fires, the sink owns how it travels.
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one event.
    async fn deliver(&self, event: &AlertEvent) -> Result<(), SinkError>;
}

/// Sink that retains events in memory, for tests.
#[derive(Debug, Default)]
pub struct InMemoryAlertSink {
    events: Arc<Mutex<Vec<AlertEvent>>>,
}

impl InMemoryAlertSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events delivered so far.
    pub async fn events(&self) -> Vec<AlertEvent> {
        self.events.lock().await.clone()
    }

    /// Number of events delivered so far.
    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    /// Whether nothing was delivered yet.
    pub async fn is_empty(&self) -> bool {
        self.events.lock().await.is_empty()
    }
}

#[async_trait::async_trait]
impl AlertSink for InMemoryAlertSink {
    async fn deliver(&self, event: &AlertEvent) -> Result<(), SinkError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

/// Sink that logs each event at a level matching its severity. Useful as a
/// default while no external notifier is wired up.
#[derive(Debug, Default)]
pub struct TracingAlertSink;

impl TracingAlertSink {
    /// Create the sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl AlertSink for TracingAlertSink {
    async fn deliver(&self, event: &AlertEvent) -> Result<(), SinkError> {
        match event.severity {
            AlertSeverity::Critical | AlertSeverity::High => warn!(
                subject = %event.subject,
                condition = %event.condition,
                severity = %event.severity,
                "{}",
                event.message
            ),
            AlertSeverity::Medium | AlertSeverity::Low => info!(
                subject = %event.subject,
                condition = %event.condition,
                severity = %event.severity,
                "{}",
                event.message
            ),
        }
        Ok(())
    }
}
