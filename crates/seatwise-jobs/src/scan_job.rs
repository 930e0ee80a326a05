//! Recurring alert scan job.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use seatwise_core::{ComplianceService, LicensingError};

use crate::sink::AlertSink;

/// Statistics from one scan cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Events produced by the evaluator this cycle.
    pub alerts_emitted: usize,
    /// Events handed to the sink successfully.
    pub delivered: usize,
    /// Events the sink rejected; logged and counted, never fatal.
    pub delivery_failures: usize,
}

impl ScanStats {
    /// Merge stats from another cycle.
    pub fn merge(&mut self, other: &ScanStats) {
        self.alerts_emitted += other.alerts_emitted;
        self.delivered += other.delivered;
        self.delivery_failures += other.delivery_failures;
    }
}

/// Errors that can abort a scan cycle.
#[derive(Debug, Error)]
pub enum ScanJobError {
    /// The compliance evaluation itself failed.
    #[error("alert evaluation failed: {0}")]
    Evaluation(#[from] LicensingError),
}

/// Job that evaluates compliance alerts and forwards them to a sink.
///
/// Duplicate suppression lives in the evaluator, so running this job on a
/// schedule emits each condition once until it clears and re-triggers. A
/// sink failure for one event never aborts the cycle; the event is
/// dropped, logged, and counted — the condition stays marked, so delivery
/// is not retried until it re-arms.
pub struct AlertScanJob {
    compliance: Arc<ComplianceService>,
    sink: Arc<dyn AlertSink>,
}

impl AlertScanJob {
    /// Create a new scan job.
    #[must_use]
    pub fn new(compliance: Arc<ComplianceService>, sink: Arc<dyn AlertSink>) -> Self {
        Self { compliance, sink }
    }

    /// Run a single scan cycle.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<ScanStats, ScanJobError> {
        let events = self.compliance.evaluate_alerts().await?;

        let mut stats = ScanStats {
            alerts_emitted: events.len(),
            ..Default::default()
        };

        for event in &events {
            match self.sink.deliver(event).await {
                Ok(()) => stats.delivered += 1,
                Err(e) => {
                    warn!(
                        subject = %event.subject,
                        condition = %event.condition,
                        error = %e,
                        "alert delivery failed"
                    );
                    stats.delivery_failures += 1;
                }
            }
        }

        if stats.alerts_emitted > 0 {
            info!(
                alerts_emitted = stats.alerts_emitted,
                delivered = stats.delivered,
                delivery_failures = stats.delivery_failures,
                "alert scan cycle complete"
            );
        } else {
            debug!("alert scan cycle complete, nothing to report");
        }

        Ok(stats)
    }
}
