//! Prometheus metrics for the query facade.
//!
//! - `readmodel_token_validations_total{outcome}`
//! - `readmodel_quota_due_notifications_total`
//! - `readmodel_milestone_snapshots_total`
//! - `readmodel_event_log_fetch_duration_seconds{consumer}`
//!
//! # Example
//!
//! ```rust,no_run
//! use readmodel_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut exporter = MetricsExporter::new();
//! exporter.install()?;
//!
//! // Serve this from the scrape endpoint
//! let text = exporter.render();
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use readmodel_core::QueryError;
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder and scrape renderer.
#[derive(Default)]
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl std::fmt::Debug for MetricsExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsExporter")
            .field("installed", &self.handle.is_some())
            .finish()
    }
}

impl MetricsExporter {
    /// Exporter with no recorder installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Describe every metric and install the global Prometheus recorder.
    ///
    /// If another recorder is already installed the call succeeds without a
    /// handle and [`MetricsExporter::render`] returns `None`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built or installed.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                register_metrics();
                tracing::info!("Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Check if this exporter owns the installed recorder.
    #[must_use]
    pub const fn is_installed(&self) -> bool {
        self.handle.is_some()
    }

    /// Render current metrics in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "readmodel_token_validations_total",
        "Access token validations by outcome"
    );
    describe_counter!(
        "readmodel_quota_due_notifications_total",
        "Quota notifications found due"
    );
    describe_counter!(
        "readmodel_milestone_snapshots_total",
        "Milestone snapshots built or refreshed"
    );
    describe_histogram!(
        "readmodel_event_log_fetch_duration_seconds",
        "Time taken to answer a query, fetches included"
    );
}

/// Outcome label for a validation result.
#[must_use]
pub const fn outcome<T>(result: &Result<T, QueryError>) -> &'static str {
    match result {
        Ok(_) => "valid",
        Err(QueryError::NotFound) => "not_found",
        Err(QueryError::InvalidArgument(_)) => "invalid_argument",
        Err(QueryError::InvalidToken) => "invalid_token",
        Err(QueryError::Expired) => "expired",
        Err(QueryError::Cancelled) => "cancelled",
        Err(QueryError::Internal(_)) => "internal",
    }
}

/// Query metrics recorder.
pub struct QueryMetrics;

impl QueryMetrics {
    /// Record a token validation.
    pub fn record_validation(outcome: &'static str) {
        counter!("readmodel_token_validations_total", "outcome" => outcome).increment(1);
    }

    /// Record notifications found due.
    pub fn record_due_notifications(count: usize) {
        counter!("readmodel_quota_due_notifications_total").increment(count as u64);
    }

    /// Record a milestone snapshot.
    pub fn record_milestone_snapshot() {
        counter!("readmodel_milestone_snapshots_total").increment(1);
    }

    /// Record how long a consumer's query took.
    pub fn record_fetch(consumer: &'static str, duration: Duration) {
        histogram!("readmodel_event_log_fetch_duration_seconds", "consumer" => consumer)
            .record(duration.as_secs_f64());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn test_exporter_creation() {
        let exporter = MetricsExporter::new();
        assert!(!exporter.is_installed());
        assert!(exporter.render().is_none());
    }

    #[test]
    fn test_install_twice_is_tolerated() {
        let mut first = MetricsExporter::new();
        let mut second = MetricsExporter::new();

        first.install().unwrap();
        second.install().unwrap();

        // Only one recorder can be global; the other exporter has no handle.
        assert!(!(first.is_installed() && second.is_installed()));
    }

    #[test]
    fn test_render_contains_recorded_metrics() {
        let mut exporter = MetricsExporter::new();
        exporter.install().unwrap();

        QueryMetrics::record_validation("valid");
        QueryMetrics::record_due_notifications(2);
        QueryMetrics::record_fetch("access_token", Duration::from_millis(3));

        // Another test may own the recorder.
        if let Some(rendered) = exporter.render() {
            assert!(rendered.contains("readmodel_token_validations_total"));
            assert!(rendered.contains("readmodel_quota_due_notifications_total"));
        }
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome(&Ok::<(), QueryError>(())), "valid");
        assert_eq!(outcome::<()>(&Err(QueryError::InvalidToken)), "invalid_token");
        assert_eq!(outcome::<()>(&Err(QueryError::Expired)), "expired");
        assert_eq!(outcome::<()>(&Err(QueryError::Internal("db".to_string()))), "internal");
    }
}
