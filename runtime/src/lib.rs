//! # Readmodel Runtime
//!
//! Wires the read-side consumers into one facade.
//!
//! ## Core Components
//!
//! - **Queries**: token validation, quota notifications and milestones over one event log
//! - **Config**: environment-driven [`QueryConfig`]
//! - **Metrics**: Prometheus counters and fetch latency
//! - **Telemetry**: tracing subscriber bootstrap
//!
//! ## Example
//!
//! ```ignore
//! use readmodel_runtime::{Queries, QueryConfig, telemetry};
//! use readmodel_core::environment::SystemClock;
//!
//! let config = QueryConfig::from_env()?;
//! telemetry::init_tracing(&config.log_filter)?;
//!
//! let queries = Queries::new(log, Arc::new(SystemClock), config);
//! let snapshot = queries.milestones(&QueryContext::new("instance-1")).await?;
//! ```

/// Environment-driven configuration
pub mod config;

/// Prometheus metrics for observability
pub mod metrics;

/// The query facade
pub mod queries;

/// Tracing bootstrap
pub mod telemetry;

pub use config::{ConfigError, QueryConfig};
pub use metrics::{MetricsError, MetricsExporter};
pub use queries::Queries;
pub use telemetry::{TelemetryError, init_tracing};
