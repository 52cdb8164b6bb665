//! Observability: loader-scoped execution counters and their snapshot
//! report.
//!
//! Counters live on the loader's cache scope, never in ambient state; a
//! loader's numbers die with its batch window.

mod metrics;

pub use metrics::{AggregateMetrics, MetricsSnapshot};
