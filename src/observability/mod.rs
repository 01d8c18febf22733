//! Observability: logs and metrics.
//!
//! # Data Flow
//! ```text
//! configuration pass, dispatch, rewriter, watcher
//!     → tracing events with structured fields (module, mount_point, zone)
//!     → logging.rs subscriber → stdout
//!
//! dispatch (per request), startup (per pass)
//!     → metrics.rs counters / histograms / gauges
//!     → Prometheus exporter (when enabled)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the request span
//! - Metrics are recorded through the `metrics` facade; without an installed
//!   exporter they are no-ops

pub mod logging;
pub mod metrics;
