//! Observability subsystem.
//!
//! # Responsibilities
//! - Prometheus metrics exporter (optional, config-gated)
//! - Request and gateway-call counters and latency histograms
//!
//! Structured logging is initialized in `main` via `tracing-subscriber`;
//! this module only owns metrics.

pub mod metrics;
