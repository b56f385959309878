//! Observability infrastructure - cache metrics

pub mod metrics;
