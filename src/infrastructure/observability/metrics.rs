//! Cache metrics recorded through the `metrics` facade
//!
//! No exporter is installed by this crate; the host application chooses one.

use metrics::counter;

use crate::domain::query::ResultShape;

/// Record a cache hit on the interception path
pub fn record_cache_hit(shape: ResultShape) {
    counter!("query_cache_hits_total", "shape" => shape.as_str()).increment(1);
}

/// Record a cache miss on the interception path
pub fn record_cache_miss(shape: ResultShape) {
    counter!("query_cache_misses_total", "shape" => shape.as_str()).increment(1);
}

/// Record a captured result written to the store
pub fn record_cache_store(shape: ResultShape, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        "query_cache_stores_total",
        "shape" => shape.as_str(),
        "status" => status
    )
    .increment(1);
}

/// Record a command that carried no cache annotation
pub fn record_cache_bypass() {
    counter!("query_cache_bypass_total").increment(1);
}

/// Record keys removed by prefix invalidation
pub fn record_invalidation(removed: usize, pending: bool) {
    let source = if pending { "pending" } else { "immediate" };

    counter!("query_cache_invalidations_total", "source" => source).increment(1);
    counter!("query_cache_invalidated_keys_total", "source" => source).increment(removed as u64);
}
