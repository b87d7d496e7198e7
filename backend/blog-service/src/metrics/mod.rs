//! Prometheus metrics for blog-service.
//!
//! Exposes store, cache and indexing collectors and an HTTP handler for the
//! `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, Encoder,
    HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder,
};
use sqlx::PgPool;
use std::time::Duration;

lazy_static! {
    /// Post cache lookups by outcome (hit/miss/error/timeout/corrupt).
    pub static ref POST_CACHE_LOOKUPS: IntCounterVec = register_int_counter_vec!(
        "post_cache_lookups_total",
        "Post cache lookups segmented by outcome",
        &["outcome"]
    )
    .expect("failed to register post_cache_lookups_total");

    /// Post cache writes by operation (populate/invalidate) and result.
    pub static ref POST_CACHE_WRITES: IntCounterVec = register_int_counter_vec!(
        "post_cache_writes_total",
        "Post cache write attempts segmented by operation and result",
        &["op", "result"]
    )
    .expect("failed to register post_cache_writes_total");

    /// Search index upserts by result (success/error/timeout).
    pub static ref SEARCH_INDEX_UPSERTS: IntCounterVec = register_int_counter_vec!(
        "search_index_upserts_total",
        "Search index upserts segmented by result",
        &["result"]
    )
    .expect("failed to register search_index_upserts_total");

    /// Wait for a pooled connection, per store operation.
    pub static ref POST_STORE_ACQUIRE_SECONDS: HistogramVec = register_histogram_vec!(
        "post_store_acquire_seconds",
        "Time a post store operation waited for a PostgreSQL connection",
        &["op"],
        vec![0.0005, 0.002, 0.01, 0.05, 0.25, 1.0, 5.0]
    )
    .expect("failed to register post_store_acquire_seconds");

    /// Store operations that never got a connection, by reason (timeout/closed/other).
    pub static ref POST_STORE_ACQUIRE_FAILURES: IntCounterVec = register_int_counter_vec!(
        "post_store_acquire_failures_total",
        "Post store operations that failed to obtain a connection",
        &["op", "reason"]
    )
    .expect("failed to register post_store_acquire_failures_total");

    /// Pool occupancy (idle/in_use/max).
    pub static ref POST_STORE_POOL: IntGaugeVec = register_int_gauge_vec!(
        "post_store_pool_connections",
        "PostgreSQL pool connections by state",
        &["state"]
    )
    .expect("failed to register post_store_pool_connections");
}

/// Record how long `op` waited for a connection and why it failed, if it did.
pub fn observe_store_acquire(op: &str, waited: Duration, error: Option<&sqlx::Error>) {
    POST_STORE_ACQUIRE_SECONDS
        .with_label_values(&[op])
        .observe(waited.as_secs_f64());

    if let Some(e) = error {
        let reason = match e {
            sqlx::Error::PoolTimedOut => "timeout",
            sqlx::Error::PoolClosed => "closed",
            _ => "other",
        };
        POST_STORE_ACQUIRE_FAILURES
            .with_label_values(&[op, reason])
            .inc();
    }
}

pub fn record_pool_occupancy(pool: &PgPool) {
    let size = pool.size() as i64;
    let idle = pool.num_idle() as i64;
    POST_STORE_POOL.with_label_values(&["idle"]).set(idle);
    POST_STORE_POOL.with_label_values(&["in_use"]).set(size - idle);
    POST_STORE_POOL
        .with_label_values(&["max"])
        .set(pool.options().get_max_connections() as i64);
}

/// Refresh the pool gauges every `every` until the pool is closed.
pub fn spawn_pool_occupancy(pool: PgPool, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if pool.is_closed() {
                break;
            }
            record_pool_occupancy(&pool);
        }
    });
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("metrics encoding failed: {}", err);
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
