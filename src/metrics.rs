// src/metrics.rs

#[cfg(feature = "observability")]
pub use metrics::{
    counter, describe_counter, describe_histogram, histogram, increment_counter, Unit,
};

// NOTE: When observability feature is disabled, provide stub implementations
#[cfg(not(feature = "observability"))]
pub enum Unit {
    Count,
    Milliseconds,
}

// Macros for metrics when observability is disabled
#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! increment_counter {
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

// Re-export macros for use in this module when observability is disabled
#[cfg(not(feature = "observability"))]
use crate::{counter, describe_counter, describe_histogram, histogram, increment_counter};

/// Initializes the descriptions for all the metrics in the application.
/// This should be called once at startup.
pub fn describe_metrics() {
    describe_counter!(
        "route_requests_total",
        Unit::Count,
        "Routing requests handled, labeled by chain and outcome (resolved, no_route, rejected)."
    );
    describe_counter!(
        "route_candidates_total",
        Unit::Count,
        "Route candidates produced by the enumerator, labeled by chain."
    );
    describe_counter!(
        "route_quote_failures_total",
        Unit::Count,
        "Candidates that failed evaluation, labeled by protocol and reason."
    );
    describe_histogram!(
        "route_request_duration_ms",
        Unit::Milliseconds,
        "End-to-end routing latency in milliseconds, labeled by chain."
    );
    describe_counter!(
        "route_read_timeouts_total",
        Unit::Count,
        "Chain reads that hit the read timeout, labeled by call."
    );
    describe_counter!(
        "pool_address_cache_hits_total",
        Unit::Count,
        "Pool-address lookups answered from the cross-request cache."
    );
    describe_counter!(
        "pool_address_cache_misses_total",
        Unit::Count,
        "Pool-address lookups that went to the chain."
    );
}

pub fn increment_route_request(chain_id: u64, outcome: &str) {
    increment_counter!("route_requests_total",
                       "chain_id" => chain_id.to_string(),
                       "outcome" => outcome.to_string());
}

pub fn record_candidates(chain_id: u64, count: usize) {
    counter!("route_candidates_total", count as u64,
             "chain_id" => chain_id.to_string());
}

pub fn increment_quote_failure(dex: &str, reason: &str) {
    increment_counter!("route_quote_failures_total",
                       "dex" => dex.to_string(),
                       "reason" => reason.to_string());
}

pub fn record_route_duration(chain_id: u64, duration: std::time::Duration) {
    histogram!("route_request_duration_ms", duration.as_millis() as f64,
               "chain_id" => chain_id.to_string());
}

pub fn increment_read_timeout(call: &str) {
    increment_counter!("route_read_timeouts_total", "call" => call.to_string());
}

pub fn increment_pool_cache(hit: bool) {
    if hit {
        increment_counter!("pool_address_cache_hits_total");
    } else {
        increment_counter!("pool_address_cache_misses_total");
    }
}
