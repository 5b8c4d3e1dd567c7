use prometheus::{Histogram, HistogramOpts, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Webhook counters
pub static WEBHOOK_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new("wxproxy_webhook_requests_total", "Webhook callbacks handled"),
        &["mode", "outcome"],
    )
    .unwrap()
});

pub static DISPATCH_LATENCY: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "wxproxy_dispatch_latency_seconds",
            "Time from fan-out until a reply was chosen",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
    )
    .unwrap()
});

pub static SUBSCRIBERS_PER_REQUEST: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "wxproxy_subscribers_per_request",
            "Number of subscriber URLs per webhook callback",
        )
        .buckets(vec![0.0, 1.0, 2.0, 3.0, 5.0, 8.0, 13.0]),
    )
    .unwrap()
});

// Credential counters
pub static CREDENTIAL_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "wxproxy_credential_requests_total",
            "Token and ticket requests by kind and outcome",
        ),
        &["kind", "outcome"],
    )
    .unwrap()
});

/// Register all metrics with the registry
pub fn register_metrics() {
    REGISTRY
        .register(Box::new(WEBHOOK_REQUESTS.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(DISPATCH_LATENCY.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(SUBSCRIBERS_PER_REQUEST.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(CREDENTIAL_REQUESTS.clone()))
        .unwrap();
}
