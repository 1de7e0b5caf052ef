use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: bookings committed.
pub const BOOKINGS_CONFIRMED_TOTAL: &str = "mesa_bookings_confirmed_total";

/// Counter: booking attempts rejected. Labels: reason.
pub const BOOKINGS_REJECTED_TOTAL: &str = "mesa_bookings_rejected_total";

/// Counter: booking requests collapsed by the idempotency ledger.
pub const DUPLICATE_REQUESTS_TOTAL: &str = "mesa_duplicate_requests_total";

/// Counter: discovery queries served.
pub const DISCOVERIES_TOTAL: &str = "mesa_discoveries_total";

/// Histogram: booking commit latency under the keyed lock, in seconds.
pub const BOOKING_COMMIT_DURATION_SECONDS: &str = "mesa_booking_commit_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Histogram: time spent waiting on a booking's keyed lock, in seconds.
pub const LOCK_WAIT_SECONDS: &str = "mesa_lock_wait_seconds";

/// Gauge: live idempotency ledger entries.
pub const LEDGER_ENTRIES: &str = "mesa_ledger_entries";

/// Counter: expired idempotency keys evicted.
pub const LEDGER_KEYS_PURGED_TOTAL: &str = "mesa_ledger_keys_purged_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
