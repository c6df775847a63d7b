use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

// ── Booking operations ──────────────────────────────────────────

/// Counter: manager operations. Labels: op, outcome (`ok` or error kind).
pub const BOOKING_OPS_TOTAL: &str = "roombook_booking_ops_total";

/// Histogram: manager operation latency in seconds. Labels: op.
pub const BOOKING_OP_DURATION_SECONDS: &str = "roombook_booking_op_duration_seconds";

/// Counter: requests refused because the slot was taken. Labels: room.
pub const BOOKING_CONFLICTS_TOTAL: &str = "roombook_booking_conflicts_total";

// ── Persistence ─────────────────────────────────────────────────

/// Counter: successful snapshot saves.
pub const PERSIST_SAVES_TOTAL: &str = "roombook_persist_saves_total";

/// Counter: failed snapshot saves. In-memory state is ahead of disk until the next success.
pub const PERSIST_FAILURES_TOTAL: &str = "roombook_persist_failures_total";

/// Histogram: snapshot save duration in seconds.
pub const PERSIST_DURATION_SECONDS: &str = "roombook_persist_duration_seconds";

/// Histogram: bookings per saved snapshot.
pub const PERSIST_SNAPSHOT_SIZE: &str = "roombook_persist_snapshot_size";

// ── Sweeper ─────────────────────────────────────────────────────

/// Counter: bookings moved to Completed by the sweeper.
pub const SWEEPER_COMPLETED_TOTAL: &str = "roombook_sweeper_completed_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}
