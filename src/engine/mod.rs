mod availability;
mod conflict;
mod error;
mod lifecycle;
mod mutations;
mod queries;
mod store;

pub use availability::{free_windows, merge_overlapping, subtract_intervals};
pub use conflict::{find_conflict, is_room_free, overlaps};
pub use error::{BookingError, ErrorKind};
pub use store::BookingStore;

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::catalog::RoomCatalog;
use crate::clock::Clock;
use crate::limits::PERSIST_QUEUE_DEPTH;
use crate::model::*;
use crate::notify::NotifyHub;
use crate::observability;
use crate::persistence::{BookingPersistence, PersistError};

// ── Background persistence writer ────────────────────────

pub(super) enum PersistCommand {
    /// State changed; write a fresh snapshot.
    Save,
    /// Reply once every save requested before this command has finished.
    Sync { response: oneshot::Sender<()> },
}

/// Background task that owns the persistence adapter and coalesces saves.
/// 1. Block until the first command arrives.
/// 2. On Save, drain every immediately available command.
/// 3. Write one snapshot of the store, taken after the drain.
/// 4. Answer any Sync commands collected along the way.
///
/// The snapshot is read after the drain, so it is at least as new as every
/// commit that requested it, and saves run one at a time in order.
async fn persist_writer_loop(
    store: Arc<BookingStore>,
    persistence: Arc<dyn BookingPersistence>,
    mut rx: mpsc::Receiver<PersistCommand>,
) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            PersistCommand::Save => {
                let mut requests = 1usize;
                let mut waiters = Vec::new();
                loop {
                    match rx.try_recv() {
                        Ok(PersistCommand::Save) => requests += 1,
                        Ok(PersistCommand::Sync { response }) => waiters.push(response),
                        Err(_) => break,
                    }
                }
                save_snapshot(&store, persistence.as_ref(), requests).await;
                for tx in waiters {
                    let _ = tx.send(());
                }
            }
            PersistCommand::Sync { response } => {
                let _ = response.send(());
            }
        }
    }
}

async fn save_snapshot(store: &BookingStore, persistence: &dyn BookingPersistence, requests: usize) {
    let snapshot = store.all();
    metrics::histogram!(observability::PERSIST_SNAPSHOT_SIZE).record(snapshot.len() as f64);
    let started = std::time::Instant::now();
    let result = persistence.save(&snapshot).await;
    metrics::histogram!(observability::PERSIST_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
    match result {
        Ok(()) => {
            metrics::counter!(observability::PERSIST_SAVES_TOTAL).increment(1);
            debug!("saved {} bookings ({requests} requests)", snapshot.len());
        }
        Err(e) => {
            // The in-memory commit stands; durable state lags until the next good save.
            metrics::counter!(observability::PERSIST_FAILURES_TOTAL).increment(1);
            error!("failed to persist {} bookings: {e}", snapshot.len());
        }
    }
}

fn record_op<T>(op: &'static str, started: std::time::Instant, result: &Result<T, BookingError>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.kind().as_str(),
    };
    metrics::counter!(observability::BOOKING_OPS_TOTAL, "op" => op, "outcome" => outcome).increment(1);
    metrics::histogram!(observability::BOOKING_OP_DURATION_SECONDS, "op" => op)
        .record(started.elapsed().as_secs_f64());
    if let Err(e) = result {
        if let BookingError::Conflict { room_id, .. } = e {
            metrics::counter!(observability::BOOKING_CONFLICTS_TOTAL, "room" => room_id.to_string()).increment(1);
        }
        debug!(op, kind = %e.kind(), "rejected: {e}");
    }
}

/// The booking engine's public entry point.
///
/// Writes validate input, then check and commit under the room's lock, then
/// publish the event and schedule a save after the lock is released. Saves are
/// asynchronous: a granted booking stands even if the save fails, and durable
/// state may briefly trail memory.
pub struct BookingManager {
    store: Arc<BookingStore>,
    catalog: Arc<dyn RoomCatalog>,
    clock: Arc<dyn Clock>,
    notify: NotifyHub,
    persist_tx: mpsc::Sender<PersistCommand>,
}

impl BookingManager {
    /// Load previously committed bookings and start the persistence writer.
    /// Loaded bookings are trusted; they are not re-checked for conflicts.
    pub async fn open(
        catalog: Arc<dyn RoomCatalog>,
        persistence: Arc<dyn BookingPersistence>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PersistError> {
        let bookings = persistence.load().await?;
        info!("loaded {} bookings", bookings.len());
        Ok(Self::with_bookings(catalog, persistence, clock, bookings))
    }

    /// Build a manager over the given bookings. Must run inside a Tokio runtime.
    pub fn with_bookings(
        catalog: Arc<dyn RoomCatalog>,
        persistence: Arc<dyn BookingPersistence>,
        clock: Arc<dyn Clock>,
        bookings: Vec<Booking>,
    ) -> Self {
        let store = Arc::new(BookingStore::from_bookings(bookings));
        let (persist_tx, persist_rx) = mpsc::channel(PERSIST_QUEUE_DEPTH);
        tokio::spawn(persist_writer_loop(store.clone(), persistence, persist_rx));
        Self {
            store,
            catalog,
            clock,
            notify: NotifyHub::new(),
            persist_tx,
        }
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Publish a committed change and schedule a save. Never blocks.
    fn committed(&self, event: BookingEvent) {
        self.notify.send(&event);
        match self.persist_tx.try_send(PersistCommand::Save) {
            Ok(()) => {}
            Err(TrySendError::Full(cmd)) => {
                let tx = self.persist_tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(cmd).await;
                });
            }
            Err(TrySendError::Closed(_)) => {
                error!("persistence writer stopped; bookings are held in memory only");
            }
        }
    }

    /// Wait until every save scheduled so far has been attempted.
    pub async fn sync_persistence(&self) {
        let (tx, rx) = oneshot::channel();
        if self.persist_tx.send(PersistCommand::Sync { response: tx }).await.is_err() {
            return;
        }
        let _ = rx.await;
    }
}
