use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::engine::BookingManager;
use crate::observability;

/// Background task that periodically completes Approved bookings whose end
/// has passed.
pub async fn run_sweeper(manager: Arc<BookingManager>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        sweep_once(&manager).await;
    }
}

/// Complete every elapsed Approved booking. Returns how many were completed.
pub async fn sweep_once(manager: &BookingManager) -> usize {
    let mut completed = 0;
    for id in manager.elapsed_bookings() {
        match manager.complete_booking(id).await {
            Ok(_) => completed += 1,
            // Cancelled or deleted since it was listed.
            Err(e) => debug!("sweeper skip {id}: {e}"),
        }
    }
    if completed > 0 {
        metrics::counter!(observability::SWEEPER_COMPLETED_TOTAL).increment(completed as u64);
        info!("sweeper completed {completed} bookings");
    }
    completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{default_rooms, StaticCatalog};
    use crate::clock::ManualClock;
    use crate::model::*;
    use crate::persistence::MemoryPersistence;
    use chrono::{TimeZone, Utc};

    fn at(h: u32) -> Instant {
        Utc.with_ymd_and_hms(2030, 3, 1, h, 0, 0).unwrap()
    }

    fn manager(clock: Arc<ManualClock>) -> BookingManager {
        let catalog = Arc::new(StaticCatalog::new(default_rooms()).unwrap());
        BookingManager::with_bookings(catalog, Arc::new(MemoryPersistence::default()), clock, Vec::new())
    }

    #[tokio::test]
    async fn sweeper_completes_ended_bookings() {
        let clock = Arc::new(ManualClock::new(at(8)));
        let manager = manager(clock.clone());

        let early = manager.create_booking(BookingRequest::new("CR001", at(9), at(10))).await.unwrap();
        let late = manager.create_booking(BookingRequest::new("CR001", at(11), at(12))).await.unwrap();
        let gone = manager.create_booking(BookingRequest::new("CR002", at(9), at(10))).await.unwrap();
        manager.cancel_booking(gone.id).await.unwrap();

        assert_eq!(sweep_once(&manager).await, 0);

        clock.set(at(10));
        assert_eq!(sweep_once(&manager).await, 1);
        assert_eq!(manager.get_booking_by_id(early.id).unwrap().status, BookingStatus::Completed);
        assert_eq!(manager.get_booking_by_id(late.id).unwrap().status, BookingStatus::Approved);
        assert_eq!(manager.get_booking_by_id(gone.id).unwrap().status, BookingStatus::Cancelled);

        // Already completed bookings are not listed again.
        assert_eq!(sweep_once(&manager).await, 0);
    }

    #[tokio::test]
    async fn run_sweeper_ticks() {
        let clock = Arc::new(ManualClock::new(at(8)));
        let manager = Arc::new(manager(clock.clone()));
        let booking = manager.create_booking(BookingRequest::new("CR003", at(9), at(10))).await.unwrap();
        clock.set(at(11));

        let handle = tokio::spawn(run_sweeper(manager.clone(), Duration::from_secs(60)));
        // The first tick fires immediately.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(manager.get_booking_by_id(booking.id).unwrap().status, BookingStatus::Completed);
        handle.abort();
    }
}
