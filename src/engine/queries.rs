use tokio::sync::broadcast;

use crate::catalog::RoomFilter;
use crate::model::*;

use super::conflict::validate_query_window;
use super::{record_op, BookingError, BookingManager};

impl BookingManager {
    pub fn get_booking_by_id(&self, id: BookingId) -> Result<Booking, BookingError> {
        self.store.by_id(id).ok_or(BookingError::BookingNotFound(id))
    }

    /// Snapshot of all bookings, sorted by start time.
    pub fn get_bookings(&self) -> Vec<Booking> {
        self.store.all()
    }

    /// Bookings of one room, sorted by start time.
    pub async fn get_room_bookings(&self, room_id: &RoomId) -> Result<Vec<Booking>, BookingError> {
        self.room(room_id)?;
        Ok(self.store.room_bookings(room_id).await)
    }

    pub fn rooms(&self) -> Vec<Room> {
        self.catalog.list_rooms()
    }

    pub fn room(&self, room_id: &RoomId) -> Result<Room, BookingError> {
        self.catalog
            .get_room(room_id)
            .ok_or_else(|| BookingError::RoomNotFound(room_id.clone()))
    }

    /// True iff no active booking on the room overlaps `[start, end)`,
    /// ignoring `exclude`. Unknown rooms are not found.
    pub async fn is_room_free(
        &self,
        room_id: &RoomId,
        start: Instant,
        end: Instant,
        exclude: Option<BookingId>,
    ) -> Result<bool, BookingError> {
        let span = validate_query_window(start, end)?;
        self.room(room_id)?;
        Ok(self.store.is_free(room_id, &span, exclude).await)
    }

    /// Every active catalog room that is free for `[start, end)`.
    pub async fn get_available_rooms(&self, start: Instant, end: Instant) -> Result<Vec<Room>, BookingError> {
        self.find_available_rooms(start, end, &RoomFilter::default()).await
    }

    /// Active, free rooms that also satisfy `filter`, in catalog order.
    pub async fn find_available_rooms(
        &self,
        start: Instant,
        end: Instant,
        filter: &RoomFilter,
    ) -> Result<Vec<Room>, BookingError> {
        let started = std::time::Instant::now();
        let result = self.available(start, end, filter).await;
        record_op("available", started, &result);
        result
    }

    async fn available(&self, start: Instant, end: Instant, filter: &RoomFilter) -> Result<Vec<Room>, BookingError> {
        let span = validate_query_window(start, end)?;
        let mut free = Vec::new();
        for room in self.catalog.list_rooms() {
            if !room.is_active || !filter.matches(&room) {
                continue;
            }
            if self.store.is_free(&room.id, &span, None).await {
                free.push(room);
            }
        }
        Ok(free)
    }

    /// Free sub-intervals of `[start, end)` on one room.
    pub async fn free_windows(&self, room_id: &RoomId, start: Instant, end: Instant) -> Result<Vec<Span>, BookingError> {
        let window = validate_query_window(start, end)?;
        self.room(room_id)?;
        Ok(self.store.free_windows(room_id, &window).await)
    }

    /// Approved bookings that have ended by now.
    pub fn elapsed_bookings(&self) -> Vec<BookingId> {
        self.store.elapsed_approved(self.clock.now())
    }

    /// Receive every committed change to a room's bookings from now on.
    pub fn subscribe(&self, room_id: &RoomId) -> broadcast::Receiver<BookingEvent> {
        self.notify.subscribe(room_id)
    }
}
