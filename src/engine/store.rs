use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::limits::MAX_BOOKINGS_PER_ROOM;
use crate::model::*;

use super::availability;
use super::conflict;
use super::BookingError;

pub type SharedSchedule = Arc<RwLock<RoomSchedule>>;

/// Authoritative booking collection.
///
/// Every mutation takes the owning room's write lock, runs the caller's check
/// against the locked schedule, and commits before releasing it, so a check and
/// its commit are one critical section. The by-id index is only written while
/// the owning room's lock is held and each entry is replaced whole, which gives
/// readers a consistent view without touching room locks.
pub struct BookingStore {
    rooms: DashMap<RoomId, SharedSchedule>,
    bookings: DashMap<BookingId, Booking>,
}

impl Default for BookingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingStore {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            bookings: DashMap::new(),
        }
    }

    /// Install already-committed bookings as-is. No conflict validation.
    pub fn from_bookings(bookings: impl IntoIterator<Item = Booking>) -> Self {
        let mut by_room: HashMap<RoomId, RoomSchedule> = HashMap::new();
        let store = Self::new();
        for booking in bookings {
            store.bookings.insert(booking.id, booking.clone());
            by_room
                .entry(booking.room_id.clone())
                .or_insert_with(|| RoomSchedule::new(booking.room_id.clone()))
                .insert(booking);
        }
        for (room_id, schedule) in by_room {
            store.rooms.insert(room_id, Arc::new(RwLock::new(schedule)));
        }
        store
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    pub fn contains(&self, id: BookingId) -> bool {
        self.bookings.contains_key(&id)
    }

    fn get_schedule(&self, room_id: &RoomId) -> Option<SharedSchedule> {
        self.rooms.get(room_id).map(|e| e.value().clone())
    }

    fn schedule_or_create(&self, room_id: &RoomId) -> SharedSchedule {
        if let Some(schedule) = self.get_schedule(room_id) {
            return schedule;
        }
        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| Arc::new(RwLock::new(RoomSchedule::new(room_id.clone()))))
            .value()
            .clone()
    }

    /// Lookup booking → room, acquire that room's write lock.
    async fn lock_room_of(
        &self,
        id: BookingId,
    ) -> Result<tokio::sync::OwnedRwLockWriteGuard<RoomSchedule>, BookingError> {
        let room_id = self
            .bookings
            .get(&id)
            .map(|e| e.value().room_id.clone())
            .ok_or(BookingError::BookingNotFound(id))?;
        let schedule = self
            .get_schedule(&room_id)
            .ok_or(BookingError::BookingNotFound(id))?;
        Ok(schedule.write_owned().await)
    }

    // ── Atomic compound writes ───────────────────────────────

    /// Run `check` against the room's schedule and insert `booking` if it passes.
    pub async fn try_insert<F>(&self, booking: Booking, check: F) -> Result<Booking, BookingError>
    where
        F: FnOnce(&RoomSchedule, &Span) -> Result<(), BookingError> + Send,
    {
        let schedule = self.schedule_or_create(&booking.room_id);
        let mut guard = schedule.write().await;
        if guard.active_len() >= MAX_BOOKINGS_PER_ROOM {
            return Err(BookingError::LimitExceeded("too many bookings on room"));
        }

        check(&*guard, &booking.span)?;

        guard.insert(booking.clone());
        self.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    /// Move booking `id` to `span` if `check` passes, keeping id, room,
    /// status and creation time.
    pub async fn try_replace<F>(&self, id: BookingId, span: Span, check: F) -> Result<Booking, BookingError>
    where
        F: FnOnce(&RoomSchedule, &Span, &Booking) -> Result<(), BookingError> + Send,
    {
        let mut guard = self.lock_room_of(id).await?;
        let current = guard.get(id).ok_or(BookingError::BookingNotFound(id))?;

        check(&*guard, &span, current)?;

        // Re-insert to keep the schedule sorted; both steps happen under the lock.
        let mut updated = guard.remove(id).ok_or(BookingError::BookingNotFound(id))?;
        updated.span = span;
        guard.insert(updated.clone());
        self.bookings.insert(id, updated.clone());
        Ok(updated)
    }

    /// Move booking `id` to status `to` if the state machine allows it and
    /// `check` passes.
    pub async fn try_transition<F>(
        &self,
        id: BookingId,
        to: BookingStatus,
        at: Instant,
        check: F,
    ) -> Result<Booking, BookingError>
    where
        F: FnOnce(&Booking) -> Result<(), BookingError> + Send,
    {
        let mut guard = self.lock_room_of(id).await?;
        let booking = guard.get_mut(id).ok_or(BookingError::BookingNotFound(id))?;

        let mut next = booking.clone();
        next.transition(to, at)?;
        check(&*booking)?;

        *booking = next.clone();
        self.bookings.insert(id, next.clone());
        Ok(next)
    }

    /// Hard-remove booking `id` regardless of status.
    pub async fn remove(&self, id: BookingId) -> Result<Booking, BookingError> {
        let mut guard = self.lock_room_of(id).await?;
        let removed = guard.remove(id).ok_or(BookingError::BookingNotFound(id))?;
        self.bookings.remove(&id);
        Ok(removed)
    }

    // ── Reads ────────────────────────────────────────────────

    pub fn by_id(&self, id: BookingId) -> Option<Booking> {
        self.bookings.get(&id).map(|e| e.value().clone())
    }

    /// Snapshot of every booking, sorted by start time.
    pub fn all(&self) -> Vec<Booking> {
        let mut all: Vec<Booking> = self.bookings.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.span.start.cmp(&b.span.start).then(a.id.cmp(&b.id)));
        all
    }

    /// Bookings of one room, sorted by start time.
    pub async fn room_bookings(&self, room_id: &RoomId) -> Vec<Booking> {
        let Some(schedule) = self.get_schedule(room_id) else {
            return Vec::new();
        };
        let guard = schedule.read().await;
        guard.bookings.clone()
    }

    pub async fn is_free(&self, room_id: &RoomId, span: &Span, exclude: Option<BookingId>) -> bool {
        let Some(schedule) = self.get_schedule(room_id) else {
            return true;
        };
        let guard = schedule.read().await;
        conflict::is_room_free(&guard, span, exclude)
    }

    pub async fn free_windows(&self, room_id: &RoomId, window: &Span) -> Vec<Span> {
        let Some(schedule) = self.get_schedule(room_id) else {
            return vec![*window];
        };
        let guard = schedule.read().await;
        availability::free_windows(&guard, window)
    }

    /// Approved bookings whose end is at or before `now`.
    pub fn elapsed_approved(&self, now: Instant) -> Vec<BookingId> {
        self.bookings
            .iter()
            .filter(|e| e.value().status == BookingStatus::Approved && e.value().span.end <= now)
            .map(|e| *e.key())
            .collect()
    }
}
