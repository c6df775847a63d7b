use tracing::info;
use ulid::Ulid;

use crate::model::*;

use super::conflict::{check_no_conflict, check_reschedule, validate_not_past, validate_span};
use super::{record_op, BookingError, BookingManager};

impl BookingManager {
    /// Admit a new booking. Auto-approved on success.
    ///
    /// Fails with a validation error for an empty/inverted range or a start in
    /// the past, not-found for an unknown or inactive room, and conflict when
    /// an active booking already overlaps the range.
    pub async fn create_booking(&self, request: BookingRequest) -> Result<Booking, BookingError> {
        let started = std::time::Instant::now();
        let result = self.admit(request).await;
        record_op("create", started, &result);
        result
    }

    async fn admit(&self, request: BookingRequest) -> Result<Booking, BookingError> {
        let span = validate_span(request.start, request.end)?;
        let now = self.clock.now();
        validate_not_past(&span, now)?;

        let room = self
            .catalog
            .get_room(&request.room_id)
            .ok_or(BookingError::RoomNotFound(request.room_id))?;
        if !room.is_active {
            return Err(BookingError::RoomInactive(room.id));
        }

        let booking = Booking::new(Ulid::new(), room.id, span, BookingStatus::Approved, now);
        let booking = self
            .store
            .try_insert(booking, |schedule, span| check_no_conflict(schedule, span, None))
            .await?;

        info!(booking = %booking.id, room = %booking.room_id, "booked {}", booking.span);
        self.committed(BookingEvent::Created(booking.clone()));
        Ok(booking)
    }

    /// Move a booking to a new range, keeping its id, room, status and
    /// creation time. The booking's own current range never conflicts with
    /// the new one.
    pub async fn update_booking(
        &self,
        id: BookingId,
        new_start: Instant,
        new_end: Instant,
    ) -> Result<Booking, BookingError> {
        let started = std::time::Instant::now();
        let result = self.reschedule(id, new_start, new_end).await;
        record_op("update", started, &result);
        result
    }

    async fn reschedule(&self, id: BookingId, new_start: Instant, new_end: Instant) -> Result<Booking, BookingError> {
        if !self.store.contains(id) {
            return Err(BookingError::BookingNotFound(id));
        }
        let span = validate_span(new_start, new_end)?;
        let now = self.clock.now();

        let booking = self
            .store
            .try_replace(id, span, |schedule, span, current| {
                check_reschedule(schedule, span, current, now)
            })
            .await?;

        info!(booking = %id, room = %booking.room_id, "rescheduled to {}", booking.span);
        self.committed(BookingEvent::Updated(booking.clone()));
        Ok(booking)
    }

    /// Cancel a Pending or Approved booking, stamping `cancelled_at`.
    /// Cancelling a Completed, Rejected or already Cancelled booking is an
    /// invalid state transition.
    pub async fn cancel_booking(&self, id: BookingId) -> Result<Booking, BookingError> {
        let started = std::time::Instant::now();
        let result = self
            .store
            .try_transition(id, BookingStatus::Cancelled, self.clock.now(), |_| Ok(()))
            .await;
        if let Ok(booking) = &result {
            info!(booking = %id, room = %booking.room_id, "cancelled");
            self.committed(BookingEvent::Cancelled(booking.clone()));
        }
        record_op("cancel", started, &result);
        result
    }

    /// Mark an Approved booking Completed. Only allowed once it has ended.
    pub async fn complete_booking(&self, id: BookingId) -> Result<Booking, BookingError> {
        let started = std::time::Instant::now();
        let now = self.clock.now();
        let result = self
            .store
            .try_transition(id, BookingStatus::Completed, now, |booking| {
                if booking.span.end > now {
                    return Err(BookingError::validation(
                        "end_time",
                        format!("booking {} runs until {}", booking.id, booking.span.end),
                    ));
                }
                Ok(())
            })
            .await;
        if let Ok(booking) = &result {
            info!(booking = %id, room = %booking.room_id, "completed");
            self.committed(BookingEvent::Completed(booking.clone()));
        }
        record_op("complete", started, &result);
        result
    }

    /// Hard-remove a booking in any status.
    pub async fn delete_booking(&self, id: BookingId) -> Result<Booking, BookingError> {
        let started = std::time::Instant::now();
        let result = self.store.remove(id).await;
        if let Ok(booking) = &result {
            info!(booking = %id, room = %booking.room_id, "deleted");
            self.committed(BookingEvent::Deleted {
                id,
                room_id: booking.room_id.clone(),
            });
        }
        record_op("delete", started, &result);
        result
    }
}
