use crate::model::*;

use super::BookingError;

/// Half-open overlap test: `[a_start, a_end)` against `[b_start, b_end)`.
pub fn overlaps(a_start: Instant, a_end: Instant, b_start: Instant, b_end: Instant) -> bool {
    a_start < b_end && b_start < a_end
}

/// Build a span from caller input, rejecting empty/inverted ranges.
pub(crate) fn validate_span(start: Instant, end: Instant) -> Result<Span, BookingError> {
    use crate::limits::MAX_BOOKING_SECS;
    if start >= end {
        return Err(BookingError::validation(
            "end_time",
            format!("end {end} must be after start {start}"),
        ));
    }
    let span = Span::new(start, end);
    if span.duration().num_seconds() > MAX_BOOKING_SECS {
        return Err(BookingError::LimitExceeded("booking too long"));
    }
    Ok(span)
}

pub(crate) fn validate_not_past(span: &Span, now: Instant) -> Result<(), BookingError> {
    if span.start < now {
        return Err(BookingError::validation(
            "start_time",
            format!("start {} is in the past", span.start),
        ));
    }
    Ok(())
}

pub(crate) fn validate_query_window(start: Instant, end: Instant) -> Result<Span, BookingError> {
    use crate::limits::MAX_QUERY_WINDOW_SECS;
    if start >= end {
        return Err(BookingError::validation(
            "end_time",
            format!("end {end} must be after start {start}"),
        ));
    }
    let span = Span::new(start, end);
    if span.duration().num_seconds() > MAX_QUERY_WINDOW_SECS {
        return Err(BookingError::LimitExceeded("query window too wide"));
    }
    Ok(span)
}

/// First active booking in the schedule that overlaps `span`, skipping `exclude`.
pub fn find_conflict<'a>(
    schedule: &'a RoomSchedule,
    span: &Span,
    exclude: Option<BookingId>,
) -> Option<&'a Booking> {
    schedule
        .active_overlapping(span)
        .find(|b| Some(b.id) != exclude)
}

pub fn is_room_free(schedule: &RoomSchedule, span: &Span, exclude: Option<BookingId>) -> bool {
    find_conflict(schedule, span, exclude).is_none()
}

/// Conflict check run inside the room's critical section.
pub(crate) fn check_no_conflict(
    schedule: &RoomSchedule,
    span: &Span,
    exclude: Option<BookingId>,
) -> Result<(), BookingError> {
    match find_conflict(schedule, span, exclude) {
        Some(existing) => Err(BookingError::Conflict {
            room_id: schedule.room_id.clone(),
            requested: *span,
            existing: existing.id,
            existing_span: existing.span,
        }),
        None => Ok(()),
    }
}

/// Reschedule check run inside the room's critical section, against the
/// locked copy of the booking. An unchanged start skips the past-start rule
/// so an ongoing booking can move its end.
pub(crate) fn check_reschedule(
    schedule: &RoomSchedule,
    span: &Span,
    current: &Booking,
    now: Instant,
) -> Result<(), BookingError> {
    if span.start != current.span.start {
        validate_not_past(span, now)?;
    }
    check_no_conflict(schedule, span, Some(current.id))
}
