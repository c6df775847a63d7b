//! Booking status state machine.
//!
//! ```text
//! Pending ──► Approved ──► Completed
//!    │           │
//!    ├──► Rejected
//!    └───────────┴──► Cancelled
//! ```
//!
//! Rejected, Cancelled and Completed are terminal. Nothing ever moves back to
//! Pending.

use crate::model::{Booking, BookingStatus, Instant};

use super::BookingError;

impl BookingStatus {
    /// Pending and Approved bookings hold their slot; nothing else does.
    pub fn is_active(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Approved)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected | BookingStatus::Cancelled | BookingStatus::Completed
        )
    }

    pub fn can_transition_to(self, to: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, to),
            (Pending, Approved) | (Pending, Rejected) | (Pending, Cancelled) | (Approved, Cancelled) | (Approved, Completed)
        )
    }
}

impl Booking {
    /// Apply a status change, stamping `cancelled_at` on entry into Cancelled.
    /// Leaves the booking untouched on failure.
    pub fn transition(&mut self, to: BookingStatus, at: Instant) -> Result<(), BookingError> {
        if !self.status.can_transition_to(to) {
            return Err(BookingError::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        if to == BookingStatus::Cancelled {
            self.cancelled_at = Some(at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RoomId, Span};
    use chrono::{TimeDelta, TimeZone, Utc};
    use ulid::Ulid;
    use BookingStatus::*;

    const ALL: [BookingStatus; 5] = [Pending, Approved, Rejected, Cancelled, Completed];

    fn booking(status: BookingStatus) -> Booking {
        let t = Utc.with_ymd_and_hms(2030, 1, 1, 10, 0, 0).unwrap();
        Booking::new(
            Ulid::new(),
            RoomId::from("R1"),
            Span::new(t, t + TimeDelta::hours(1)),
            status,
            t - TimeDelta::days(1),
        )
    }

    #[test]
    fn active_set() {
        let active: Vec<_> = ALL.into_iter().filter(|s| s.is_active()).collect();
        assert_eq!(active, vec![Pending, Approved]);
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for from in [Rejected, Cancelled, Completed] {
            assert!(from.is_terminal());
            for to in ALL {
                assert!(!from.can_transition_to(to), "{from} -> {to} should be illegal");
            }
        }
    }

    #[test]
    fn never_back_to_pending() {
        for from in ALL {
            assert!(!from.can_transition_to(Pending));
        }
    }

    #[test]
    fn transition_table() {
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Approved.can_transition_to(Cancelled));
        assert!(Approved.can_transition_to(Completed));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn cancel_stamps_cancelled_at() {
        let mut b = booking(Approved);
        let at = Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap();
        b.transition(Cancelled, at).unwrap();
        assert_eq!(b.status, Cancelled);
        assert_eq!(b.cancelled_at, Some(at));
    }

    #[test]
    fn complete_does_not_stamp_cancelled_at() {
        let mut b = booking(Approved);
        b.transition(Completed, Utc::now()).unwrap();
        assert_eq!(b.status, Completed);
        assert_eq!(b.cancelled_at, None);
    }

    #[test]
    fn failed_transition_leaves_booking_untouched() {
        let mut b = booking(Completed);
        let before = b.clone();
        let err = b.transition(Cancelled, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            BookingError::InvalidTransition { from: Completed, to: Cancelled, .. }
        ));
        assert_eq!(b, before);
    }

    #[test]
    fn cancel_twice_fails() {
        let mut b = booking(Approved);
        let first = Utc::now();
        b.transition(Cancelled, first).unwrap();
        assert!(b.transition(Cancelled, Utc::now()).is_err());
        assert_eq!(b.cancelled_at, Some(first));
    }
}
