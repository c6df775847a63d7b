use std::fmt;
use std::ops::BitOr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Absolute instant, always UTC.
pub type Instant = DateTime<Utc>;

/// Opaque booking identity.
pub type BookingId = Ulid;

/// Stable room identity, e.g. `CR001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Instant,
    pub end: Instant,
}

impl Span {
    pub fn new(start: Instant, end: Instant) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Back-to-back spans (one ends where the other starts) do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        crate::engine::overlaps(self.start, self.end, other.start, other.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
            self.end.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
        )
    }
}

// ── Rooms ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    #[default]
    Standard,
    Premium,
    Executive,
    Boardroom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Amenity {
    Projector,
    Whiteboard,
    VideoConference,
    SpeakerPhone,
    AirConditioning,
    NaturalLight,
    CoffeeMachine,
}

impl Amenity {
    pub const ALL: [Amenity; 7] = [
        Amenity::Projector,
        Amenity::Whiteboard,
        Amenity::VideoConference,
        Amenity::SpeakerPhone,
        Amenity::AirConditioning,
        Amenity::NaturalLight,
        Amenity::CoffeeMachine,
    ];

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// Bit set of [`Amenity`] flags. Serialized as a list of amenity names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Amenity>", into = "Vec<Amenity>")]
pub struct Amenities(u8);

impl Amenities {
    pub const NONE: Amenities = Amenities(0);

    pub fn with(self, amenity: Amenity) -> Self {
        Self(self.0 | amenity.bit())
    }

    pub fn contains(self, amenity: Amenity) -> bool {
        self.0 & amenity.bit() != 0
    }

    /// True if every flag in `other` is also set here.
    pub fn contains_all(self, other: Amenities) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Amenity> {
        Amenity::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

impl BitOr for Amenity {
    type Output = Amenities;

    fn bitor(self, rhs: Amenity) -> Amenities {
        Amenities::NONE.with(self).with(rhs)
    }
}

impl BitOr<Amenity> for Amenities {
    type Output = Amenities;

    fn bitor(self, rhs: Amenity) -> Amenities {
        self.with(rhs)
    }
}

impl From<Amenity> for Amenities {
    fn from(a: Amenity) -> Self {
        Amenities::NONE.with(a)
    }
}

impl FromIterator<Amenity> for Amenities {
    fn from_iter<I: IntoIterator<Item = Amenity>>(iter: I) -> Self {
        iter.into_iter().fold(Amenities::NONE, Amenities::with)
    }
}

impl From<Vec<Amenity>> for Amenities {
    fn from(v: Vec<Amenity>) -> Self {
        v.into_iter().collect()
    }
}

impl From<Amenities> for Vec<Amenity> {
    fn from(a: Amenities) -> Self {
        a.iter().collect()
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub capacity: u32,
    #[serde(default)]
    pub room_type: RoomType,
    #[serde(default)]
    pub amenities: Amenities,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl Room {
    pub fn new(id: impl Into<RoomId>, name: impl Into<String>, capacity: u32, room_type: RoomType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capacity,
            room_type,
            amenities: Amenities::NONE,
            location: None,
            is_active: true,
        }
    }

    pub fn with_amenities(mut self, amenities: impl Into<Amenities>) -> Self {
        self.amenities = amenities.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn has_amenity(&self, amenity: Amenity) -> bool {
        self.amenities.contains(amenity)
    }
}

// ── Bookings ─────────────────────────────────────────────────────

/// Lifecycle state of a booking. Transitions live in `engine::lifecycle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    Completed,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Approved => "Approved",
            BookingStatus::Rejected => "Rejected",
            BookingStatus::Cancelled => "Cancelled",
            BookingStatus::Completed => "Completed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub room_id: RoomId,
    pub span: Span,
    pub status: BookingStatus,
    pub created_at: Instant,
    #[serde(default)]
    pub cancelled_at: Option<Instant>,
}

impl Booking {
    pub fn new(id: BookingId, room_id: RoomId, span: Span, status: BookingStatus, created_at: Instant) -> Self {
        Self {
            id,
            room_id,
            span,
            status,
            created_at,
            cancelled_at: None,
        }
    }

    /// Whether this booking currently occupies its slot exclusively.
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Input to `create_booking`. Consumed once, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub room_id: RoomId,
    pub start: Instant,
    pub end: Instant,
}

impl BookingRequest {
    pub fn new(room_id: impl Into<RoomId>, start: Instant, end: Instant) -> Self {
        Self {
            room_id: room_id.into(),
            start,
            end,
        }
    }
}

/// Committed change to a room's bookings, broadcast after the lock is released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingEvent {
    Created(Booking),
    Updated(Booking),
    Cancelled(Booking),
    Completed(Booking),
    Deleted { id: BookingId, room_id: RoomId },
}

impl BookingEvent {
    pub fn room_id(&self) -> &RoomId {
        match self {
            BookingEvent::Created(b)
            | BookingEvent::Updated(b)
            | BookingEvent::Cancelled(b)
            | BookingEvent::Completed(b) => &b.room_id,
            BookingEvent::Deleted { room_id, .. } => room_id,
        }
    }
}

// ── Per-room schedule ────────────────────────────────────────────

/// All bookings of one room, sorted by `span.start`.
#[derive(Debug, Clone)]
pub struct RoomSchedule {
    pub room_id: RoomId,
    pub bookings: Vec<Booking>,
}

impl RoomSchedule {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            bookings: Vec::new(),
        }
    }

    /// Insert booking maintaining sort order by span.start.
    pub fn insert(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.span.start, |b| b.span.start)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn remove(&mut self, id: BookingId) -> Option<Booking> {
        let pos = self.bookings.iter().position(|b| b.id == id)?;
        Some(self.bookings.remove(pos))
    }

    pub fn get(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: BookingId) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    /// Pending and Approved bookings only. Cancelled and finished history
    /// does not count.
    pub fn active_len(&self) -> usize {
        self.bookings.iter().filter(|b| b.is_active()).count()
    }

    /// Bookings (of any status) whose span overlaps the query window.
    /// Uses binary search to skip bookings starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Booking> {
        let right_bound = self.bookings.partition_point(|b| b.span.start < query.end);
        let query = *query;
        self.bookings[..right_bound]
            .iter()
            .filter(move |b| b.span.overlaps(&query))
    }

    /// Active bookings overlapping the query window.
    pub fn active_overlapping(&self, query: &Span) -> impl Iterator<Item = &Booking> {
        self.overlapping(query).filter(|b| b.is_active())
    }
}
