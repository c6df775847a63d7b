/// Longest single booking, in seconds (31 days).
pub const MAX_BOOKING_SECS: i64 = 31 * 24 * 3600;

/// Widest window accepted by availability and free-window queries (366 days).
pub const MAX_QUERY_WINDOW_SECS: i64 = 366 * 24 * 3600;

/// Active (Pending or Approved) bookings per room before inserts are refused.
pub const MAX_BOOKINGS_PER_ROOM: usize = 100_000;

/// Capacity of the persistence writer's request queue.
pub const PERSIST_QUEUE_DEPTH: usize = 64;

/// Capacity of each room's event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
