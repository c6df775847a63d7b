pub mod catalog;
pub mod clock;
pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod persistence;
pub mod sweeper;

pub use engine::{BookingError, BookingManager, ErrorKind};
