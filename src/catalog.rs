//! Room catalog: read-only room lookup.
//!
//! The booking engine never mutates rooms. A catalog is loaded once (from a
//! JSON file or the built-in seed list) and shared for the process lifetime.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::model::{Amenities, Amenity, Room, RoomId, RoomType};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid room {id:?}: {reason}")]
    InvalidRoom { id: String, reason: &'static str },
    #[error("duplicate room id: {0}")]
    DuplicateRoom(RoomId),
}

/// Source of rooms consulted by the booking engine.
pub trait RoomCatalog: Send + Sync {
    fn get_room(&self, id: &RoomId) -> Option<Room>;

    /// All rooms in a stable order.
    fn list_rooms(&self) -> Vec<Room>;
}

/// Immutable in-memory catalog, listed in insertion order.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    rooms: Vec<Room>,
    index: HashMap<RoomId, usize>,
}

impl StaticCatalog {
    pub fn new(rooms: Vec<Room>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(rooms.len());
        for (pos, room) in rooms.iter().enumerate() {
            validate_room(room)?;
            if index.insert(room.id.clone(), pos).is_some() {
                return Err(CatalogError::DuplicateRoom(room.id.clone()));
            }
        }
        Ok(Self { rooms, index })
    }

    /// Load a JSON array of rooms.
    pub fn load_json(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        let rooms: Vec<Room> = serde_json::from_str(&text)?;
        Self::new(rooms)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl RoomCatalog for StaticCatalog {
    fn get_room(&self, id: &RoomId) -> Option<Room> {
        self.index.get(id).map(|&pos| self.rooms[pos].clone())
    }

    fn list_rooms(&self) -> Vec<Room> {
        self.rooms.clone()
    }
}

fn validate_room(room: &Room) -> Result<(), CatalogError> {
    let invalid = |reason| CatalogError::InvalidRoom {
        id: room.id.to_string(),
        reason,
    };
    if room.id.as_str().trim().is_empty() {
        return Err(invalid("id is empty"));
    }
    if room.name.trim().is_empty() {
        return Err(invalid("name is empty"));
    }
    if room.capacity < 1 {
        return Err(invalid("capacity must be at least 1"));
    }
    Ok(())
}

/// Narrows availability results by room attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomFilter {
    pub min_capacity: Option<u32>,
    /// Every listed amenity must be present.
    pub amenities: Amenities,
}

impl RoomFilter {
    pub fn matches(&self, room: &Room) -> bool {
        self.min_capacity.is_none_or(|min| room.capacity >= min)
            && room.amenities.contains_all(self.amenities)
    }
}

/// Built-in rooms used when no catalog file is configured.
pub fn default_rooms() -> Vec<Room> {
    use Amenity::*;
    vec![
        Room::new("CR001", "Ocean View", 20, RoomType::Premium)
            .with_amenities(Projector | VideoConference | NaturalLight | AirConditioning | CoffeeMachine),
        Room::new("CR002", "Mountain Ridge", 12, RoomType::Standard)
            .with_amenities(Projector | Whiteboard | SpeakerPhone),
        Room::new("CR003", "City Skyline", 8, RoomType::Executive)
            .with_amenities(VideoConference | NaturalLight | CoffeeMachine),
        Room::new("CR004", "Boardroom Alpha", 16, RoomType::Boardroom)
            .with_amenities(Projector | Whiteboard | VideoConference | SpeakerPhone | AirConditioning),
        Room::new("CR005", "River Side", 10, RoomType::Standard).with_amenities(Projector | Whiteboard),
        Room::new("CR006", "Sunset Lounge", 25, RoomType::Premium)
            .with_amenities(VideoConference | NaturalLight | CoffeeMachine | AirConditioning),
        Room::new("CR007", "Tech Hub", 15, RoomType::Executive)
            .with_amenities(Projector | VideoConference | SpeakerPhone),
        Room::new("CR008", "Quiet Zone", 6, RoomType::Standard).with_amenities(NaturalLight),
        Room::new("CR009", "Strategy Room", 18, RoomType::Boardroom)
            .with_amenities(Projector | Whiteboard | VideoConference),
        Room::new("CR010", "Creative Space", 14, RoomType::Executive)
            .with_amenities(CoffeeMachine | NaturalLight | Whiteboard),
    ]
}
