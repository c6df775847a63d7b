use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::limits::EVENT_CHANNEL_CAPACITY;
use crate::model::{BookingEvent, RoomId};

/// Broadcast hub for committed booking events, one channel per room.
pub struct NotifyHub {
    channels: DashMap<RoomId, broadcast::Sender<BookingEvent>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to events for a room. Creates the channel if needed.
    pub fn subscribe(&self, room_id: &RoomId) -> broadcast::Receiver<BookingEvent> {
        let sender = self
            .channels
            .entry(room_id.clone())
            .or_insert_with(|| broadcast::channel(EVENT_CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send an event to its room's subscribers. No-op if nobody is listening.
    pub fn send(&self, event: &BookingEvent) {
        if let Some(sender) = self.channels.get(event.room_id()) {
            let _ = sender.send(event.clone());
        }
    }
}
