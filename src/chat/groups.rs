use std::{collections::HashMap, sync::Arc};

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::event::ChatEvent;

/// Outbound frames buffered per session before a lagging client starts
/// dropping events.
const SESSION_BUFFER: usize = 64;

/// Per-room fan-out: a concurrent map of room id to the sender handles of
/// every session currently joined to it. Delivery never blocks on a slow
/// receiver; their copy of the event is dropped instead.
#[derive(Clone, Default)]
pub struct RoomGroups {
    rooms: Arc<RwLock<HashMap<Uuid, HashMap<Uuid, mpsc::Sender<Arc<String>>>>>>,
}

impl RoomGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session with a room and returns its delivery channel.
    pub async fn join(&self, room_id: Uuid, session_id: Uuid) -> mpsc::Receiver<Arc<String>> {
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        self.rooms.write().await.entry(room_id).or_default().insert(session_id, tx);
        rx
    }

    /// Idempotent: removing an unknown session is a no-op, and the room keeps
    /// its (possibly empty) entry.
    pub async fn leave(&self, room_id: Uuid, session_id: Uuid) {
        if let Some(handles) = self.rooms.write().await.get_mut(&room_id) {
            handles.remove(&session_id);
        }
    }

    /// Serializes `event` once and hands it to every session in the room.
    pub async fn broadcast(&self, room_id: Uuid, event: &ChatEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(json) => Arc::new(json),
            Err(e) => {
                warn!("unserializable event: {e}");
                return;
            }
        };

        let rooms = self.rooms.read().await;
        let Some(handles) = rooms.get(&room_id) else {
            return;
        };
        for (session_id, tx) in handles {
            match tx.try_send(Arc::clone(&payload)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(%session_id, "session lagging, dropping event")
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(%session_id, "session gone, skipping")
                }
            }
        }
    }

    pub async fn member_count(&self, room_id: Uuid) -> usize {
        self.rooms.read().await.get(&room_id).map_or(0, HashMap::len)
    }
}
