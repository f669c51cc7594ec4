use crate::game::GameRoom;
use crate::protocol::{Outbound, Recipient, RoomSummary, ServerMessage};
use crate::types::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::AbortHandle;

const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;

fn generate_room_code(rng: &mut StdRng) -> RoomCode {
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// A registered room: its state behind a lock, its notification channel and
/// the timers scheduled on its behalf
pub struct RoomHandle {
    pub code: RoomCode,
    pub room: Mutex<GameRoom>,
    pub events: broadcast::Sender<Outbound>,
    timers: StdMutex<Vec<AbortHandle>>,
}

impl RoomHandle {
    fn new(room: GameRoom) -> Self {
        let (tx, _rx) = broadcast::channel(256);
        Self {
            code: room.code.clone(),
            room: Mutex::new(room),
            events: tx,
            timers: StdMutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.events.subscribe()
    }

    /// Send to everyone in the room. No receivers is fine.
    pub fn notify_room(&self, message: ServerMessage) {
        let _ = self.events.send(Outbound {
            recipient: Recipient::Room,
            message,
        });
    }

    pub fn notify_player(&self, player_id: &str, message: ServerMessage) {
        let _ = self.events.send(Outbound {
            recipient: Recipient::Player(player_id.to_string()),
            message,
        });
    }

    pub fn track(&self, timer: AbortHandle) {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        timers.retain(|t| !t.is_finished());
        timers.push(timer);
    }

    pub fn abort_timers(&self) {
        let mut timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        for timer in timers.drain(..) {
            timer.abort();
        }
    }

    pub fn pending_timers(&self) -> usize {
        let timers = self.timers.lock().unwrap_or_else(|e| e.into_inner());
        timers.iter().filter(|t| !t.is_finished()).count()
    }
}

/// All live rooms, keyed by their join code
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: Arc<RwLock<HashMap<RoomCode, Arc<RoomHandle>>>>,
    /// Seeds every room's own generator and the room codes
    rng: Arc<Mutex<StdRng>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Deterministic registry for tests
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Create a room hosted by `host_id`. A blank name gets a generated one.
    pub async fn create(
        &self,
        name: Option<String>,
        host_id: PlayerId,
        host_name: Option<String>,
    ) -> crate::error::GameResult<Arc<RoomHandle>> {
        let name = match name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => crate::game::room::clean_name(n)?,
            _ => petname::petname(2, " ").unwrap_or_else(|| "Game room".to_string()),
        };

        let mut rng = self.rng.lock().await;
        let mut rooms = self.rooms.write().await;

        let code = loop {
            let code = generate_room_code(&mut rng);
            if !rooms.contains_key(&code) {
                break code;
            }
            // Collision, draw again
        };

        let room_rng = StdRng::seed_from_u64(rng.random());
        let room = GameRoom::new(code.clone(), name, host_id, host_name, room_rng)?;
        let handle = Arc::new(RoomHandle::new(room));
        rooms.insert(code.clone(), handle.clone());

        tracing::info!(room = %code, total = rooms.len(), "Room created");
        Ok(handle)
    }

    pub async fn get(&self, code: &str) -> Option<Arc<RoomHandle>> {
        let code = code.trim().to_uppercase();
        self.rooms.read().await.get(&code).cloned()
    }

    /// Unregister a room and cancel everything scheduled for it
    pub async fn remove(&self, code: &str) -> Option<Arc<RoomHandle>> {
        let handle = self.rooms.write().await.remove(code)?;
        handle.abort_timers();
        tracing::info!(room = %code, "Room removed");
        Some(handle)
    }

    /// True while this exact handle is still the one registered under its code
    pub async fn is_live(&self, handle: &Arc<RoomHandle>) -> bool {
        self.rooms
            .read()
            .await
            .get(&handle.code)
            .is_some_and(|h| Arc::ptr_eq(h, handle))
    }

    pub async fn count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Rooms still in the lobby whose name contains `query` (case-insensitive)
    pub async fn list(&self, query: Option<&str>) -> Vec<RoomSummary> {
        // Collect handles first; room locks are never taken under the registry lock
        let handles: Vec<Arc<RoomHandle>> = self.rooms.read().await.values().cloned().collect();
        let query = query
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        let mut summaries = Vec::new();
        for handle in handles {
            let room = handle.room.lock().await;
            if room.phase != GamePhase::Waiting {
                continue;
            }
            if let Some(q) = &query {
                if !room.name.to_lowercase().contains(q.as_str()) {
                    continue;
                }
            }
            summaries.push(room.summary());
        }
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
