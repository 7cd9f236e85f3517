use super::room_name;
use crate::room::Room;
use crate::session::SocketClient;
use crate::session::SocketGroup;
use serde_json::json;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use tokio::sync::RwLock;

/// The process-global service: the room registry plus the lobby fanout.
///
/// Rooms are keyed by unique name. Every connected session subscribes to
/// compact room summaries (open/close, roster size, game on/off,
/// visibility) so the lobby screen stays current without polling. Session
/// ids come from one monotonic counter.
pub struct Lobby {
    me: std::sync::Weak<Lobby>,
    rooms: RwLock<HashMap<String, Arc<Room>>>,
    subscribers: Mutex<SocketGroup>,
    sessions: AtomicU64,
}

impl Lobby {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            rooms: RwLock::new(HashMap::new()),
            subscribers: Mutex::new(SocketGroup::new()),
            sessions: AtomicU64::new(0),
        })
    }

    pub fn next_session(&self) -> u64 {
        self.sessions.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn subscribe(&self, client: Arc<SocketClient>) {
        self.subscribers.lock().expect("subscribers lock").add(client);
    }

    pub fn unsubscribe(&self, id: u64) {
        self.subscribers.lock().expect("subscribers lock").remove(id);
    }

    /// Open a room under the requested name, or a generated one. Returns
    /// None when the requested name is taken.
    pub async fn create(&self, requested: Option<String>) -> Option<Arc<Room>> {
        let mut rooms = self.rooms.write().await;
        let name = match requested.map(|name| {
            name.chars()
                .take(crate::NAME_MAX_LENGTH)
                .collect::<String>()
                .trim()
                .to_string()
        }) {
            Some(name) if !name.is_empty() => {
                if rooms.contains_key(&name) {
                    return None;
                }
                name
            }
            _ => loop {
                let name = room_name();
                if !rooms.contains_key(&name) {
                    break name;
                }
            },
        };
        let room = Room::new(name.clone(), self.me.clone());
        rooms.insert(name.clone(), room.clone());
        drop(rooms);
        log::info!("opened room {:?}", name);
        self.broadcast(
            "room:open",
            json!({ "name": name, "players": 0, "game": false, "open": true }),
        );
        Some(room)
    }

    pub async fn get(&self, name: &str) -> Option<Arc<Room>> {
        self.rooms.read().await.get(name).cloned()
    }

    pub async fn remove(&self, name: &str) -> bool {
        let removed = self.rooms.write().await.remove(name).is_some();
        if removed {
            log::info!("closed room {:?}", name);
            self.broadcast("room:close", json!({ "name": name }));
        }
        removed
    }

    /// Replay the whole room list to one session.
    pub async fn fetch(&self, client: &Arc<SocketClient>) {
        let rooms = self.rooms.read().await;
        let mut events = Vec::with_capacity(rooms.len());
        for room in rooms.values() {
            let state = room.state.lock().await;
            events.push(json!(["room:open", state.serialize(&room.name, false)]));
        }
        client.add_events(events);
    }

    /// Full disconnect cascade: silence the session, detach it from its
    /// room so its avatars die before the next tick, and forget it.
    pub async fn disconnect(&self, client: &Arc<SocketClient>) {
        client.close();
        if let Some(room) = client.room() {
            room.detach(client).await;
        }
        self.unsubscribe(client.id);
        log::info!("client {} disconnected", client.id);
    }

    pub fn broadcast(&self, name: &str, data: Value) {
        self.subscribers.lock().expect("subscribers lock").add_event(name, data);
    }

    pub fn room_players(&self, room: &str, players: usize) {
        self.broadcast("room:players", json!({ "name": room, "players": players }));
    }

    pub fn room_game(&self, room: &str, game: bool) {
        self.broadcast("room:game", json!({ "name": room, "game": game }));
    }

    pub fn room_config_open(&self, room: &str, open: bool) {
        self.broadcast("room:config:open", json!({ "name": room, "open": open }));
    }
}

#[cfg(test)]
mod lobby_tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn session_ids_are_monotonic() {
        let lobby = Lobby::new();
        assert_eq!(lobby.next_session(), 1);
        assert_eq!(lobby.next_session(), 2);
    }

    #[tokio::test]
    async fn names_are_unique() {
        let lobby = Lobby::new();
        assert!(lobby.create(Some("arena".into())).await.is_some());
        assert!(lobby.create(Some("arena".into())).await.is_none());
        assert!(lobby.create(Some("  arena  ".into())).await.is_none());
        assert!(lobby.get("arena").await.is_some());
        assert!(lobby.remove("arena").await);
        assert!(!lobby.remove("arena").await);
        assert!(lobby.get("arena").await.is_none());
    }

    #[tokio::test]
    async fn generated_names_fill_in() {
        let lobby = Lobby::new();
        let room = lobby.create(None).await.expect("generated name");
        assert!(room.name.starts_with("The "));
    }

    #[tokio::test]
    async fn lobby_broadcasts_room_lifecycle() {
        let lobby = Lobby::new();
        let (tx, mut rx) = unbounded_channel();
        let client = SocketClient::new(lobby.next_session(), tx, Duration::ZERO);
        lobby.subscribe(client.clone());
        lobby.create(Some("arena".into())).await;
        let frame = rx.recv().await.expect("frame");
        assert!(frame.contains("room:open"));
        assert!(frame.contains("arena"));
        lobby.remove("arena").await;
        let frame = rx.recv().await.expect("frame");
        assert!(frame.contains("room:close"));
        lobby.unsubscribe(client.id);
        lobby.room_game("arena", true);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn fetch_replays_all_rooms() {
        let lobby = Lobby::new();
        lobby.create(Some("one".into())).await;
        lobby.create(Some("two".into())).await;
        let (tx, mut rx) = unbounded_channel();
        let client = SocketClient::new(9, tx, Duration::ZERO);
        let frame = {
            lobby.fetch(&client).await;
            rx.recv().await.expect("frame")
        };
        assert!(frame.contains("one"));
        assert!(frame.contains("two"));
    }
}
