use crate::room::Message;
use crate::room::Player;
use crate::room::Room;
use crate::room::RoomState;
use crate::session::SocketClient;
use serde::Deserialize;
use serde_json::json;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct PlayerAdd {
    name: String,
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlayerTarget {
    player: u64,
}

#[derive(Debug, Deserialize)]
struct PlayerName {
    player: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct PlayerColor {
    player: u64,
    color: String,
}

#[derive(Debug, Deserialize)]
struct ConfigOpen {
    open: bool,
}

#[derive(Debug, Deserialize)]
struct ConfigMaxScore {
    #[serde(rename = "maxScore")]
    max_score: Option<Value>,
}

fn truncate(name: &str) -> String {
    name.chars()
        .take(crate::NAME_MAX_LENGTH)
        .collect::<String>()
        .trim()
        .to_string()
}

/// Room controller: non-game room operations, master authority, the
/// launch countdown, and the empty-room close timer.
impl Room {
    /// Join a session to this room. The ack carries the full room shape,
    /// the master, the member list, and the recent chat.
    pub(crate) async fn attach(&self, client: &Arc<SocketClient>, password: Option<&str>) -> Value {
        let mut state = self.state.lock().await;
        if !state.config.allow(password) {
            return json!({ "success": false, "error": "Wrong password." });
        }
        if !state.clients.add(client.clone()) {
            return json!({
                "success": false,
                "error": format!("Client {} already in the room.", client.id),
            });
        }
        client.set_room(self.me.clone());
        if state.game.is_some() {
            client.add_event("room:game:start", Value::Null);
            self.game_attach(&mut state, client);
        }
        let ack = json!({
            "success": true,
            "room": state.serialize(&self.name, true),
            "master": state.master,
            "clients": Value::Array(state.clients.iter().map(|member| member.serialize()).collect()),
            "messages": state.chat.serialize(crate::CHAT_TAIL),
            "votes": [],
        });
        state.clients.add_event("client:add", json!({ "client": client.serialize() }));
        self.nominate_master(&mut state);
        self.settle(&mut state);
        log::info!("client {} joined room {}", client.id, self.name);
        ack
    }

    /// Leave: kill the session's avatars, dissolve its players, hand off
    /// the master seat, and arm the close timer when the room empties.
    pub(crate) async fn detach(&self, client: &Arc<SocketClient>) {
        let mut state = self.state.lock().await;
        if !state.clients.remove(client.id) {
            return;
        }
        self.game_detach(&mut state, client);
        for player in client.take_players() {
            self.drop_player(&mut state, player);
        }
        client.clear_room();
        if state.master == Some(client.id) {
            state.master = None;
            self.nominate_master(&mut state);
        }
        state.clients.add_event("client:remove", json!(client.id));
        if state.clients.is_empty() {
            self.schedule_close();
        }
        self.settle(&mut state);
        log::info!("client {} left room {}", client.id, self.name);
    }

    fn drop_player(&self, state: &mut RoomState, player: u64) {
        if state.players.remove(player).is_some() {
            state.clients.add_event("room:leave", json!({ "player": player }));
            if let Some(lobby) = self.lobby.upgrade() {
                lobby.room_players(&self.name, state.players.len());
            }
        }
    }

    /// The master seat goes to the first active, playing session whenever
    /// it is vacant.
    fn nominate_master(&self, state: &mut RoomState) {
        if state.master.is_some() {
            return;
        }
        let candidate = state
            .clients
            .iter()
            .find(|client| client.active() && client.is_playing())
            .map(|client| client.id);
        if let Some(master) = candidate {
            state.master = Some(master);
            state.clients.add_event("room:master", json!({ "client": master }));
        }
    }

    /// Close once the room has stayed empty for the grace period. The
    /// timer re-checks at fire time, so a rejoin simply defuses it.
    fn schedule_close(&self) {
        let room = self.me.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(crate::TIME_TO_CLOSE)).await;
            let Some(room) = room.upgrade() else { return };
            let empty = room.state.lock().await.clients.is_empty();
            if empty {
                room.close().await;
            }
        });
    }

    pub(crate) async fn close(&self) {
        {
            let mut state = self.state.lock().await;
            if let Some(launching) = state.launching.take() {
                launching.abort();
            }
            if let Some(mut game) = state.game.take() {
                game.teardown();
            }
        }
        if let Some(lobby) = self.lobby.upgrade() {
            lobby.remove(&self.name).await;
        }
    }
}

// player roster operations
impl Room {
    pub(crate) async fn on_player_add(&self, client: &Arc<SocketClient>, data: Value) -> Value {
        let Ok(payload) = serde_json::from_value::<PlayerAdd>(data) else {
            return json!({ "success": false, "error": "Invalid request." });
        };
        let name = truncate(&payload.name);
        let mut state = self.state.lock().await;
        if name.is_empty() {
            return json!({ "success": false, "error": "Invalid name." });
        }
        if state.game.is_some() {
            return json!({ "success": false, "error": "Game already started." });
        }
        if !state.name_available(&name) {
            return json!({ "success": false, "error": "This username is already used." });
        }
        if !state.clients.contains(client.id) {
            return json!({ "success": false, "error": "Unknown client" });
        }
        let Some(player) = state.players.add(Player::new(client.id, &name, payload.color)) else {
            return json!({ "success": false, "error": "Could not add player." });
        };
        client.add_player(player);
        let serialized = state
            .players
            .get(player)
            .map(|player| player.serialize(client.active()))
            .unwrap_or(Value::Null);
        state.clients.add_event("room:join", json!({ "player": serialized }));
        if let Some(lobby) = self.lobby.upgrade() {
            lobby.room_players(&self.name, state.players.len());
        }
        self.nominate_master(&mut state);
        json!({ "success": true })
    }

    pub(crate) async fn on_player_remove(&self, client: &Arc<SocketClient>, data: Value) -> Value {
        let Ok(payload) = serde_json::from_value::<PlayerTarget>(data) else {
            return json!({ "success": false });
        };
        if !client.players().contains(&payload.player) {
            return json!({ "success": false });
        }
        let mut state = self.state.lock().await;
        client.remove_player(payload.player);
        self.drop_player(&mut state, payload.player);
        if !client.is_playing() && state.master == Some(client.id) {
            state.master = None;
            self.nominate_master(&mut state);
        }
        json!({ "success": true })
    }

    pub(crate) async fn on_players_clear(&self, client: &Arc<SocketClient>) {
        let mut state = self.state.lock().await;
        for player in client.take_players() {
            self.drop_player(&mut state, player);
        }
        if state.master == Some(client.id) {
            state.master = None;
            self.nominate_master(&mut state);
        }
    }

    pub(crate) async fn on_room_ready(&self, client: &Arc<SocketClient>, data: Value) -> Value {
        let Ok(payload) = serde_json::from_value::<PlayerTarget>(data) else {
            return json!({ "success": false, "error": "Invalid request." });
        };
        if !client.players().contains(&payload.player) {
            return json!({
                "success": false,
                "error": format!("Player with id \"{}\" not found", payload.player),
            });
        }
        let mut state = self.state.lock().await;
        let Some(ready) = state.players.get_mut(payload.player).map(|player| {
            player.toggle_ready();
            player.ready
        }) else {
            return json!({ "success": false });
        };
        state
            .clients
            .add_event("player:ready", json!({ "player": payload.player, "ready": ready }));
        // readiness moved under a pending countdown: abort the launch
        self.cancel_launch(&mut state);
        json!({ "success": true, "ready": ready })
    }

    pub(crate) async fn on_color(&self, client: &Arc<SocketClient>, data: Value) -> Value {
        let Ok(payload) = serde_json::from_value::<PlayerColor>(data) else {
            return json!({ "success": false });
        };
        if !client.players().contains(&payload.player) {
            return json!({ "success": false });
        }
        let mut state = self.state.lock().await;
        let Some((success, color)) = state.players.get_mut(payload.player).map(|player| {
            let success = player.set_color(&payload.color);
            (success, player.color.clone())
        }) else {
            return json!({ "success": false });
        };
        if success {
            state
                .clients
                .add_event("player:color", json!({ "player": payload.player, "color": color }));
        }
        json!({ "success": success, "color": color })
    }

    pub(crate) async fn on_name(&self, client: &Arc<SocketClient>, data: Value) -> Value {
        let Ok(payload) = serde_json::from_value::<PlayerName>(data) else {
            return json!({ "success": false, "error": "Invalid request." });
        };
        let name = truncate(&payload.name);
        let mut state = self.state.lock().await;
        if !client.players().contains(&payload.player) {
            return json!({ "success": false, "error": format!("Unknown player: \"{}\"", name) });
        }
        let current = state
            .players
            .get(payload.player)
            .map(|player| player.name.clone())
            .unwrap_or_default();
        if name.is_empty() {
            return json!({ "success": false, "error": "Invalid name.", "name": current });
        }
        if !state.name_available(&name) {
            return json!({
                "success": false,
                "error": "This username is already used.",
                "name": current,
            });
        }
        if let Some(player) = state.players.get_mut(payload.player) {
            player.set_name(name.clone());
        }
        state
            .clients
            .add_event("player:name", json!({ "player": payload.player, "name": name }));
        json!({ "success": true, "name": name })
    }

    pub(crate) async fn on_talk(&self, client: &Arc<SocketClient>, data: Value) -> Value {
        let Some(content) = data.as_str() else {
            return json!({ "success": false });
        };
        let mut state = self.state.lock().await;
        let message = Message::new(client.id, content);
        state.clients.add_event("room:talk", message.serialize());
        state.chat.add(message);
        json!({ "success": true })
    }
}

// master-only configuration and launch
impl Room {
    pub(crate) async fn on_config_open(&self, client: &Arc<SocketClient>, data: Value) -> Value {
        let Ok(payload) = serde_json::from_value::<ConfigOpen>(data) else {
            return json!({ "success": false });
        };
        let mut state = self.state.lock().await;
        let authorized = state.master == Some(client.id);
        let success = authorized && state.config.set_open(payload.open);
        let ack = json!({
            "success": success,
            "open": state.config.open,
            "password": &state.config.password,
        });
        if success {
            state.clients.add_event(
                "room:config:open",
                json!({ "open": state.config.open, "password": &state.config.password }),
            );
            if let Some(lobby) = self.lobby.upgrade() {
                lobby.room_config_open(&self.name, state.config.open);
            }
        }
        ack
    }

    pub(crate) async fn on_config_max_score(&self, client: &Arc<SocketClient>, data: Value) -> Value {
        let requested = serde_json::from_value::<ConfigMaxScore>(data)
            .ok()
            .and_then(|payload| payload.max_score)
            .and_then(|value| match value {
                Value::Number(number) => number.as_u64(),
                Value::String(text) => text.parse().ok(),
                _ => None,
            });
        let mut state = self.state.lock().await;
        let authorized = state.master == Some(client.id);
        let success = authorized && state.config.set_max_score(requested);
        let ack = json!({ "success": success, "maxScore": state.config.custom_max_score });
        if success {
            state.clients.add_event(
                "room:config:max-score",
                json!({ "maxScore": state.config.custom_max_score }),
            );
        }
        ack
    }

    /// Master pressed launch. First press arms the countdown (only when
    /// the room is ready); pressing again during the countdown launches
    /// immediately.
    pub(crate) async fn on_launch(&self, client: &Arc<SocketClient>) {
        let mut state = self.state.lock().await;
        if state.master != Some(client.id) {
            return;
        }
        match state.launching.take() {
            Some(countdown) => {
                countdown.abort();
                self.new_game(&mut state);
                self.settle(&mut state);
            }
            None if state.is_ready() => self.start_launch(&mut state),
            None => {}
        }
    }

    fn start_launch(&self, state: &mut RoomState) {
        let room = self.me.clone();
        state.launching = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(crate::LAUNCH_TIME)).await;
            if let Some(room) = room.upgrade() {
                room.launch().await;
            }
        }));
        state.clients.add_event("room:launch:start", Value::Null);
    }

    fn cancel_launch(&self, state: &mut RoomState) {
        if let Some(countdown) = state.launching.take() {
            countdown.abort();
            state.clients.add_event("room:launch:cancel", Value::Null);
        }
    }

    /// Countdown fired.
    pub(crate) async fn launch(&self) {
        let mut state = self.state.lock().await;
        if let Some(countdown) = state.launching.take() {
            countdown.abort();
        }
        self.new_game(&mut state);
        self.settle(&mut state);
    }
}
