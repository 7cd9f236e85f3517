use super::*;
use crate::collection::Collection;
use crate::game::Game;
use crate::hosting::Lobby;
use crate::session::SocketGroup;
use serde_json::json;
use serde_json::Value;
use std::sync::Arc;
use std::sync::Weak;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// A named room: a roster of players, one optional live game, and the
/// sessions currently inside.
///
/// All mutable state sits behind one async mutex, making the room (and its
/// game) single-writer: inbound commands, the tick loop, and every timer
/// lock before touching anything. Timer tasks hold a weak handle so a torn
/// down room silences them.
pub struct Room {
    pub name: String,
    pub lobby: Weak<Lobby>,
    pub(crate) me: Weak<Room>,
    pub state: Mutex<RoomState>,
}

pub struct RoomState {
    pub players: Collection<Player>,
    pub config: RoomConfig,
    pub game: Option<Game>,
    pub clients: SocketGroup,
    pub chat: Chat,
    pub master: Option<u64>,
    pub launching: Option<JoinHandle<()>>,
}

impl Room {
    pub fn new(name: String, lobby: Weak<Lobby>) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            name,
            lobby,
            me: me.clone(),
            state: Mutex::new(RoomState {
                players: Collection::new(),
                config: RoomConfig::new(),
                game: None,
                clients: SocketGroup::new(),
                chat: Chat::new(),
                master: None,
                launching: None,
            }),
        })
    }
}

impl RoomState {
    /// Ready to launch: no running game, enough players, nobody holding
    /// out.
    pub fn is_ready(&self) -> bool {
        self.game.is_none()
            && self.players.len() >= crate::MIN_PLAYER
            && self.players.iter().all(|player| player.ready)
    }

    pub fn name_available(&self, name: &str) -> bool {
        self.players.iter().all(|player| player.name != name)
    }

    fn player_active(&self, player: &Player) -> bool {
        self.clients
            .get(player.session)
            .map(|client| client.active())
            .unwrap_or(false)
    }

    pub fn serialize_players(&self) -> Value {
        Value::Array(
            self.players
                .iter()
                .map(|player| player.serialize(self.player_active(player)))
                .collect(),
        )
    }

    /// Full shape for join acks, compact shape for the lobby list.
    pub fn serialize(&self, name: &str, full: bool) -> Value {
        match full {
            true => json!({
                "name": name,
                "players": self.serialize_players(),
                "game": self.game.is_some(),
                "open": self.config.open,
                "config": self.config.serialize(),
            }),
            false => json!({
                "name": name,
                "players": self.players.len(),
                "game": self.game.is_some(),
                "open": self.config.open,
            }),
        }
    }
}

#[cfg(test)]
mod room_tests {
    use super::*;

    fn state() -> RoomState {
        RoomState {
            players: Collection::new(),
            config: RoomConfig::new(),
            game: None,
            clients: SocketGroup::new(),
            chat: Chat::new(),
            master: None,
            launching: None,
        }
    }

    #[test]
    fn empty_rooms_are_not_ready() {
        assert!(!state().is_ready());
    }

    #[test]
    fn readiness_requires_everyone() {
        let mut state = state();
        state.players.add(Player::new(1, "a", None));
        state.players.add(Player::new(1, "b", None));
        assert!(!state.is_ready());
        for player in state.players.iter_mut() {
            player.ready = true;
        }
        assert!(state.is_ready());
        let roster = state.players.ids();
        state.players.get_mut(roster[1]).map(Player::toggle_ready);
        assert!(!state.is_ready());
    }

    #[test]
    fn a_live_game_blocks_readiness() {
        let mut state = state();
        state.players.add(Player::new(1, "a", None));
        for player in state.players.iter_mut() {
            player.ready = true;
        }
        assert!(state.is_ready());
        state.game = Some(Game::new("arena", &state.players, &state.config));
        assert!(!state.is_ready());
    }

    #[test]
    fn names_are_unique_within_the_room() {
        let mut state = state();
        state.players.add(Player::new(1, "ada", None));
        assert!(!state.name_available("ada"));
        assert!(state.name_available("grace"));
    }
}
