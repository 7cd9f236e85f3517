use crate::game::Directive;
use crate::game::Game;
use crate::game::GameEvent;
use crate::room::Room;
use crate::room::RoomState;
use crate::session::compress;
use crate::session::SocketClient;
use crate::session::SocketGroup;
use serde::Deserialize;
use serde_json::json;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Deserialize)]
struct PlayerMove {
    avatar: u64,
    #[serde(rename = "move")]
    direction: f64,
}

fn spectators(game: &Game) -> usize {
    game.clients.iter().filter(|client| !client.is_playing()).count()
}

/// Translate drained game events into wire events on every attached
/// session, in mutation order.
fn forward(clients: &SocketGroup, events: Vec<GameEvent>) {
    for event in events {
        match event {
            GameEvent::Position { avatar, x, y } => {
                clients.add_event("position", json!([avatar, compress(x), compress(y)]))
            }
            GameEvent::Angle { avatar, angle } => {
                clients.add_event("angle", json!([avatar, compress(angle)]))
            }
            GameEvent::Property { avatar, name, value } => {
                clients.add_event("property", json!([avatar, name, value]))
            }
            GameEvent::Point { avatar, important, .. } => {
                if important {
                    clients.add_event("point", json!(avatar))
                }
            }
            GameEvent::Score { avatar, score } => {
                clients.add_event("score", json!([avatar, score]))
            }
            GameEvent::RoundScore { avatar, score } => {
                clients.add_event("score:round", json!([avatar, score]))
            }
            GameEvent::Die { avatar, killer, old } => {
                clients.add_event("die", json!([avatar, killer, old]))
            }
            GameEvent::Stack { avatar, change, bonus, kind, duration } => {
                clients.add_event("bonus:stack", json!([avatar, change.as_str(), bonus, kind, duration]))
            }
            GameEvent::BonusPop { bonus, x, y, kind } => {
                clients.add_event("bonus:pop", json!([bonus, compress(x), compress(y), kind]))
            }
            GameEvent::BonusClear { bonus } => clients.add_event("bonus:clear", json!(bonus)),
            GameEvent::Borderless(borderless) => clients.add_event("borderless", json!(borderless)),
            GameEvent::Clear => clients.add_event("clear", Value::Null),
            GameEvent::RoundNew => clients.add_event("round:new", Value::Null),
            GameEvent::RoundEnd { winner } => clients.add_event("round:end", json!(winner)),
            GameEvent::Start => clients.add_event("game:start", Value::Null),
            GameEvent::Stop => clients.add_event("game:stop", Value::Null),
            GameEvent::End => clients.add_event("end", Value::Null),
            GameEvent::PlayerLeave { player } => clients.add_event("game:leave", json!(player)),
        }
    }
}

/// Game controller: event fan-out, timer scheduling, session attachment,
/// and the spectator snapshot.
impl Room {
    /// Flush the game's pending events to the attached sessions and turn
    /// its directives into cancellable timers. Call at the end of every
    /// lock scope that may have mutated the game.
    pub(crate) fn settle(&self, state: &mut RoomState) {
        let mut ended = false;
        if let Some(game) = state.game.as_mut() {
            game.drain();
            forward(&game.clients, std::mem::take(&mut game.events));
            for directive in std::mem::take(&mut game.after) {
                match directive {
                    Directive::Start(delay) => {
                        let room = self.me.clone();
                        game.timers.warm = Some(tokio::spawn(async move {
                            tokio::time::sleep(Duration::from_millis(delay)).await;
                            if let Some(room) = room.upgrade() {
                                room.game_start().await;
                            }
                        }));
                    }
                    Directive::Stop(delay) => {
                        let room = self.me.clone();
                        game.timers.warm = Some(tokio::spawn(async move {
                            tokio::time::sleep(Duration::from_millis(delay)).await;
                            if let Some(room) = room.upgrade() {
                                room.game_stop().await;
                            }
                        }));
                    }
                    Directive::Prints(delay) => {
                        let room = self.me.clone();
                        game.timers.prints = Some(tokio::spawn(async move {
                            tokio::time::sleep(Duration::from_millis(delay)).await;
                            if let Some(room) = room.upgrade() {
                                room.game_prints().await;
                            }
                        }));
                    }
                    Directive::BonusOff { bonus, after } => {
                        let room = self.me.clone();
                        let timer = tokio::spawn(async move {
                            tokio::time::sleep(Duration::from_millis(after)).await;
                            if let Some(room) = room.upgrade() {
                                room.game_bonus_off(bonus).await;
                            }
                        });
                        match game.applied.get_mut(&bonus) {
                            Some(applied) => applied.timer = Some(timer),
                            None => timer.abort(),
                        }
                    }
                    Directive::End => ended = true,
                }
            }
        }
        if ended {
            self.close_game(state);
        }
    }

    /// Build the game from the roster and attach every session in the
    /// room; loading avatars get a grace window to report ready.
    pub(crate) fn new_game(&self, state: &mut RoomState) {
        if state.game.is_some() || state.players.is_empty() {
            return;
        }
        log::info!("room {} starting game", self.name);
        let mut game = Game::new(&self.name, &state.players, &state.config);
        game.clients = state.clients.clone();
        state.clients.add_event("room:game:start", Value::Null);
        for client in state.clients.iter() {
            client.start_ping();
        }
        game.clients.add_event("game:spectators", json!(spectators(&game)));
        let room = self.me.clone();
        game.timers.waiting = Some(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(crate::WAITING_TIME)).await;
            if let Some(room) = room.upgrade() {
                room.game_waiting_timeout().await;
            }
        }));
        state.game = Some(game);
        if let Some(lobby) = self.lobby.upgrade() {
            lobby.room_game(&self.name, true);
        }
    }

    /// Tear the finished game down and reset the room for another one.
    /// The `end` wire event has already been forwarded.
    pub(crate) fn close_game(&self, state: &mut RoomState) {
        let Some(mut game) = state.game.take() else { return };
        game.teardown();
        for client in game.clients.iter() {
            client.stop_ping();
        }
        drop(game);
        let connected = state
            .clients
            .iter()
            .filter(|client| client.connected())
            .map(|client| client.id)
            .collect::<Vec<_>>();
        state.players.retain(|player| connected.contains(&player.session));
        for player in state.players.iter_mut() {
            player.ready = false;
        }
        if let Some(lobby) = self.lobby.upgrade() {
            lobby.room_game(&self.name, false);
            lobby.room_players(&self.name, state.players.len());
        }
        log::info!("room {} game over", self.name);
    }

    pub(crate) fn game_attach(&self, state: &mut RoomState, client: &Arc<SocketClient>) {
        if let Some(game) = state.game.as_mut() {
            if game.clients.add(client.clone()) {
                game.clients.add_event("game:spectators", json!(spectators(game)));
                client.start_ping();
            }
        }
    }

    pub(crate) fn game_detach(&self, state: &mut RoomState, client: &Arc<SocketClient>) {
        let players = client.players();
        if let Some(game) = state.game.as_mut() {
            if game.clients.remove(client.id) {
                for player in players {
                    game.remove_avatar(player);
                }
                game.clients.add_event("game:spectators", json!(spectators(game)));
                client.stop_ping();
            }
        }
    }
}

// timer re-entry points
impl Room {
    /// Warmup elapsed: open the round, spawn the tick and bonus loops.
    pub(crate) async fn game_start(&self) {
        let mut state = self.state.lock().await;
        if let Some(game) = state.game.as_mut() {
            game.timers.warm = None;
            if game.started && game.timers.tick.is_none() {
                game.on_start();
                game.timers.tick = Some(self.spawn_tick());
                if game.bonus_manager.scheduled() {
                    game.bonus_manager.popper = Some(self.spawn_popper());
                }
            }
        }
        self.settle(&mut state);
    }

    /// Warmdown elapsed: settle the round outcome.
    pub(crate) async fn game_stop(&self) {
        let mut state = self.state.lock().await;
        if let Some(game) = state.game.as_mut() {
            game.timers.warm = None;
            game.stop();
        }
        self.settle(&mut state);
    }

    pub(crate) async fn game_prints(&self) {
        let mut state = self.state.lock().await;
        if let Some(game) = state.game.as_mut() {
            game.timers.prints = None;
            game.start_prints();
        }
        self.settle(&mut state);
    }

    pub(crate) async fn game_bonus_off(&self, bonus: u64) {
        let mut state = self.state.lock().await;
        if let Some(game) = state.game.as_mut() {
            game.bonus_off(bonus);
        }
        self.settle(&mut state);
    }

    /// The loading window expired: cut the sessions whose avatars never
    /// reported ready and start with whoever is left.
    pub(crate) async fn game_waiting_timeout(&self) {
        let mut state = self.state.lock().await;
        let loading = state
            .game
            .as_ref()
            .map(|game| game.loading_ids())
            .unwrap_or_default();
        if !loading.is_empty() {
            log::warn!("room {} dropping {} loading avatars", self.name, loading.len());
            let mut stragglers: Vec<Arc<SocketClient>> = Vec::new();
            for avatar in loading {
                let Some(session) = state.players.get(avatar).map(|player| player.session) else {
                    continue;
                };
                if let Some(client) = state.clients.get(session) {
                    if !stragglers.iter().any(|known| known.id == client.id) {
                        stragglers.push(client.clone());
                    }
                }
            }
            for client in stragglers {
                self.game_detach(&mut state, &client);
            }
        }
        self.check_ready(&mut state);
        self.settle(&mut state);
    }

    fn spawn_tick(&self) -> JoinHandle<()> {
        let room = self.me.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs_f64(crate::FRAMERATE / 1000.0));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(room) = room.upgrade() else { break };
                let mut state = room.state.lock().await;
                let step = {
                    let Some(game) = state.game.as_mut() else { break };
                    let Some(rendered) = game.rendered else { break };
                    let now = crate::clock();
                    game.rendered = Some(now);
                    now - rendered
                };
                if let Some(game) = state.game.as_mut() {
                    game.update(step);
                }
                room.settle(&mut state);
            }
        })
    }

    fn spawn_popper(&self) -> JoinHandle<()> {
        let room = self.me.clone();
        tokio::spawn(async move {
            loop {
                let delay = {
                    let Some(room) = room.upgrade() else { break };
                    let mut state = room.state.lock().await;
                    match state.game.as_mut() {
                        Some(game) if game.bonus_manager.active() => {
                            game.bonus_manager.random_poping_time()
                        }
                        _ => break,
                    }
                };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                let Some(room) = room.upgrade() else { break };
                let mut state = room.state.lock().await;
                match state.game.as_mut() {
                    Some(game) if game.bonus_manager.active() => game.pop_bonus(),
                    _ => break,
                }
                room.settle(&mut state);
            }
        })
    }
}

// inbound game events
impl Room {
    /// A session finished loading. Before the first round this gates the
    /// start; mid-game it asks for the spectator snapshot.
    pub(crate) async fn on_ready(&self, client: &Arc<SocketClient>) {
        let mut state = self.state.lock().await;
        let Some(started) = state.game.as_ref().map(|game| game.started) else {
            return;
        };
        if started {
            self.spectate(&state, client);
        } else {
            if let Some(game) = state.game.as_mut() {
                for player in client.players() {
                    let marked = game
                        .avatars
                        .get_mut(player)
                        .map(|avatar| {
                            avatar.ready = true;
                        })
                        .is_some();
                    if marked {
                        game.clients.add_event("ready", json!(player));
                    }
                }
            }
            self.check_ready(&mut state);
        }
        self.settle(&mut state);
    }

    pub(crate) fn check_ready(&self, state: &mut RoomState) {
        if let Some(game) = state.game.as_mut() {
            if !game.started && game.is_ready() {
                if let Some(waiting) = game.timers.waiting.take() {
                    waiting.abort();
                }
                game.new_round();
            }
        }
    }

    /// Steering input for one of the session's own avatars.
    pub(crate) async fn on_move(&self, client: &Arc<SocketClient>, data: Value) {
        let Ok(payload) = serde_json::from_value::<PlayerMove>(data) else {
            log::warn!("invalid move payload from client {}", client.id);
            return;
        };
        if !client.players().contains(&payload.avatar) {
            return;
        }
        let mut state = self.state.lock().await;
        if let Some(game) = state.game.as_mut() {
            if let Some(avatar) = game.avatars.get_mut(payload.avatar) {
                avatar.update_angular_velocity(Some(payload.direction.clamp(-1.0, 1.0)));
            }
        }
    }

    /// Whole-game snapshot for a session joining mid-game: one spectate
    /// header, then per avatar its position, the five mirrored
    /// properties, and a die marker when dead; then the live bonuses (in
    /// round) or the round outcome (between rounds); then the spectator
    /// count.
    fn spectate(&self, state: &RoomState, client: &Arc<SocketClient>) {
        let Some(game) = state.game.as_ref() else { return };
        let mut events = vec![json!(["spectate", {
            "inRound": game.in_round,
            "rendered": game.rendered.is_some(),
            "maxScore": game.max_score,
        }])];
        for avatar in game.avatars.iter() {
            events.push(json!(["position", [avatar.id, compress(avatar.x), compress(avatar.y)]]));
            for (name, value) in [
                ("angle", json!(avatar.angle)),
                ("radius", json!(avatar.radius())),
                ("color", json!(&avatar.color)),
                ("printing", json!(avatar.printing)),
                ("score", json!(avatar.score)),
            ] {
                events.push(json!(["property", {
                    "avatar": avatar.id,
                    "property": name,
                    "value": value,
                }]));
            }
            if !avatar.alive {
                events.push(json!(["die", [avatar.id, Value::Null, Value::Null]]));
            }
        }
        if game.in_round {
            for bonus in game.bonus_manager.bonuses.iter() {
                events.push(json!(["bonus:pop", [
                    bonus.id,
                    compress(bonus.x),
                    compress(bonus.y),
                    bonus.kind.name(),
                ]]));
            }
        } else {
            events.push(json!(["round:end", game.round_winner]));
        }
        events.push(json!(["game:spectators", spectators(game)]));
        client.add_events(events);
    }
}
