use crate::hosting::Lobby;
use crate::session::parse;
use crate::session::Inbound;
use crate::session::SocketClient;
use serde::Deserialize;
use serde_json::json;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct RoomCreate {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RoomJoin {
    name: String,
    password: Option<String>,
}

/// Route one inbound frame. Messages are handled strictly in arrival
/// order; a malformed frame is logged and dropped with the connection
/// left open.
pub async fn dispatch(lobby: &Arc<Lobby>, client: &Arc<SocketClient>, frame: &str) {
    let messages = match parse(frame) {
        Ok(messages) => messages,
        Err(error) => {
            log::warn!("malformed frame from client {}: {}", client.id, error);
            return;
        }
    };
    for message in messages {
        match message {
            Inbound::Reply { call, data } => match client.take_reply(call) {
                Some(reply) => reply(data),
                None => log::warn!("client {} answered unknown call {}", client.id, call),
            },
            Inbound::Event { name, data } => {
                handle(lobby, client, &name, data, None).await;
            }
            Inbound::Request { name, data, call } => {
                handle(lobby, client, &name, data, Some(call)).await;
            }
        }
    }
}

async fn handle(
    lobby: &Arc<Lobby>,
    client: &Arc<SocketClient>,
    name: &str,
    data: Value,
    call: Option<u64>,
) {
    let ack = match name {
        "whoami" => Some(json!(client.id)),
        "activity" => {
            client.set_active(data.as_bool().unwrap_or(true));
            None
        }
        "pong" => {
            if let Some(timestamp) = data.as_f64() {
                client.pong(timestamp);
            }
            None
        }
        "room:fetch" => {
            lobby.fetch(client).await;
            None
        }
        "room:create" => Some(create(lobby, data).await),
        "room:join" => Some(join(lobby, client, data).await),
        "room:leave" => {
            if let Some(room) = client.room() {
                room.detach(client).await;
            }
            None
        }
        _ => match client.room() {
            Some(room) => match name {
                "room:talk" => Some(room.on_talk(client, data).await),
                "player:add" => Some(room.on_player_add(client, data).await),
                "player:remove" => Some(room.on_player_remove(client, data).await),
                "players:clear" => {
                    room.on_players_clear(client).await;
                    None
                }
                "room:ready" => Some(room.on_room_ready(client, data).await),
                "room:color" => Some(room.on_color(client, data).await),
                "room:name" => Some(room.on_name(client, data).await),
                "room:config:open" => Some(room.on_config_open(client, data).await),
                "room:config:max-score" => Some(room.on_config_max_score(client, data).await),
                "room:launch" => {
                    room.on_launch(client).await;
                    None
                }
                "ready" => {
                    room.on_ready(client).await;
                    None
                }
                "player:move" => {
                    room.on_move(client, data).await;
                    None
                }
                _ => {
                    log::warn!("unknown event {:?} from client {}", name, client.id);
                    None
                }
            },
            None => {
                log::warn!("event {:?} from client {} outside any room", name, client.id);
                None
            }
        },
    };
    if let (Some(call), Some(result)) = (call, ack) {
        client.reply(call, result);
    }
}

async fn create(lobby: &Arc<Lobby>, data: Value) -> Value {
    let requested = serde_json::from_value::<RoomCreate>(data)
        .ok()
        .and_then(|payload| payload.name);
    match lobby.create(requested).await {
        Some(room) => {
            let state = room.state.lock().await;
            json!({ "success": true, "room": state.serialize(&room.name, false) })
        }
        None => json!({ "success": false }),
    }
}

async fn join(lobby: &Arc<Lobby>, client: &Arc<SocketClient>, data: Value) -> Value {
    let Ok(payload) = serde_json::from_value::<RoomJoin>(data) else {
        return json!({ "success": false, "error": "Invalid request." });
    };
    match lobby.get(&payload.name).await {
        Some(room) => room.attach(client, payload.password.as_deref()).await,
        None => json!({
            "success": false,
            "error": format!("Unknown room \"{}\".", payload.name),
        }),
    }
}
