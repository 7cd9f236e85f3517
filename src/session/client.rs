use crate::room::Room;
use serde_json::json;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

type Reply = Box<dyn FnOnce(Value) + Send>;

/// Per-connection session.
///
/// Owns the outbound event queue exclusively: writers enqueue, the flush
/// task drains the queue into a single JSON frame on a fixed interval, and
/// forced events bypass the queue entirely. Inbound replies to our own
/// calls resolve through the pending-callback table. The session never
/// touches the socket; frames go through a channel to the connection's
/// bridge task.
pub struct SocketClient {
    pub id: u64,
    me: Weak<SocketClient>,
    sink: UnboundedSender<String>,
    interval: Duration,
    connected: AtomicBool,
    active: AtomicBool,
    calls: AtomicU64,
    latency: AtomicU64,
    outbox: Mutex<Vec<Value>>,
    callbacks: Mutex<HashMap<u64, Reply>>,
    players: Mutex<Vec<u64>>,
    room: Mutex<Weak<Room>>,
    flusher: Mutex<Option<JoinHandle<()>>>,
    pinger: Mutex<Option<JoinHandle<()>>>,
}

impl SocketClient {
    pub fn new(id: u64, sink: UnboundedSender<String>, interval: Duration) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            id,
            me: me.clone(),
            sink,
            interval,
            connected: AtomicBool::new(true),
            active: AtomicBool::new(true),
            calls: AtomicU64::new(0),
            latency: AtomicU64::new(0),
            outbox: Mutex::new(Vec::new()),
            callbacks: Mutex::new(HashMap::new()),
            players: Mutex::new(Vec::new()),
            room: Mutex::new(Weak::new()),
            flusher: Mutex::new(None),
            pinger: Mutex::new(None),
        })
    }

    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    pub fn latency(&self) -> u64 {
        self.latency.load(Ordering::Relaxed)
    }

    pub fn serialize(&self) -> Value {
        json!({ "id": self.id, "active": self.active() })
    }
}

// outbound batching
impl SocketClient {
    fn event(name: &str, data: Value, call: Option<u64>) -> Value {
        let mut event = vec![json!(name)];
        if !data.is_null() || call.is_some() {
            event.push(data);
        }
        if let Some(call) = call {
            event.push(json!(call));
        }
        Value::Array(event)
    }

    /// Queue an event for the next flush; sessions without a flush
    /// interval send immediately.
    pub fn add_event(&self, name: &str, data: Value) {
        let event = Self::event(name, data, None);
        if self.interval.is_zero() {
            self.send(vec![event]);
        } else {
            self.outbox.lock().expect("outbox lock").push(event);
        }
    }

    /// Send immediately, bypassing the outbox.
    pub fn add_event_forced(&self, name: &str, data: Value) {
        self.send(vec![Self::event(name, data, None)]);
    }

    pub fn add_events(&self, events: Vec<Value>) {
        if self.interval.is_zero() {
            self.send(events);
        } else {
            self.outbox.lock().expect("outbox lock").extend(events);
        }
    }

    /// Queue a request the client must answer; the handler runs when the
    /// numeric reply comes back.
    pub fn add_call(&self, name: &str, data: Value, reply: Reply) {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        self.callbacks.lock().expect("callbacks lock").insert(call, reply);
        let event = Self::event(name, data, Some(call));
        if self.interval.is_zero() {
            self.send(vec![event]);
        } else {
            self.outbox.lock().expect("outbox lock").push(event);
        }
    }

    pub fn take_reply(&self, call: u64) -> Option<Reply> {
        self.callbacks.lock().expect("callbacks lock").remove(&call)
    }

    /// Answer one of the client's requests. Replies are not batched.
    pub fn reply(&self, call: u64, data: Value) {
        let mut event = vec![json!(call)];
        if !data.is_null() {
            event.push(data);
        }
        self.send(vec![Value::Array(event)]);
    }

    pub fn flush(&self) {
        let events = std::mem::take(&mut *self.outbox.lock().expect("outbox lock"));
        if !events.is_empty() {
            self.send(events);
        }
    }

    /// Hand a frame to the bridge task. A dead bridge means the transport
    /// is gone; further sends are dropped silently.
    fn send(&self, events: Vec<Value>) {
        if !self.connected() {
            return;
        }
        match serde_json::to_string(&Value::Array(events)) {
            Ok(frame) => {
                if self.sink.send(frame).is_err() {
                    self.connected.store(false, Ordering::Relaxed);
                }
            }
            Err(error) => log::warn!("failed to encode frame for client {}: {}", self.id, error),
        }
    }

    pub fn start_flush(&self) {
        if self.interval.is_zero() {
            return;
        }
        let mut flusher = self.flusher.lock().expect("flusher lock");
        if flusher.is_some() {
            return;
        }
        let interval = self.interval;
        let client = self.me.clone();
        *flusher = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(client) = client.upgrade() else { break };
                if !client.connected() {
                    break;
                }
                client.flush();
            }
        }));
    }
}

// latency ping
impl SocketClient {
    /// Runs while the session is attached to a game; each second we send a
    /// forced ping stamped with our clock and fold the echo into latency.
    pub fn start_ping(&self) {
        let mut pinger = self.pinger.lock().expect("pinger lock");
        if pinger.is_some() {
            return;
        }
        let client = self.me.clone();
        *pinger = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(crate::PING_INTERVAL)).await;
                let Some(client) = client.upgrade() else { break };
                if !client.connected() {
                    break;
                }
                client.add_event_forced("ping", json!(crate::clock() as u64));
            }
        }));
    }

    pub fn stop_ping(&self) {
        if let Some(pinger) = self.pinger.lock().expect("pinger lock").take() {
            pinger.abort();
        }
    }

    pub fn pong(&self, timestamp: f64) {
        let latency = (crate::clock() - timestamp).max(0.0);
        self.latency.store(latency as u64, Ordering::Relaxed);
        self.add_event_forced("latency", json!(latency.round() as u64));
    }
}

// players and room attachment
impl SocketClient {
    pub fn is_playing(&self) -> bool {
        !self.players.lock().expect("players lock").is_empty()
    }

    pub fn players(&self) -> Vec<u64> {
        self.players.lock().expect("players lock").clone()
    }

    pub fn add_player(&self, player: u64) {
        self.players.lock().expect("players lock").push(player);
    }

    pub fn remove_player(&self, player: u64) {
        self.players.lock().expect("players lock").retain(|&id| id != player);
    }

    pub fn take_players(&self) -> Vec<u64> {
        std::mem::take(&mut *self.players.lock().expect("players lock"))
    }

    pub fn set_room(&self, room: Weak<Room>) {
        *self.room.lock().expect("room lock") = room;
    }

    pub fn clear_room(&self) {
        *self.room.lock().expect("room lock") = Weak::new();
    }

    pub fn room(&self) -> Option<Arc<Room>> {
        self.room.lock().expect("room lock").upgrade()
    }

    /// Disconnect teardown: mark dead and cancel the flush and ping tasks.
    /// Controllers detach through the bridge's close path before the next
    /// tick can observe this session.
    pub fn close(&self) {
        self.connected.store(false, Ordering::Relaxed);
        if let Some(flusher) = self.flusher.lock().expect("flusher lock").take() {
            flusher.abort();
        }
        self.stop_ping();
    }
}

#[cfg(test)]
mod client_tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn immediate_sessions_skip_the_outbox() {
        let (tx, mut rx) = unbounded_channel();
        let client = SocketClient::new(1, tx, Duration::ZERO);
        client.add_event("room:open", json!({"name": "arena"}));
        let frame = rx.recv().await.expect("frame");
        assert_eq!(frame, r#"[["room:open",{"name":"arena"}]]"#);
    }

    #[tokio::test]
    async fn batching_sessions_flush_in_order() {
        let (tx, mut rx) = unbounded_channel();
        let client = SocketClient::new(1, tx, Duration::from_millis(1));
        client.add_event("position", json!([1, 100, 200]));
        client.add_event("angle", json!([1, 314]));
        assert!(rx.try_recv().is_err());
        client.flush();
        let frame = rx.recv().await.expect("frame");
        assert_eq!(frame, r#"[["position",[1,100,200]],["angle",[1,314]]]"#);
        client.flush();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn forced_events_jump_the_queue() {
        let (tx, mut rx) = unbounded_channel();
        let client = SocketClient::new(1, tx, Duration::from_millis(1));
        client.add_event("score", json!([1, 3]));
        client.add_event_forced("ping", json!(123));
        let frame = rx.recv().await.expect("frame");
        assert_eq!(frame, r#"[["ping",123]]"#);
    }

    #[tokio::test]
    async fn calls_allocate_monotonic_ids() {
        let (tx, mut rx) = unbounded_channel();
        let client = SocketClient::new(1, tx, Duration::ZERO);
        client.add_call("whoami", Value::Null, Box::new(|_| {}));
        client.add_call("whoami", Value::Null, Box::new(|_| {}));
        assert_eq!(rx.recv().await.expect("frame"), r#"[["whoami",null,0]]"#);
        assert_eq!(rx.recv().await.expect("frame"), r#"[["whoami",null,1]]"#);
        assert!(client.take_reply(0).is_some());
        assert!(client.take_reply(0).is_none());
        assert!(client.take_reply(1).is_some());
    }

    #[tokio::test]
    async fn closed_sessions_drop_sends() {
        let (tx, mut rx) = unbounded_channel();
        let client = SocketClient::new(1, tx, Duration::ZERO);
        client.close();
        client.add_event("score", json!([1, 3]));
        assert!(rx.try_recv().is_err());
        assert!(!client.connected());
    }
}
