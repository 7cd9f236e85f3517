use super::SocketClient;
use serde_json::Value;
use std::sync::Arc;

/// A broadcast list of sessions. Handles are deduplicated by session id,
/// so re-attaching a session can never double-subscribe it.
#[derive(Clone, Default)]
pub struct SocketGroup {
    clients: Vec<Arc<SocketClient>>,
}

impl SocketGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, client: Arc<SocketClient>) -> bool {
        if self.contains(client.id) {
            return false;
        }
        self.clients.push(client);
        true
    }

    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.clients.len();
        self.clients.retain(|client| client.id != id);
        self.clients.len() < before
    }

    pub fn contains(&self, id: u64) -> bool {
        self.clients.iter().any(|client| client.id == id)
    }

    pub fn get(&self, id: u64) -> Option<&Arc<SocketClient>> {
        self.clients.iter().find(|client| client.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SocketClient>> {
        self.clients.iter()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn add_event(&self, name: &str, data: Value) {
        for client in self.clients.iter() {
            client.add_event(name, data.clone());
        }
    }

    pub fn add_event_forced(&self, name: &str, data: Value) {
        for client in self.clients.iter() {
            client.add_event_forced(name, data.clone());
        }
    }
}

#[cfg(test)]
mod group_tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn broadcast_reaches_every_member_once() {
        let (tx_a, mut rx_a) = unbounded_channel();
        let (tx_b, mut rx_b) = unbounded_channel();
        let a = SocketClient::new(1, tx_a, Duration::ZERO);
        let b = SocketClient::new(2, tx_b, Duration::ZERO);
        let mut group = SocketGroup::new();
        assert!(group.add(a.clone()));
        assert!(!group.add(a.clone()));
        assert!(group.add(b));
        group.add_event("round:new", json!(null));
        assert_eq!(rx_a.recv().await.expect("frame"), r#"[["round:new"]]"#);
        assert_eq!(rx_b.recv().await.expect("frame"), r#"[["round:new"]]"#);
        assert!(group.remove(1));
        assert!(!group.remove(1));
        assert_eq!(group.len(), 1);
    }
}
