use serde_json::json;
use serde_json::Value;

/// One chat line, stamped at arrival.
#[derive(Debug, Clone)]
pub struct Message {
    pub session: u64,
    pub content: String,
    pub creation: f64,
}

impl Message {
    pub fn new(session: u64, content: &str) -> Self {
        Self {
            session,
            content: content.chars().take(crate::TALK_MAX_LENGTH).collect(),
            creation: crate::clock(),
        }
    }

    pub fn serialize(&self) -> Value {
        json!({
            "client": self.session,
            "content": &self.content,
            "creation": self.creation,
        })
    }
}

/// Append buffer of room chatter; joins replay the newest tail.
#[derive(Debug, Default)]
pub struct Chat {
    messages: Vec<Message>,
}

impl Chat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn serialize(&self, limit: usize) -> Value {
        let skip = self.messages.len().saturating_sub(limit);
        Value::Array(
            self.messages
                .iter()
                .skip(skip)
                .map(Message::serialize)
                .collect(),
        )
    }
}

#[cfg(test)]
mod chat_tests {
    use super::*;

    #[test]
    fn long_lines_are_truncated() {
        let message = Message::new(1, &"x".repeat(500));
        assert_eq!(message.content.len(), crate::TALK_MAX_LENGTH);
    }

    #[test]
    fn join_replay_returns_the_tail() {
        let mut chat = Chat::new();
        for i in 0..150 {
            chat.add(Message::new(1, &format!("line {}", i)));
        }
        let tail = chat.serialize(crate::CHAT_TAIL);
        let tail = tail.as_array().expect("array");
        assert_eq!(tail.len(), crate::CHAT_TAIL);
        assert_eq!(tail[0]["content"], "line 50");
        assert_eq!(tail[99]["content"], "line 149");
    }
}
