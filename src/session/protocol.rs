use serde_json::Value;

const PRECISION: f64 = 100.0;

/// One parsed message from an inbound frame.
///
/// A frame is a JSON array of messages. Each message leads with a string
/// event name, optionally followed by a payload and a numeric call id the
/// sender expects a reply to; a message leading with a number is itself a
/// reply to one of our own calls.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Event { name: String, data: Value },
    Request { name: String, data: Value, call: u64 },
    Reply { call: u64, data: Value },
}

pub fn parse(frame: &str) -> anyhow::Result<Vec<Inbound>> {
    let frame: Value = serde_json::from_str(frame)?;
    let messages = frame
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("frame is not an array"))?;
    messages.iter().map(message).collect()
}

fn message(source: &Value) -> anyhow::Result<Inbound> {
    let parts = source
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("message is not an array"))?;
    let head = parts.first().ok_or_else(|| anyhow::anyhow!("empty message"))?;
    let data = parts.get(1).cloned().unwrap_or(Value::Null);
    match head {
        Value::String(name) => match parts.get(2).and_then(Value::as_u64) {
            Some(call) => Ok(Inbound::Request { name: name.clone(), data, call }),
            None => Ok(Inbound::Event { name: name.clone(), data }),
        },
        Value::Number(call) => call
            .as_u64()
            .map(|call| Inbound::Reply { call, data })
            .ok_or_else(|| anyhow::anyhow!("invalid call id")),
        other => Err(anyhow::anyhow!("unexpected message head: {}", other)),
    }
}

/// Fixed-point compression for coordinates and angles on the wire.
pub fn compress(value: f64) -> i64 {
    (0.5 + value * PRECISION) as i64
}

pub fn decompress(value: i64) -> f64 {
    value as f64 / PRECISION
}
