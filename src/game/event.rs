use serde_json::Value;

/// Semantic events produced by in-game mutations.
///
/// Models push these into the owning game's buffer as they mutate; the
/// controller drains the buffer inside the same lock scope and translates
/// each into wire events on every attached session, so outbound order
/// always equals mutation order.
#[derive(Debug, Clone)]
pub enum GameEvent {
    Position { avatar: u64, x: f64, y: f64 },
    Angle { avatar: u64, angle: f64 },
    Property { avatar: u64, name: &'static str, value: Value },
    Point { avatar: u64, x: f64, y: f64, important: bool },
    Score { avatar: u64, score: u64 },
    RoundScore { avatar: u64, score: u64 },
    Die { avatar: u64, killer: Option<u64>, old: Option<bool> },
    Stack { avatar: u64, change: StackChange, bonus: u64, kind: &'static str, duration: u64 },
    BonusPop { bonus: u64, x: f64, y: f64, kind: &'static str },
    BonusClear { bonus: u64 },
    Borderless(bool),
    Clear,
    RoundNew,
    RoundEnd { winner: Option<u64> },
    Start,
    Stop,
    End,
    PlayerLeave { player: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackChange {
    Add,
    Remove,
}

impl StackChange {
    pub fn as_str(self) -> &'static str {
        match self {
            StackChange::Add => "add",
            StackChange::Remove => "remove",
        }
    }
}
