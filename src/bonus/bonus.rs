use super::*;
use crate::collection::Identifiable;
use rand::Rng;

/// A spawned bonus: a position, a kind, and (for color bonuses) the color
/// rolled at spawn time. Ids are assigned by the owning manager.
#[derive(Debug, Clone)]
pub struct Bonus {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub kind: BonusKind,
    pub color: Option<String>,
}

impl Identifiable for Bonus {
    fn id(&self) -> u64 {
        self.id
    }
    fn assign(&mut self, id: u64) {
        self.id = id;
    }
}

impl Bonus {
    pub fn new(kind: BonusKind, x: f64, y: f64) -> Self {
        Self {
            id: 0,
            x,
            y,
            kind,
            color: match kind {
                BonusKind::AllColor => Some(Self::random_color()),
                _ => None,
            },
        }
    }

    pub fn effects(&self) -> Vec<Property> {
        self.kind.effects(self.color.as_deref())
    }

    /// Random bright color shared by every avatar under an AllColor effect.
    fn random_color() -> String {
        let ref mut rng = rand::rng();
        format!(
            "#{:02x}{:02x}{:02x}",
            rng.random_range(100..=255),
            rng.random_range(100..=255),
            rng.random_range(100..=255),
        )
    }
}
