/// Circular collision primitive held by the spatial index.
///
/// A body is plain data: position, radius, and a tag describing what it
/// stands for. Trail points carry their owning avatar plus a strictly
/// increasing sequence number so an avatar can be exempted from colliding
/// with its own most recent segments.
#[derive(Debug, Clone)]
pub struct Body {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub kind: BodyKind,
    pub islands: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BodyKind {
    /// Placement probe with no identity of its own.
    Probe,
    /// Pick-up body owned by a bonus.
    Bonus(u64),
    /// Trail point owned by an avatar. `num` is the avatar's trail-point
    /// sequence at creation, `birth` the wall clock in ms.
    Trail { avatar: u64, num: u64, birth: f64 },
}

impl Body {
    pub fn probe(x: f64, y: f64, radius: f64) -> Self {
        Self {
            id: 0,
            x,
            y,
            radius,
            kind: BodyKind::Probe,
            islands: Vec::new(),
        }
    }

    pub fn bonus(bonus: u64, x: f64, y: f64, radius: f64) -> Self {
        Self {
            kind: BodyKind::Bonus(bonus),
            ..Self::probe(x, y, radius)
        }
    }

    pub fn trail(avatar: u64, x: f64, y: f64, radius: f64, num: u64) -> Self {
        Self {
            kind: BodyKind::Trail {
                avatar,
                num,
                birth: crate::clock(),
            },
            ..Self::probe(x, y, radius)
        }
    }

    /// Whether this (stored) body should collide with the query body.
    /// Trail points never collide with the same avatar's segments within
    /// the trail latency window.
    pub fn matches(&self, other: &Body) -> bool {
        match (&self.kind, &other.kind) {
            (
                BodyKind::Trail { avatar: a, num: n, .. },
                BodyKind::Trail { avatar: b, num: m, .. },
            ) if a == b => m.saturating_sub(*n) > crate::TRAIL_LATENCY,
            _ => true,
        }
    }

    /// Id of the entity behind this body, used to attribute kills.
    pub fn owner(&self) -> Option<u64> {
        match self.kind {
            BodyKind::Probe => None,
            BodyKind::Bonus(id) => Some(id),
            BodyKind::Trail { avatar, .. } => Some(avatar),
        }
    }

    /// Trail points older than two seconds count as "old" for death
    /// feedback on the client.
    pub fn is_old(&self) -> bool {
        match self.kind {
            BodyKind::Trail { birth, .. } => crate::clock() - birth >= crate::OLD_BODY_AGE,
            _ => false,
        }
    }
}

#[cfg(test)]
mod body_tests {
    use super::*;

    #[test]
    fn own_trail_exemption_window() {
        let head = Body::trail(1, 0.0, 0.0, 0.6, 10);
        let recent = Body::trail(1, 0.0, 0.0, 0.6, 7);
        let older = Body::trail(1, 0.0, 0.0, 0.6, 6);
        assert!(!recent.matches(&head));
        assert!(older.matches(&head));
    }

    #[test]
    fn other_avatars_always_match() {
        let head = Body::trail(1, 0.0, 0.0, 0.6, 10);
        let foreign = Body::trail(2, 0.0, 0.0, 0.6, 10);
        assert!(foreign.matches(&head));
    }

    #[test]
    fn stale_query_never_matches_own_trail() {
        let head = Body::trail(1, 0.0, 0.0, 0.6, 2);
        let newer = Body::trail(1, 0.0, 0.0, 0.6, 9);
        assert!(!newer.matches(&head));
    }

    #[test]
    fn bonus_bodies_match_everything() {
        let head = Body::trail(1, 0.0, 0.0, 0.6, 10);
        let pickup = Body::bonus(4, 0.0, 0.0, 3.0);
        assert!(pickup.matches(&head));
        assert_eq!(pickup.owner(), Some(4));
    }
}
