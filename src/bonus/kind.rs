use crate::Arbitrary;
use std::f64::consts::FRAC_PI_2;

/// Who an effect lands on when a bonus is picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affect {
    /// The avatar that picked it up.
    Own,
    /// Every other alive avatar.
    Enemy,
    /// Every alive avatar.
    All,
    /// The game itself.
    Game,
}

/// Typed property mutation carried by a bonus.
///
/// Numeric values are additive deltas folded by the stack; color, turn
/// mode, and turn rate replace instead of adding.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    /// Exponent delta: the stack maps a total of `v` to `R · 2^v`.
    Radius(f64),
    /// Absolute speed delta against the default speed.
    Velocity(f64),
    Inverse(i64),
    Invincible(i64),
    Printing(i64),
    Color(String),
    DirectionInLoop(bool),
    AngularVelocityBase(f64),
    Borderless(i64),
}

/// The twelve bonus kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BonusKind {
    SelfSmall,
    SelfSlow,
    SelfFast,
    SelfMaster,
    EnemySlow,
    EnemyFast,
    EnemyBig,
    EnemyInverse,
    EnemyStraightAngle,
    GameBorderless,
    GameClear,
    AllColor,
}

impl BonusKind {
    pub const ALL: [BonusKind; 12] = [
        BonusKind::SelfSmall,
        BonusKind::SelfSlow,
        BonusKind::SelfFast,
        BonusKind::SelfMaster,
        BonusKind::EnemySlow,
        BonusKind::EnemyFast,
        BonusKind::EnemyBig,
        BonusKind::EnemyInverse,
        BonusKind::EnemyStraightAngle,
        BonusKind::GameBorderless,
        BonusKind::GameClear,
        BonusKind::AllColor,
    ];

    /// Wire name, also the key in room configuration.
    pub fn name(self) -> &'static str {
        match self {
            BonusKind::SelfSmall => "BonusSelfSmall",
            BonusKind::SelfSlow => "BonusSelfSlow",
            BonusKind::SelfFast => "BonusSelfFast",
            BonusKind::SelfMaster => "BonusSelfMaster",
            BonusKind::EnemySlow => "BonusEnemySlow",
            BonusKind::EnemyFast => "BonusEnemyFast",
            BonusKind::EnemyBig => "BonusEnemyBig",
            BonusKind::EnemyInverse => "BonusEnemyInverse",
            BonusKind::EnemyStraightAngle => "BonusEnemyStraightAngle",
            BonusKind::GameBorderless => "BonusGameBorderless",
            BonusKind::GameClear => "BonusGameClear",
            BonusKind::AllColor => "BonusAllColor",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn affect(self) -> Affect {
        match self {
            BonusKind::SelfSmall
            | BonusKind::SelfSlow
            | BonusKind::SelfFast
            | BonusKind::SelfMaster => Affect::Own,
            BonusKind::EnemySlow
            | BonusKind::EnemyFast
            | BonusKind::EnemyBig
            | BonusKind::EnemyInverse
            | BonusKind::EnemyStraightAngle => Affect::Enemy,
            BonusKind::GameBorderless | BonusKind::GameClear => Affect::Game,
            BonusKind::AllColor => Affect::All,
        }
    }

    /// Effect duration in ms; zero means the effect is instantaneous.
    pub fn duration(self) -> u64 {
        match self {
            BonusKind::SelfSmall | BonusKind::EnemyBig => 7_500,
            BonusKind::SelfSlow | BonusKind::SelfFast => 4_000,
            BonusKind::SelfMaster => 2_000,
            BonusKind::EnemySlow | BonusKind::EnemyFast => 6_000,
            BonusKind::EnemyInverse | BonusKind::EnemyStraightAngle => 5_000,
            BonusKind::GameBorderless | BonusKind::AllColor => 8_000,
            BonusKind::GameClear => 0,
        }
    }

    pub fn base_probability(self) -> f64 {
        match self {
            BonusKind::SelfMaster => 0.1,
            BonusKind::AllColor => 0.3,
            _ => 1.0,
        }
    }

    /// Spawn probability given the current alive/present counts. Clearing
    /// trails loses value as the field thins out, so `GameClear` decays
    /// with the dead fraction.
    pub fn probability(self, alive: usize, present: usize) -> f64 {
        match self {
            BonusKind::GameClear => {
                if present == 0 {
                    return 0.0;
                }
                let ratio = 1.0 - alive as f64 / present as f64;
                if ratio < 0.5 {
                    self.base_probability()
                } else {
                    (((self.base_probability() - ratio) * 10.0).round_ties_even() / 10.0).max(0.0)
                }
            }
            _ => self.base_probability(),
        }
    }

    /// Property mutations applied while the bonus is active. `color` is
    /// the per-spawn color of an `AllColor` bonus.
    pub fn effects(self, color: Option<&str>) -> Vec<Property> {
        match self {
            BonusKind::SelfSmall => vec![Property::Radius(-1.0)],
            BonusKind::SelfSlow => vec![Property::Velocity(-0.5 * crate::VELOCITY_DEFAULT)],
            BonusKind::SelfFast => vec![Property::Velocity(0.5 * crate::VELOCITY_DEFAULT)],
            BonusKind::SelfMaster => vec![Property::Invincible(1)],
            BonusKind::EnemySlow => vec![Property::Velocity(-0.75 * crate::VELOCITY_DEFAULT)],
            BonusKind::EnemyFast => vec![Property::Velocity(0.75 * crate::VELOCITY_DEFAULT)],
            BonusKind::EnemyBig => vec![Property::Radius(1.0)],
            BonusKind::EnemyInverse => vec![Property::Inverse(1)],
            BonusKind::EnemyStraightAngle => vec![
                Property::DirectionInLoop(false),
                Property::AngularVelocityBase(FRAC_PI_2),
            ],
            BonusKind::GameBorderless => vec![Property::Borderless(1)],
            BonusKind::GameClear => vec![],
            BonusKind::AllColor => color
                .map(|color| vec![Property::Color(color.to_string())])
                .unwrap_or_default(),
        }
    }
}

impl Arbitrary for BonusKind {
    fn random() -> Self {
        use rand::seq::IndexedRandom;
        let ref mut rng = rand::rng();
        *Self::ALL.as_slice().choose(rng).expect("non empty kinds")
    }
}

#[cfg(test)]
mod kind_tests {
    use super::*;

    #[test]
    fn names_are_bijective() {
        for kind in BonusKind::ALL {
            assert_eq!(BonusKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn clear_probability_decays_with_deaths() {
        let clear = BonusKind::GameClear;
        assert_eq!(clear.probability(4, 4), 1.0);
        assert_eq!(clear.probability(3, 4), 1.0);
        assert_eq!(clear.probability(2, 4), 0.5);
        assert_eq!(clear.probability(1, 4), 0.2);
        assert_eq!(clear.probability(0, 4), 0.0);
        assert_eq!(clear.probability(0, 0), 0.0);
    }

    #[test]
    fn rare_kinds_stay_rare() {
        assert_eq!(BonusKind::SelfMaster.probability(2, 2), 0.1);
        assert_eq!(BonusKind::AllColor.probability(2, 2), 0.3);
        assert_eq!(BonusKind::EnemyBig.probability(2, 2), 1.0);
    }

    #[test]
    fn straight_angle_replaces_turn_mode() {
        let effects = BonusKind::EnemyStraightAngle.effects(None);
        assert!(effects.contains(&Property::DirectionInLoop(false)));
        assert!(effects.contains(&Property::AngularVelocityBase(FRAC_PI_2)));
    }

    #[test]
    fn instant_kinds_have_no_duration() {
        assert_eq!(BonusKind::GameClear.duration(), 0);
        assert!(BonusKind::ALL
            .into_iter()
            .filter(|kind| *kind != BonusKind::GameClear)
            .all(|kind| kind.duration() > 0));
    }
}
