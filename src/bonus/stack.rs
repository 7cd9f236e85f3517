use super::*;

/// Active bonuses attached to one target (an avatar or the game).
///
/// The stack never mutates the target directly; it recomputes an
/// [`Aggregate`] of effective properties that the target applies to
/// itself. Numeric effects add up, color and turn properties replace.
#[derive(Debug, Default)]
pub struct BonusStack {
    bonuses: Vec<Bonus>,
}

impl BonusStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, bonus: Bonus) -> bool {
        if self.bonuses.iter().any(|active| active.id == bonus.id) {
            return false;
        }
        self.bonuses.push(bonus);
        true
    }

    pub fn remove(&mut self, id: u64) -> Option<Bonus> {
        self.bonuses
            .iter()
            .position(|active| active.id == id)
            .map(|index| self.bonuses.remove(index))
    }

    /// Drop every active bonus without touching the target, used at round
    /// boundaries and on death.
    pub fn clear(&mut self) {
        self.bonuses.clear();
    }

    pub fn len(&self) -> usize {
        self.bonuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bonuses.is_empty()
    }

    /// Fold all active effects into an aggregate, starting every touched
    /// property from its default. A just-removed bonus seeds its
    /// properties so they reset even when nothing else touches them.
    pub fn aggregate(&self, removed: Option<&Bonus>, base_color: &str) -> Aggregate {
        let mut aggregate = Aggregate::default();
        if let Some(bonus) = removed {
            for property in bonus.effects() {
                aggregate.touch(&property, base_color);
            }
        }
        for bonus in self.bonuses.iter() {
            for property in bonus.effects() {
                aggregate.touch(&property, base_color);
                aggregate.fold(&property);
            }
        }
        aggregate
    }
}

/// Effective property set produced by folding a bonus stack.
/// `None` means the property was untouched and must be left alone.
#[derive(Debug, Default, PartialEq)]
pub struct Aggregate {
    pub radius: Option<f64>,
    pub velocity: Option<f64>,
    pub inverse: Option<i64>,
    pub invincible: Option<i64>,
    pub printing: Option<i64>,
    pub color: Option<String>,
    pub direction_in_loop: Option<bool>,
    pub angular_velocity_base: Option<f64>,
    pub borderless: Option<i64>,
}

impl Aggregate {
    fn touch(&mut self, property: &Property, base_color: &str) {
        match property {
            Property::Radius(_) => {
                self.radius.get_or_insert(0.0);
            }
            Property::Velocity(_) => {
                self.velocity.get_or_insert(crate::VELOCITY_DEFAULT);
            }
            Property::Inverse(_) => {
                self.inverse.get_or_insert(0);
            }
            Property::Invincible(_) => {
                self.invincible.get_or_insert(0);
            }
            Property::Printing(_) => {
                self.printing.get_or_insert(1);
            }
            Property::Color(_) => {
                self.color.get_or_insert_with(|| base_color.to_string());
            }
            Property::DirectionInLoop(_) => {
                self.direction_in_loop.get_or_insert(true);
            }
            Property::AngularVelocityBase(_) => {
                self.angular_velocity_base
                    .get_or_insert(crate::ANGULAR_VELOCITY_BASE);
            }
            Property::Borderless(_) => {
                self.borderless.get_or_insert(0);
            }
        }
    }

    fn fold(&mut self, property: &Property) {
        match property {
            Property::Radius(value) => {
                if let Some(total) = self.radius.as_mut() {
                    *total += value;
                }
            }
            Property::Velocity(value) => {
                if let Some(total) = self.velocity.as_mut() {
                    *total += value;
                }
            }
            Property::Inverse(count) => {
                if let Some(total) = self.inverse.as_mut() {
                    *total += count;
                }
            }
            Property::Invincible(count) => {
                if let Some(total) = self.invincible.as_mut() {
                    *total += count;
                }
            }
            Property::Printing(count) => {
                if let Some(total) = self.printing.as_mut() {
                    *total += count;
                }
            }
            Property::Borderless(count) => {
                if let Some(total) = self.borderless.as_mut() {
                    *total += count;
                }
            }
            Property::Color(color) => self.color = Some(color.clone()),
            Property::DirectionInLoop(direction) => self.direction_in_loop = Some(*direction),
            Property::AngularVelocityBase(base) => self.angular_velocity_base = Some(*base),
        }
    }
}

#[cfg(test)]
mod stack_tests {
    use super::*;
    use crate::game::Avatar;
    use crate::room::Player;

    fn avatar() -> Avatar {
        Avatar::new(&Player::with_id(1, 1, "Nia", Some("#ffeedd".into())))
    }

    fn tagged(mut bonus: Bonus, id: u64) -> Bonus {
        bonus.id = id;
        bonus
    }

    #[test]
    fn add_then_remove_restores_defaults() {
        let mut avatar = avatar();
        avatar.stack_add(tagged(Bonus::new(BonusKind::SelfFast, 0.0, 0.0), 1));
        assert_eq!(avatar.velocity(), 24.0);
        avatar.stack_remove(1);
        assert_eq!(avatar.velocity(), crate::VELOCITY_DEFAULT);
    }

    #[test]
    fn radius_effects_are_exponential() {
        let mut avatar = avatar();
        avatar.stack_add(tagged(Bonus::new(BonusKind::SelfSmall, 0.0, 0.0), 1));
        assert_eq!(avatar.radius(), crate::RADIUS_DEFAULT / 2.0);
        avatar.stack_add(tagged(Bonus::new(BonusKind::EnemyBig, 0.0, 0.0), 2));
        assert_eq!(avatar.radius(), crate::RADIUS_DEFAULT);
        avatar.stack_remove(1);
        assert_eq!(avatar.radius(), crate::RADIUS_DEFAULT * 2.0);
        avatar.stack_remove(2);
        assert_eq!(avatar.radius(), crate::RADIUS_DEFAULT);
    }

    #[test]
    fn inverse_counts_parity() {
        let mut avatar = avatar();
        avatar.stack_add(tagged(Bonus::new(BonusKind::EnemyInverse, 0.0, 0.0), 1));
        assert!(avatar.inverse());
        avatar.stack_add(tagged(Bonus::new(BonusKind::EnemyInverse, 0.0, 0.0), 2));
        assert!(!avatar.inverse());
        avatar.stack_remove(2);
        assert!(avatar.inverse());
        avatar.stack_remove(1);
        assert!(!avatar.inverse());
    }

    #[test]
    fn velocities_accumulate() {
        let mut avatar = avatar();
        avatar.stack_add(tagged(Bonus::new(BonusKind::SelfFast, 0.0, 0.0), 1));
        avatar.stack_add(tagged(Bonus::new(BonusKind::EnemySlow, 0.0, 0.0), 2));
        // 16 + 8 - 12 = 12
        assert_eq!(avatar.velocity(), 12.0);
    }

    #[test]
    fn slow_effects_clamp_at_half_speed() {
        let mut avatar = avatar();
        avatar.stack_add(tagged(Bonus::new(BonusKind::EnemySlow, 0.0, 0.0), 1));
        avatar.stack_add(tagged(Bonus::new(BonusKind::EnemySlow, 0.0, 0.0), 2));
        assert_eq!(avatar.velocity(), crate::VELOCITY_DEFAULT / 2.0);
    }

    #[test]
    fn straight_angle_replaces_and_restores() {
        let mut avatar = avatar();
        avatar.stack_add(tagged(Bonus::new(BonusKind::EnemyStraightAngle, 0.0, 0.0), 1));
        assert!(!avatar.direction_in_loop());
        assert_eq!(avatar.angular_velocity_base(), std::f64::consts::FRAC_PI_2);
        avatar.stack_remove(1);
        assert!(avatar.direction_in_loop());
        assert_eq!(avatar.angular_velocity_base(), crate::ANGULAR_VELOCITY_BASE);
    }

    #[test]
    fn color_replaces_and_restores() {
        let mut avatar = avatar();
        let bonus = tagged(Bonus::new(BonusKind::AllColor, 0.0, 0.0), 1);
        let rolled = bonus.color.clone().expect("spawn color");
        avatar.stack_add(bonus);
        assert_eq!(avatar.color, rolled);
        avatar.stack_remove(1);
        assert_eq!(avatar.color, "#ffeedd");
    }

    #[test]
    fn master_grants_invincibility_while_active() {
        let mut avatar = avatar();
        avatar.stack_add(tagged(Bonus::new(BonusKind::SelfMaster, 0.0, 0.0), 1));
        assert!(avatar.invincible());
        avatar.stack_remove(1);
        assert!(!avatar.invincible());
    }

    #[test]
    fn borderless_aggregates_on_game_stack() {
        let mut stack = BonusStack::new();
        stack.add(tagged(Bonus::new(BonusKind::GameBorderless, 0.0, 0.0), 1));
        let aggregate = stack.aggregate(None, "");
        assert_eq!(aggregate.borderless, Some(1));
        let removed = stack.remove(1).expect("present");
        let aggregate = stack.aggregate(Some(&removed), "");
        assert_eq!(aggregate.borderless, Some(0));
    }

    #[test]
    fn any_kind_unwinds_cleanly() {
        use crate::Arbitrary;
        for id in 1..=50 {
            let mut avatar = avatar();
            avatar.stack_add(tagged(Bonus::new(BonusKind::random(), 0.0, 0.0), id));
            avatar.stack_remove(id);
            assert_eq!(avatar.velocity(), crate::VELOCITY_DEFAULT);
            assert_eq!(avatar.radius(), crate::RADIUS_DEFAULT);
            assert!(!avatar.inverse());
            assert!(!avatar.invincible());
            assert!(avatar.direction_in_loop());
            assert_eq!(avatar.angular_velocity_base(), crate::ANGULAR_VELOCITY_BASE);
            assert_eq!(avatar.color, "#ffeedd");
            assert!(avatar.stack.is_empty());
        }
    }

    #[test]
    fn clear_skips_effects() {
        let mut avatar = avatar();
        avatar.stack_add(tagged(Bonus::new(BonusKind::SelfFast, 0.0, 0.0), 1));
        avatar.stack.clear();
        // properties keep their boosted values until something resolves
        assert_eq!(avatar.velocity(), 24.0);
        assert!(avatar.stack.is_empty());
    }
}
