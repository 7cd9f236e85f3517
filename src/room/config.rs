use crate::bonus::BonusKind;
use rand::Rng;
use serde_json::json;
use serde_json::Value;
use std::collections::HashMap;

/// Per-room settings: visibility, win threshold, bonus tuning.
///
/// A closed room is guarded by a generated 4-digit password; reopening
/// drops it. `bonusRate` in [-1, 1] stretches or tightens the spawn
/// cadence, and each bonus kind can be toggled individually.
#[derive(Debug)]
pub struct RoomConfig {
    pub open: bool,
    pub password: Option<String>,
    pub custom_max_score: Option<u64>,
    variables: HashMap<String, f64>,
    bonuses: Vec<(BonusKind, bool)>,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            open: true,
            password: None,
            custom_max_score: None,
            variables: HashMap::from([("bonusRate".to_string(), 0.0)]),
            bonuses: BonusKind::ALL.into_iter().map(|kind| (kind, true)).collect(),
        }
    }
}

impl RoomConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip visibility. Closing generates a fresh password, reopening
    /// clears it. Returns false when nothing changed.
    pub fn set_open(&mut self, open: bool) -> bool {
        if self.open == open {
            return false;
        }
        self.open = open;
        self.password = match open {
            true => None,
            false => Some(Self::generate_password()),
        };
        true
    }

    pub fn allow(&self, password: Option<&str>) -> bool {
        self.open || self.password.as_deref() == password
    }

    /// Zero and absent both mean "use the default threshold".
    pub fn set_max_score(&mut self, max_score: Option<u64>) -> bool {
        self.custom_max_score = max_score.filter(|&score| score > 0);
        true
    }

    pub fn max_score(&self, players: usize) -> u64 {
        self.custom_max_score
            .unwrap_or_else(|| (players.saturating_sub(1) as u64 * 10).max(1))
    }

    pub fn variable(&self, name: &str) -> Option<f64> {
        self.variables.get(name).copied()
    }

    pub fn set_variable(&mut self, name: &str, value: f64) -> bool {
        if !self.variables.contains_key(name) || !(-1.0..=1.0).contains(&value) {
            return false;
        }
        self.variables.insert(name.to_string(), value);
        true
    }

    pub fn bonus_rate(&self) -> f64 {
        self.variable("bonusRate").unwrap_or(0.0)
    }

    pub fn set_bonus(&mut self, name: &str, enabled: bool) -> bool {
        let Some(kind) = BonusKind::from_name(name) else {
            return false;
        };
        for (candidate, state) in self.bonuses.iter_mut() {
            if *candidate == kind {
                *state = enabled;
            }
        }
        true
    }

    pub fn toggle_bonus(&mut self, name: &str) -> bool {
        let Some(kind) = BonusKind::from_name(name) else {
            return false;
        };
        for (candidate, state) in self.bonuses.iter_mut() {
            if *candidate == kind {
                *state = !*state;
            }
        }
        true
    }

    /// Kinds the bonus manager may draw from.
    pub fn enabled(&self) -> Vec<BonusKind> {
        self.bonuses
            .iter()
            .filter(|(_, enabled)| *enabled)
            .map(|(kind, _)| *kind)
            .collect()
    }

    fn generate_password() -> String {
        let ref mut rng = rand::rng();
        (0..crate::PASSWORD_LENGTH)
            .map(|_| rng.random_range(1..=9).to_string())
            .collect()
    }

    pub fn serialize(&self) -> Value {
        json!({
            "maxScore": self.custom_max_score,
            "variables": &self.variables,
            "bonuses": self
                .bonuses
                .iter()
                .map(|(kind, enabled)| (kind.name().to_string(), json!(enabled)))
                .collect::<serde_json::Map<_, _>>(),
            "open": self.open,
            "password": &self.password,
        })
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn closing_generates_a_password() {
        let mut config = RoomConfig::new();
        assert!(config.set_open(false));
        let password = config.password.clone().expect("password generated");
        assert_eq!(password.len(), crate::PASSWORD_LENGTH);
        assert!(password.chars().all(|c| ('1'..='9').contains(&c)));
        assert!(!config.allow(None));
        assert!(!config.allow(Some("0000")));
        assert!(config.allow(Some(&password)));
        assert!(config.set_open(true));
        assert!(config.password.is_none());
        assert!(config.allow(None));
    }

    #[test]
    fn reclosing_is_a_noop() {
        let mut config = RoomConfig::new();
        assert!(!config.set_open(true));
    }

    #[test]
    fn max_score_defaults_by_player_count() {
        let config = RoomConfig::new();
        assert_eq!(config.max_score(1), 1);
        assert_eq!(config.max_score(3), 20);
        let mut config = RoomConfig::new();
        config.set_max_score(Some(42));
        assert_eq!(config.max_score(3), 42);
        config.set_max_score(Some(0));
        assert_eq!(config.max_score(3), 20);
    }

    #[test]
    fn bonus_rate_is_bounded() {
        let mut config = RoomConfig::new();
        assert!(config.set_variable("bonusRate", 0.5));
        assert_eq!(config.bonus_rate(), 0.5);
        assert!(!config.set_variable("bonusRate", 1.5));
        assert!(!config.set_variable("spawnRate", 0.1));
        assert_eq!(config.bonus_rate(), 0.5);
    }

    #[test]
    fn toggling_bonuses_filters_the_draw() {
        let mut config = RoomConfig::new();
        assert_eq!(config.enabled().len(), BonusKind::ALL.len());
        assert!(config.set_bonus("BonusGameClear", false));
        assert!(!config.enabled().contains(&BonusKind::GameClear));
        assert!(config.toggle_bonus("BonusGameClear"));
        assert!(config.enabled().contains(&BonusKind::GameClear));
        assert!(!config.set_bonus("BonusMystery", true));
    }
}
