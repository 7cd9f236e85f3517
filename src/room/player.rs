use crate::collection::Identifiable;
use rand::Rng;
use serde_json::json;
use serde_json::Value;

/// A named participant owned by one session. Player ids are assigned by
/// the room roster and inherited by the player's avatar.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u64,
    pub session: u64,
    pub name: String,
    pub color: String,
    pub ready: bool,
}

impl Identifiable for Player {
    fn id(&self) -> u64 {
        self.id
    }
    fn assign(&mut self, id: u64) {
        self.id = id;
    }
}

impl Player {
    pub fn new(session: u64, name: &str, color: Option<String>) -> Self {
        Self {
            id: 0,
            session,
            name: name.to_string(),
            color: color
                .filter(|color| Self::validate_color(color, false))
                .unwrap_or_else(Self::random_color),
            ready: false,
        }
    }

    #[cfg(test)]
    pub fn with_id(id: u64, session: u64, name: &str, color: Option<String>) -> Self {
        let mut player = Self::new(session, name, color);
        player.id = id;
        player
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Recolor if the candidate passes the brightness rule.
    pub fn set_color(&mut self, color: &str) -> bool {
        if !Self::validate_color(color, true) {
            return false;
        }
        self.color = color.to_string();
        true
    }

    pub fn toggle_ready(&mut self) {
        self.ready = !self.ready;
    }

    pub fn serialize(&self, active: bool) -> Value {
        json!({
            "client": self.session,
            "id": self.id,
            "name": &self.name,
            "color": &self.color,
            "ready": self.ready,
            "active": active,
        })
    }

    /// `#rrggbb`, either case. With `yiq` the color must also clear the
    /// brightness floor so trails stay visible on the dark field.
    pub fn validate_color(color: &str, yiq: bool) -> bool {
        let Some(hex) = color.strip_prefix('#') else {
            return false;
        };
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return false;
        }
        if !yiq {
            return true;
        }
        let channel = |at: usize| {
            u8::from_str_radix(&hex[at..at + 2], 16).map(f64::from).unwrap_or(0.0)
        };
        let (r, g, b) = (channel(0), channel(2), channel(4));
        (r * 0.4 + g * 0.5 + b * 0.3) / 255.0 > 0.3
    }

    pub fn random_color() -> String {
        let ref mut rng = rand::rng();
        loop {
            let color = format!(
                "#{:02x}{:02x}{:02x}",
                rng.random_range(1..=255),
                rng.random_range(1..=255),
                rng.random_range(1..=255),
            );
            if Self::validate_color(&color, true) {
                return color;
            }
        }
    }
}

#[cfg(test)]
mod player_tests {
    use super::*;

    #[test]
    fn color_shape_is_enforced() {
        assert!(Player::validate_color("#a1B2c3", false));
        assert!(!Player::validate_color("a1b2c3", false));
        assert!(!Player::validate_color("#a1b2c", false));
        assert!(!Player::validate_color("#a1b2cg", false));
    }

    #[test]
    fn brightness_floor_rejects_dark_colors() {
        assert!(!Player::validate_color("#000000", true));
        assert!(!Player::validate_color("#200020", true));
        assert!(Player::validate_color("#ffffff", true));
        assert!(Player::validate_color("#80ff00", true));
    }

    #[test]
    fn invalid_requested_color_falls_back_to_random() {
        let player = Player::new(1, "Ada", Some("night-black".into()));
        assert!(Player::validate_color(&player.color, true));
    }

    #[test]
    fn random_colors_always_pass_the_floor() {
        for _ in 0..50 {
            assert!(Player::validate_color(&Player::random_color(), true));
        }
    }

    #[test]
    fn set_color_rejects_dark() {
        let mut player = Player::new(1, "Ada", Some("#ffffff".into()));
        assert!(!player.set_color("#010101"));
        assert_eq!(player.color, "#ffffff");
        assert!(player.set_color("#ffee00"));
        assert_eq!(player.color, "#ffee00");
    }
}
