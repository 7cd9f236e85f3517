use super::*;
use crate::bonus::Bonus;
use crate::bonus::BonusStack;
use crate::collection::Identifiable;
use crate::room::Player;
use crate::world::Body;
use serde_json::json;

/// A player's in-game trail-leaving character.
///
/// Owns its trail, bonus stack, and print manager. All mutation goes
/// through setters that deduplicate by equality and record a [`GameEvent`]
/// for the controller to drain. Invariant: the cartesian velocity always
/// matches `velocity` and `angle` (speed is expressed per millisecond).
#[derive(Debug)]
pub struct Avatar {
    pub id: u64,
    pub name: String,
    pub color: String,
    base_color: String,
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
    pub angular_velocity: f64,
    velocity: f64,
    radius: f64,
    angular_velocity_base: f64,
    inverse: bool,
    invincible: bool,
    direction_in_loop: bool,
    pub alive: bool,
    pub printing: bool,
    pub score: u64,
    pub round_score: u64,
    pub ready: bool,
    pub present: bool,
    pub trail: Trail,
    pub stack: BonusStack,
    pub print: PrintManager,
    pub body_count: u64,
    pub events: Vec<GameEvent>,
}

impl Identifiable for Avatar {
    fn id(&self) -> u64 {
        self.id
    }
    fn assign(&mut self, id: u64) {
        self.id = id;
    }
}

impl Avatar {
    pub fn new(player: &Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            color: player.color.clone(),
            base_color: player.color.clone(),
            x: 0.0,
            y: 0.0,
            angle: 0.0,
            velocity_x: 0.0,
            velocity_y: 0.0,
            angular_velocity: 0.0,
            velocity: crate::VELOCITY_DEFAULT,
            radius: crate::RADIUS_DEFAULT,
            angular_velocity_base: crate::ANGULAR_VELOCITY_BASE,
            inverse: false,
            invincible: false,
            direction_in_loop: true,
            alive: true,
            printing: false,
            score: 0,
            round_score: 0,
            ready: false,
            present: true,
            trail: Trail::new(),
            stack: BonusStack::new(),
            print: PrintManager::new(),
            body_count: 0,
            events: Vec::new(),
        }
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }
    pub fn radius(&self) -> f64 {
        self.radius
    }
    pub fn invincible(&self) -> bool {
        self.invincible
    }
    pub fn inverse(&self) -> bool {
        self.inverse
    }
    pub fn direction_in_loop(&self) -> bool {
        self.direction_in_loop
    }
    pub fn angular_velocity_base(&self) -> f64 {
        self.angular_velocity_base
    }

    /// Collision body at the avatar's head. Its sequence number is the
    /// current trail-point counter, which keeps the freshest segments
    /// exempt from self-collision.
    pub fn probe(&self) -> Body {
        Body::trail(self.id, self.x, self.y, self.radius, self.body_count)
    }

    /// Claim the next trail-point sequence number.
    pub fn next_body(&mut self) -> u64 {
        let num = self.body_count;
        self.body_count += 1;
        num
    }
}

// frame update
impl Avatar {
    pub fn update(&mut self, step: f64) {
        if !self.alive {
            return;
        }
        self.update_angle(step);
        self.update_position(step);
        if self.printing && self.time_to_draw() {
            self.add_point(self.x, self.y, false);
        }
    }

    fn time_to_draw(&self) -> bool {
        match self.trail.last() {
            Some((x, y)) => crate::distance(x, y, self.x, self.y) > self.radius,
            None => true,
        }
    }

    fn update_angle(&mut self, step: f64) {
        if self.angular_velocity != 0.0 {
            if self.direction_in_loop {
                self.set_angle(self.angle + self.angular_velocity * step);
            } else {
                // right-angle turn: apply once, then stop turning
                self.set_angle(self.angle + self.angular_velocity);
                self.update_angular_velocity(Some(0.0));
            }
        }
    }

    fn update_position(&mut self, step: f64) {
        self.set_position(
            self.x + self.velocity_x * step,
            self.y + self.velocity_y * step,
        );
    }
}

// steering and kinematics
impl Avatar {
    /// Steering input. `Some(factor)` with factor in {-1, 0, 1} comes from
    /// the player; `None` re-applies the sign of the current turn under
    /// the current inversion, used when an inverse effect starts or ends.
    pub fn update_angular_velocity(&mut self, factor: Option<f64>) {
        let inversion = if self.inverse { -1.0 } else { 1.0 };
        let factor = match factor {
            Some(factor) => factor,
            None if self.angular_velocity == 0.0 => return,
            None => self.angular_velocity.signum() * inversion,
        };
        self.set_angular_velocity(factor * self.angular_velocity_base * inversion);
    }

    fn set_angular_velocity(&mut self, angular_velocity: f64) {
        if self.angular_velocity != angular_velocity {
            self.angular_velocity = angular_velocity;
        }
    }

    pub fn set_angle(&mut self, angle: f64) {
        if self.angle != angle {
            self.angle = angle;
            self.update_velocities();
            self.events.push(GameEvent::Angle { avatar: self.id, angle });
        }
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        if self.x != x || self.y != y {
            self.x = x;
            self.y = y;
            self.events.push(GameEvent::Position { avatar: self.id, x, y });
        }
    }

    pub fn set_velocity(&mut self, velocity: f64) {
        let velocity = velocity.max(crate::VELOCITY_DEFAULT / 2.0);
        if self.velocity != velocity {
            self.velocity = velocity;
            self.update_velocities();
            self.events.push(GameEvent::Property {
                avatar: self.id,
                name: "velocity",
                value: json!(self.velocity),
            });
        }
    }

    fn update_velocities(&mut self) {
        let velocity = self.velocity / 1000.0;
        self.velocity_x = self.angle.cos() * velocity;
        self.velocity_y = self.angle.sin() * velocity;
        self.update_base_angular_velocity();
    }

    /// Turn rate scales with speed so the turning circle stays playable.
    fn update_base_angular_velocity(&mut self) {
        if self.direction_in_loop {
            let ratio = self.velocity / crate::VELOCITY_DEFAULT;
            self.angular_velocity_base =
                ratio * crate::ANGULAR_VELOCITY_BASE + (1.0 / ratio).ln() / 1000.0;
            self.update_angular_velocity(None);
        }
    }
}

// overridable properties
impl Avatar {
    pub fn set_radius(&mut self, radius: f64) {
        let radius = radius.max(crate::RADIUS_DEFAULT / 8.0);
        if self.radius != radius {
            self.radius = radius;
            self.events.push(GameEvent::Property {
                avatar: self.id,
                name: "radius",
                value: json!(self.radius),
            });
        }
    }

    pub fn set_invincible(&mut self, invincible: bool) {
        if self.invincible != invincible {
            self.invincible = invincible;
            self.events.push(GameEvent::Property {
                avatar: self.id,
                name: "invincible",
                value: json!(self.invincible),
            });
        }
    }

    pub fn set_inverse(&mut self, inverse: bool) {
        if self.inverse != inverse {
            self.inverse = inverse;
            self.update_angular_velocity(None);
            self.events.push(GameEvent::Property {
                avatar: self.id,
                name: "inverse",
                value: json!(self.inverse),
            });
        }
    }

    pub fn set_color(&mut self, color: String) {
        if self.color != color {
            self.color = color;
            self.events.push(GameEvent::Property {
                avatar: self.id,
                name: "color",
                value: json!(&self.color),
            });
        }
    }

    pub fn set_direction_in_loop(&mut self, direction_in_loop: bool) {
        self.direction_in_loop = direction_in_loop;
    }

    pub fn set_angular_velocity_base(&mut self, base: f64) {
        self.angular_velocity_base = base;
    }

    pub fn set_printing(&mut self, printing: bool) {
        if self.printing != printing {
            self.printing = printing;
            self.add_point(self.x, self.y, false);
            if !self.printing {
                self.trail.clear();
            }
            self.events.push(GameEvent::Property {
                avatar: self.id,
                name: "printing",
                value: json!(self.printing),
            });
        }
    }
}

// trail printing
impl Avatar {
    pub fn add_point(&mut self, x: f64, y: f64, important: bool) {
        self.trail.add_point(x, y);
        self.events.push(GameEvent::Point { avatar: self.id, x, y, important });
    }

    pub fn print_start(&mut self) {
        if !self.print.active {
            self.print.active = true;
            self.print.last = (self.x, self.y);
            self.print_toggle(true);
        }
    }

    pub fn print_stop(&mut self) {
        if self.print.active {
            self.print.active = false;
            self.print_toggle(false);
            self.print.clear();
        }
    }

    pub fn print_test(&mut self) {
        if self.print.active {
            let (last_x, last_y) = self.print.last;
            self.print.distance -= crate::distance(last_x, last_y, self.x, self.y);
            self.print.last = (self.x, self.y);
            if self.print.distance <= 0.0 {
                self.print_toggle(!self.printing);
            }
        }
    }

    fn print_toggle(&mut self, printing: bool) {
        self.set_printing(printing);
        self.print.distance = self.print.sample(self.printing);
    }
}

// scores
impl Avatar {
    pub fn add_score(&mut self, score: u64) {
        self.set_round_score(self.round_score + score);
    }

    pub fn set_round_score(&mut self, score: u64) {
        if self.round_score != score {
            self.round_score = score;
            self.events.push(GameEvent::RoundScore { avatar: self.id, score });
        }
    }

    pub fn set_score(&mut self, score: u64) {
        if self.score != score {
            self.score = score;
            self.events.push(GameEvent::Score { avatar: self.id, score });
        }
    }

    /// Commit the round score into the total at round end.
    pub fn resolve_score(&mut self) {
        self.set_score(self.score + self.round_score);
        self.round_score = 0;
    }
}

// bonus stack
impl Avatar {
    pub fn stack_add(&mut self, bonus: Bonus) {
        let (id, kind, duration) = (bonus.id, bonus.kind.name(), bonus.kind.duration());
        if self.stack.add(bonus) {
            self.resolve_stack(None);
            self.events.push(GameEvent::Stack {
                avatar: self.id,
                change: StackChange::Add,
                bonus: id,
                kind,
                duration,
            });
        }
    }

    pub fn stack_remove(&mut self, id: u64) {
        if let Some(bonus) = self.stack.remove(id) {
            self.resolve_stack(Some(&bonus));
            self.events.push(GameEvent::Stack {
                avatar: self.id,
                change: StackChange::Remove,
                bonus: id,
                kind: bonus.kind.name(),
                duration: bonus.kind.duration(),
            });
        }
    }

    /// Recompute the effective property set from the active bonuses,
    /// starting each touched property from its default.
    fn resolve_stack(&mut self, removed: Option<&Bonus>) {
        let aggregate = self.stack.aggregate(removed, &self.base_color);
        if let Some(exponent) = aggregate.radius {
            self.set_radius(crate::RADIUS_DEFAULT * 2f64.powf(exponent));
        }
        if let Some(velocity) = aggregate.velocity {
            self.set_velocity(velocity);
        }
        if let Some(count) = aggregate.inverse {
            self.set_inverse(count % 2 != 0);
        }
        if let Some(count) = aggregate.invincible {
            self.set_invincible(count > 0);
        }
        if let Some(color) = aggregate.color {
            self.set_color(color);
        }
        if let Some(direction) = aggregate.direction_in_loop {
            self.set_direction_in_loop(direction);
        }
        if let Some(base) = aggregate.angular_velocity_base {
            self.set_angular_velocity_base(base);
        }
        if let Some(count) = aggregate.printing {
            if count > 0 {
                self.print_start();
            } else {
                self.print_stop();
            }
        }
    }
}

// lifecycle
impl Avatar {
    pub fn die(&mut self, killer: Option<&Body>) {
        self.stack.clear();
        self.alive = false;
        self.add_point(self.x, self.y, false);
        self.print_stop();
        self.events.push(GameEvent::Die {
            avatar: self.id,
            killer: killer.and_then(|body| body.owner()),
            old: killer.map(|body| body.is_old()),
        });
    }

    /// Reset all overridable properties for a new round. Scores survive,
    /// the round score does not. Field writes bypass the setters so round
    /// resets don't generate wire traffic.
    pub fn clear(&mut self) {
        self.stack.clear();
        self.x = self.radius;
        self.y = self.radius;
        self.angle = 0.0;
        self.velocity_x = 0.0;
        self.velocity_y = 0.0;
        self.angular_velocity = 0.0;
        self.round_score = 0;
        self.velocity = crate::VELOCITY_DEFAULT;
        self.alive = true;
        self.printing = false;
        self.color = self.base_color.clone();
        self.radius = crate::RADIUS_DEFAULT;
        self.inverse = false;
        self.invincible = false;
        self.direction_in_loop = true;
        self.angular_velocity_base = crate::ANGULAR_VELOCITY_BASE;
        self.trail.clear();
        self.print_stop();
        self.body_count = 0;
    }

    /// Tear down when the owning player leaves mid-game.
    pub fn destroy(&mut self) {
        self.clear();
        self.present = false;
        self.alive = false;
    }

    pub fn serialize(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "name": &self.name,
            "color": &self.color,
            "score": self.score,
        })
    }
}
