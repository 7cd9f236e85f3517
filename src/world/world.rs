use super::*;
use std::collections::HashMap;
use std::f64::consts::PI;

/// Game world with uniform-grid spatial partitioning.
///
/// The broad phase maps a body's four bounding-box corners to grid cells;
/// the narrow phase is circle-vs-circle with a per-body match rule. Bodies
/// are stored in an arena keyed by a monotonically assigned id, islands
/// keep id lists, and every body lists its islands back, so membership is
/// bidirectional while the world is active.
#[derive(Debug)]
pub struct World {
    pub size: f64,
    island_size: f64,
    per_side: usize,
    islands: Vec<Island>,
    bodies: HashMap<u64, Body>,
    pub active: bool,
    count: u64,
}

impl World {
    pub fn new(size: f64) -> Self {
        let islands = (size / crate::ISLAND_GRID_SIZE).round().max(1.0) as usize;
        Self::with_islands(size, islands)
    }

    pub fn with_islands(size: f64, per_side: usize) -> Self {
        let island_size = size / per_side as f64;
        let mut islands = Vec::with_capacity(per_side * per_side);
        for y in 0..per_side {
            for x in 0..per_side {
                islands.push(Island::new(
                    island_size,
                    x as f64 * island_size,
                    y as f64 * island_size,
                ));
            }
        }
        Self {
            size,
            island_size,
            per_side,
            islands,
            bodies: HashMap::new(),
            active: false,
            count: 0,
        }
    }

    fn island_at(&self, x: f64, y: f64) -> Option<usize> {
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let col = (x / self.island_size) as usize;
        let row = (y / self.island_size) as usize;
        if col >= self.per_side || row >= self.per_side {
            return None;
        }
        Some(row * self.per_side + col)
    }

    fn corners(body: &Body) -> [(f64, f64); 4] {
        [
            (body.x - body.radius, body.y - body.radius),
            (body.x + body.radius, body.y - body.radius),
            (body.x - body.radius, body.y + body.radius),
            (body.x + body.radius, body.y + body.radius),
        ]
    }

    /// Insert a body into every island its bounding box touches.
    /// Dropped silently while the world is inactive.
    pub fn add_body(&mut self, mut body: Body) {
        if !self.active {
            return;
        }
        self.count += 1;
        body.id = self.count;
        for (x, y) in Self::corners(&body) {
            if let Some(index) = self.island_at(x, y) {
                if self.islands[index].add(body.id) {
                    body.islands.push(index);
                }
            }
        }
        self.bodies.insert(body.id, body);
    }

    /// Remove a body from exactly the islands it remembers.
    pub fn remove_body(&mut self, id: u64) {
        if !self.active {
            return;
        }
        if let Some(body) = self.bodies.remove(&id) {
            for index in body.islands {
                self.islands[index].remove(id);
            }
        }
    }

    pub fn body(&self, id: u64) -> Option<&Body> {
        self.bodies.get(&id)
    }

    fn touch(body: &Body, probe: &Body) -> bool {
        crate::distance(body.x, body.y, probe.x, probe.y) < body.radius + probe.radius
            && body.matches(probe)
    }

    fn get_body_at(&self, probe: &Body, x: f64, y: f64) -> Option<&Body> {
        let island = &self.islands[self.island_at(x, y)?];
        if !island.in_bound(probe) {
            return None;
        }
        island
            .bodies()
            .iter()
            .filter_map(|id| self.bodies.get(id))
            .find(|body| Self::touch(body, probe))
    }

    /// First body colliding with the probe, checking the four corner
    /// islands in a fixed order.
    pub fn get_body(&self, probe: &Body) -> Option<&Body> {
        Self::corners(probe)
            .into_iter()
            .find_map(|(x, y)| self.get_body_at(probe, x, y))
    }

    /// Whether the probe position is free. Every corner must fall inside
    /// the grid and report no collision.
    pub fn test_body(&self, probe: &Body) -> bool {
        Self::corners(probe).into_iter().all(|(x, y)| {
            self.island_at(x, y)
                .map(|index| {
                    let island = &self.islands[index];
                    !island.in_bound(probe)
                        || !island
                            .bodies()
                            .iter()
                            .filter_map(|id| self.bodies.get(id))
                            .any(|body| Self::touch(body, probe))
                })
                .unwrap_or(false)
        })
    }

    fn random_point(&self, margin: f64) -> f64 {
        margin + rand::random::<f64>() * (self.size - margin * 2.0)
    }

    fn random_angle() -> f64 {
        rand::random::<f64>() * PI * 2.0
    }

    /// Uniformly sample a free position away from the borders. Capped at
    /// 1000 attempts; the last sample is returned unconditionally so a
    /// crowded map can never stall a round.
    pub fn random_position(&self, radius: f64, border: f64) -> (f64, f64) {
        let margin = radius + border * self.size;
        let mut probe = Body::probe(self.random_point(margin), self.random_point(margin), margin);
        let mut attempts = 0;
        while !self.test_body(&probe) && attempts < 1000 {
            probe.x = self.random_point(margin);
            probe.y = self.random_point(margin);
            attempts += 1;
        }
        if attempts == 1000 {
            log::debug!("placement sampling exhausted, accepting last point");
        }
        (probe.x, probe.y)
    }

    /// Sample a heading that doesn't point into a nearby wall. Capped at
    /// 100 attempts.
    pub fn random_direction(&self, x: f64, y: f64, tolerance: f64) -> f64 {
        let margin = tolerance * self.size;
        let mut direction = Self::random_angle();
        let mut attempts = 0;
        while !self.direction_valid(direction, x, y, margin) && attempts < 100 {
            direction = Self::random_angle();
            attempts += 1;
        }
        direction
    }

    fn direction_valid(&self, angle: f64, x: f64, y: f64, margin: f64) -> bool {
        let quarter = PI / 2.0;
        for i in 0..4usize {
            let from = quarter * i as f64;
            let to = quarter * (i + 1) as f64;
            if from <= angle && angle < to {
                if Self::hypotenuse(angle - from, self.border_distance(i, x, y)) < margin {
                    return false;
                }
                let next = (i + 1) % 4;
                if Self::hypotenuse(to - angle, self.border_distance(next, x, y)) < margin {
                    return false;
                }
                return true;
            }
        }
        true
    }

    fn hypotenuse(angle: f64, adjacent: f64) -> f64 {
        let cos = angle.cos();
        if cos.abs() < 0.001 {
            return f64::INFINITY;
        }
        adjacent / cos
    }

    fn border_distance(&self, border: usize, x: f64, y: f64) -> f64 {
        match border {
            0 => self.size - x,
            1 => self.size - y,
            2 => x,
            _ => y,
        }
    }

    /// Projection onto the nearest wall when the point sits within
    /// `margin` of a border; checks left, right, top, bottom in order.
    pub fn bound_intersect(&self, x: f64, y: f64, margin: f64) -> Option<(f64, f64)> {
        if x - margin < 0.0 {
            return Some((0.0, y));
        }
        if x + margin > self.size {
            return Some((self.size, y));
        }
        if y - margin < 0.0 {
            return Some((x, 0.0));
        }
        if y + margin > self.size {
            return Some((x, self.size));
        }
        None
    }

    /// Wrap a wall point onto the opposite wall, for borderless play.
    pub fn opposite(&self, x: f64, y: f64) -> (f64, f64) {
        if x == 0.0 {
            return (self.size, y);
        }
        if x == self.size {
            return (0.0, y);
        }
        if y == 0.0 {
            return (x, self.size);
        }
        if y == self.size {
            return (x, 0.0);
        }
        (x, y)
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.count = 0;
        self.bodies.clear();
        for island in self.islands.iter_mut() {
            island.clear();
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    #[cfg(test)]
    pub fn islands(&self) -> &[Island] {
        &self.islands
    }
}

#[cfg(test)]
mod world_tests {
    use super::*;

    fn live(size: f64) -> World {
        let mut world = World::new(size);
        world.activate();
        world
    }

    #[test]
    fn membership_is_bidirectional() {
        let mut world = live(80.0);
        world.add_body(Body::trail(1, 40.0, 40.0, 0.6, 0));
        let body = world.body(1).expect("inserted");
        assert!(!body.islands.is_empty());
        assert!(body.islands.len() <= 4);
        for &index in body.islands.iter() {
            assert!(world.islands()[index].contains(body.id));
        }
        let islands = body.islands.clone();
        world.remove_body(1);
        for index in islands {
            assert!(!world.islands()[index].contains(1));
        }
    }

    #[test]
    fn straddling_body_lands_in_four_islands() {
        let mut world = live(80.0);
        world.add_body(Body::trail(1, 40.0, 40.0, 1.0, 0));
        assert_eq!(world.body(1).expect("inserted").islands.len(), 4);
    }

    #[test]
    fn inactive_world_ignores_insertions() {
        let mut world = World::new(80.0);
        world.add_body(Body::trail(1, 40.0, 40.0, 0.6, 0));
        assert!(world.body(1).is_none());
    }

    #[test]
    fn collision_found_across_islands() {
        let mut world = live(80.0);
        world.add_body(Body::trail(1, 10.0, 10.0, 0.6, 0));
        let probe = Body::trail(2, 10.5, 10.0, 0.6, 0);
        assert!(world.get_body(&probe).is_some());
        assert!(!world.test_body(&probe));
    }

    #[test]
    fn self_trail_immunity_in_queries() {
        let mut world = live(80.0);
        for num in 0..6u64 {
            world.add_body(Body::trail(1, 10.0 + num as f64 * 0.3, 10.0, 0.6, num));
        }
        // head right on top of the freshest segments
        let head = Body::trail(1, 11.5, 10.0, 0.6, 6);
        let hit = world.get_body(&head).expect("old segments collide");
        match hit.kind {
            BodyKind::Trail { num, .. } => assert!(6 - num > crate::TRAIL_LATENCY),
            _ => panic!("expected a trail body"),
        }
    }

    #[test]
    fn probe_outside_grid_is_not_free() {
        let world = live(80.0);
        assert!(!world.test_body(&Body::probe(0.1, 0.1, 0.6)));
        assert!(world.test_body(&Body::probe(40.0, 40.0, 0.6)));
    }

    #[test]
    fn bound_intersect_checks_walls_in_order() {
        let world = live(80.0);
        assert_eq!(world.bound_intersect(0.2, 40.0, 0.6), Some((0.0, 40.0)));
        assert_eq!(world.bound_intersect(79.9, 40.0, 0.6), Some((80.0, 40.0)));
        assert_eq!(world.bound_intersect(40.0, 0.2, 0.6), Some((40.0, 0.0)));
        assert_eq!(world.bound_intersect(40.0, 79.9, 0.6), Some((40.0, 80.0)));
        assert_eq!(world.bound_intersect(40.0, 40.0, 0.6), None);
    }

    #[test]
    fn opposite_wraps_on_walls() {
        let world = live(80.0);
        assert_eq!(world.opposite(0.0, 50.0), (80.0, 50.0));
        assert_eq!(world.opposite(80.0, 50.0), (0.0, 50.0));
        assert_eq!(world.opposite(30.0, 0.0), (30.0, 80.0));
        assert_eq!(world.opposite(30.0, 80.0), (30.0, 0.0));
    }

    #[test]
    fn random_position_respects_margin() {
        let world = live(80.0);
        for _ in 0..50 {
            let (x, y) = world.random_position(0.6, 0.05);
            let margin = 0.6 + 0.05 * 80.0;
            assert!(x >= margin && x <= 80.0 - margin);
            assert!(y >= margin && y <= 80.0 - margin);
        }
    }

    #[test]
    fn random_direction_avoids_adjacent_walls() {
        let world = live(80.0);
        for _ in 0..20 {
            let direction = world.random_direction(40.0, 40.0, 0.3);
            assert!((0.0..std::f64::consts::TAU).contains(&direction));
        }
    }

    #[test]
    fn clear_deactivates_and_empties() {
        let mut world = live(80.0);
        world.add_body(Body::trail(1, 40.0, 40.0, 0.6, 0));
        world.clear();
        assert!(!world.active);
        assert!(world.body(1).is_none());
        assert!(world.islands().iter().all(|island| island.bodies().is_empty()));
    }
}
