use super::*;
use crate::collection::Collection;
use crate::world::Body;
use crate::world::World;
use tokio::task::JoinHandle;

/// Spawns bonuses into a game and detects pick-ups.
///
/// Keeps a second spatial index with a single cell, independent from the
/// collision world: bonuses only ever collide with avatar heads, and a
/// linear scan over at most twenty bodies beats grid upkeep. Placement
/// still consults both indices so bonuses never spawn on a trail.
#[derive(Debug)]
pub struct BonusManager {
    world: World,
    pub bonuses: Collection<Bonus>,
    kinds: Vec<BonusKind>,
    poping_time: f64,
    pub popper: Option<JoinHandle<()>>,
}

impl BonusManager {
    pub fn new(size: f64, kinds: Vec<BonusKind>, rate: f64) -> Self {
        Self {
            world: World::with_islands(size, 1),
            bonuses: Collection::new(),
            kinds,
            // positive rates tighten the spawn cadence
            poping_time: crate::BONUS_POPING_TIME - (crate::BONUS_POPING_TIME / 2.0) * rate,
            popper: None,
        }
    }

    pub fn start(&mut self) {
        self.clear();
        self.world.activate();
    }

    pub fn stop(&mut self) {
        if let Some(popper) = self.popper.take() {
            popper.abort();
        }
        self.clear();
    }

    pub fn clear(&mut self) {
        self.world.clear();
        self.bonuses.clear();
    }

    pub fn active(&self) -> bool {
        self.world.active
    }

    pub fn scheduled(&self) -> bool {
        !self.kinds.is_empty()
    }

    /// Next inter-spawn delay in ms, varying between one and two times the
    /// configured cadence.
    pub fn random_poping_time(&self) -> u64 {
        (self.poping_time * (1.0 + rand::random::<f64>())) as u64
    }

    /// Spawn one bonus if below the cap. Returns the spawned bonus so the
    /// game can announce it.
    pub fn pop(&mut self, arena: &World, alive: usize, present: usize) -> Option<&Bonus> {
        if self.bonuses.len() >= crate::BONUS_CAP {
            return None;
        }
        let kind = self.random_kind(alive, present)?;
        let (x, y) = self.random_position(arena, crate::BONUS_RADIUS, crate::BONUS_POPING_MARGIN);
        let id = self.bonuses.add(Bonus::new(kind, x, y))?;
        self.world.add_body(Body::bonus(id, x, y, crate::BONUS_RADIUS));
        self.bonuses.get(id)
    }

    /// Remove and return the bonus colliding with an avatar head, if any.
    pub fn catch(&mut self, probe: &Body) -> Option<Bonus> {
        let (body, bonus) = self
            .world
            .get_body(probe)
            .and_then(|body| body.owner().map(|bonus| (body.id, bonus)))?;
        self.world.remove_body(body);
        self.bonuses.remove(bonus)
    }

    /// Weighted draw over the enabled kinds by their current probability.
    fn random_kind(&self, alive: usize, present: usize) -> Option<BonusKind> {
        let mut pot = 0.0;
        let weighted = self
            .kinds
            .iter()
            .map(|&kind| (kind, kind.probability(alive, present)))
            .filter(|(_, probability)| *probability > 0.0)
            .map(|(kind, probability)| {
                pot += probability;
                (kind, pot)
            })
            .collect::<Vec<_>>();
        let value = rand::random::<f64>() * pot;
        weighted
            .into_iter()
            .find(|(_, cumulative)| value < *cumulative)
            .map(|(kind, _)| kind)
    }

    /// Sample a point free in both the collision world and the bonus
    /// index. Capped at 100 attempts, last sample wins.
    fn random_position(&self, arena: &World, radius: f64, border: f64) -> (f64, f64) {
        let margin = radius + border * arena.size;
        let sample = || margin + rand::random::<f64>() * (arena.size - margin * 2.0);
        let mut probe = Body::probe(sample(), sample(), margin);
        let mut attempts = 0;
        while (!arena.test_body(&probe) || !self.world.test_body(&probe)) && attempts < 100 {
            probe.x = sample();
            probe.y = sample();
            attempts += 1;
        }
        (probe.x, probe.y)
    }

    /// Rebuild the index for a new game size, dropping outstanding
    /// bonuses.
    pub fn set_size(&mut self, size: f64) {
        self.world = World::with_islands(size, 1);
        self.bonuses.clear();
    }
}
