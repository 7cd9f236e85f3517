use super::*;
use crate::bonus::*;
use crate::collection::Collection;
use crate::room::Player;
use crate::room::RoomConfig;
use crate::session::SocketGroup;
use crate::world::Body;
use crate::world::World;
use std::collections::HashMap;
use tokio::task::JoinHandle;

/// Deferred work a mutation asks the controller to schedule. The model
/// never spawns tasks itself; it records what must happen and when, and
/// the controller turns that into cancellable timers on the room's task.
#[derive(Debug)]
pub enum Directive {
    /// Begin the round after the warmup delay.
    Start(u64),
    /// Stop the loop after the warmdown delay.
    Stop(u64),
    /// Kick off every print manager after the grace delay.
    Prints(u64),
    /// Expire an applied bonus.
    BonusOff { bonus: u64, after: u64 },
    /// The game is over; the room must drop it.
    End,
}

/// Who a picked-up bonus landed on, kept so expiry can undo it.
#[derive(Debug)]
pub enum BonusTarget {
    Avatars(Vec<u64>),
    Game,
    Nobody,
}

pub struct AppliedBonus {
    pub target: BonusTarget,
    pub timer: Option<JoinHandle<()>>,
}

/// Outcome of the win test run every time the loop stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Won {
    /// Keep playing, start another round.
    Not,
    /// Over without a nameable winner (everyone left).
    Decided,
    /// Over with a champion.
    Champion(u64),
}

#[derive(Default)]
pub struct GameTimers {
    pub tick: Option<JoinHandle<()>>,
    pub warm: Option<JoinHandle<()>>,
    pub prints: Option<JoinHandle<()>>,
    pub waiting: Option<JoinHandle<()>>,
}

/// One game of a room: the collision world, the avatars, the bonus
/// pipeline, and the round state machine.
///
/// All mutation happens under the owning room's lock; timers and the tick
/// loop re-enter through the controller. Events accumulate in `events` and
/// are flushed to the attached sessions after every mutation scope.
pub struct Game {
    pub name: String,
    pub size: f64,
    pub world: World,
    pub avatars: Collection<Avatar>,
    pub deaths: Vec<u64>,
    pub bonus_manager: BonusManager,
    pub bonus_stack: BonusStack,
    pub applied: HashMap<u64, AppliedBonus>,
    pub round_winner: Option<u64>,
    pub game_winner: Option<u64>,
    pub started: bool,
    pub in_round: bool,
    pub borderless: bool,
    pub rendered: Option<f64>,
    pub max_score: u64,
    pub death_in_frame: bool,
    pub events: Vec<GameEvent>,
    pub after: Vec<Directive>,
    pub clients: SocketGroup,
    pub timers: GameTimers,
}

impl Game {
    pub fn new(name: &str, players: &Collection<Player>, config: &RoomConfig) -> Self {
        let mut avatars = Collection::new();
        for player in players.iter() {
            let mut avatar = Avatar::new(player);
            avatar.clear();
            avatars.add(avatar);
        }
        let size = Self::size_for(avatars.len());
        Self {
            name: name.to_string(),
            size,
            world: World::new(size),
            bonus_manager: BonusManager::new(size, config.enabled(), config.bonus_rate()),
            bonus_stack: BonusStack::new(),
            applied: HashMap::new(),
            deaths: Vec::new(),
            round_winner: None,
            game_winner: None,
            started: false,
            in_round: false,
            borderless: false,
            rendered: None,
            max_score: config.max_score(players.len()),
            death_in_frame: false,
            events: Vec::new(),
            after: Vec::new(),
            clients: SocketGroup::new(),
            timers: GameTimers::default(),
            avatars,
        }
    }

    /// Map side length grows sublinearly with the player count.
    pub fn size_for(players: usize) -> f64 {
        let square = crate::PER_PLAYER_SIZE * crate::PER_PLAYER_SIZE;
        (square + players.saturating_sub(1) as f64 * square / 5.0).sqrt().round()
    }

    pub fn alive_count(&self) -> usize {
        self.avatars.iter().filter(|avatar| avatar.alive).count()
    }

    pub fn present_count(&self) -> usize {
        self.avatars.iter().filter(|avatar| avatar.present).count()
    }

    pub fn alive_ids(&self) -> Vec<u64> {
        self.avatars
            .iter()
            .filter(|avatar| avatar.alive)
            .map(|avatar| avatar.id)
            .collect()
    }

    pub fn loading_ids(&self) -> Vec<u64> {
        self.avatars
            .iter()
            .filter(|avatar| avatar.present && !avatar.ready)
            .map(|avatar| avatar.id)
            .collect()
    }

    pub fn is_ready(&self) -> bool {
        self.loading_ids().is_empty()
    }
}

// tick
impl Game {
    /// One fixed-step frame. The death credit is snapshotted up front so
    /// every avatar dying in this frame receives the same score.
    pub fn update(&mut self, step: f64) {
        let score = self.deaths.len() as u64;
        self.death_in_frame = false;
        for id in self.avatars.ids() {
            let Some(avatar) = self.avatars.get_mut(id) else { continue };
            if !avatar.alive {
                continue;
            }
            avatar.update(step);
            let (x, y, radius) = (avatar.x, avatar.y, avatar.radius());
            let invincible = avatar.invincible();
            let probe = avatar.probe();
            let margin = if self.borderless { 0.0 } else { radius };
            if let Some((wall_x, wall_y)) = self.world.bound_intersect(x, y, margin) {
                if self.borderless {
                    let (x, y) = self.world.opposite(wall_x, wall_y);
                    if let Some(avatar) = self.avatars.get_mut(id) {
                        avatar.set_position(x, y);
                    }
                } else {
                    self.kill(id, None, score);
                }
            } else if !invincible {
                if let Some(killer) = self.world.get_body(&probe).cloned() {
                    self.kill(id, Some(killer), score);
                }
            }
            if self.avatars.get(id).map(|avatar| avatar.alive).unwrap_or(false) {
                if let Some(avatar) = self.avatars.get_mut(id) {
                    avatar.print_test();
                }
                self.catch(id);
            }
            self.drain();
        }
        if self.death_in_frame {
            self.check_round_end();
        }
    }

    pub fn kill(&mut self, id: u64, killer: Option<Body>, score: u64) {
        if let Some(avatar) = self.avatars.get_mut(id) {
            avatar.die(killer.as_ref());
            avatar.add_score(score);
        }
        if !self.deaths.contains(&id) {
            self.deaths.push(id);
        }
        self.death_in_frame = true;
    }

    /// Move pending avatar events into the game buffer, publishing new
    /// trail points into the collision world on the way. Bodies must be
    /// live before the next avatar's collision query runs.
    pub fn drain(&mut self) {
        for id in self.avatars.ids() {
            let events = match self.avatars.get_mut(id) {
                Some(avatar) if !avatar.events.is_empty() => std::mem::take(&mut avatar.events),
                _ => continue,
            };
            for event in events {
                if let GameEvent::Point { avatar, x, y, .. } = event {
                    if self.started && self.world.active {
                        if let Some(owner) = self.avatars.get_mut(avatar) {
                            let num = owner.next_body();
                            let radius = owner.radius();
                            self.world.add_body(Body::trail(avatar, x, y, radius, num));
                        }
                    }
                }
                self.events.push(event);
            }
        }
    }
}

// bonuses
impl Game {
    /// Pick-up test for one avatar's head.
    fn catch(&mut self, id: u64) {
        let Some(probe) = self.avatars.get(id).map(|avatar| avatar.probe()) else {
            return;
        };
        if let Some(bonus) = self.bonus_manager.catch(&probe) {
            self.events.push(GameEvent::BonusClear { bonus: bonus.id });
            self.apply(bonus, id);
        }
    }

    /// Resolve the target set from the bonus affect and apply the effect.
    /// Timed effects are registered for expiry; a picker that died in the
    /// same frame yields no target for a self bonus.
    pub fn apply(&mut self, bonus: Bonus, picker: u64) {
        let alive = self.alive_ids();
        let target = match bonus.kind.affect() {
            Affect::Own => match alive.contains(&picker) {
                true => BonusTarget::Avatars(vec![picker]),
                false => BonusTarget::Nobody,
            },
            Affect::Enemy => {
                BonusTarget::Avatars(alive.into_iter().filter(|&id| id != picker).collect())
            }
            Affect::All => BonusTarget::Avatars(alive),
            Affect::Game => BonusTarget::Game,
        };
        let duration = bonus.kind.duration();
        match &target {
            BonusTarget::Avatars(ids) => {
                for &id in ids.iter() {
                    if let Some(avatar) = self.avatars.get_mut(id) {
                        avatar.stack_add(bonus.clone());
                    }
                }
            }
            BonusTarget::Game => match bonus.kind {
                BonusKind::GameClear => self.clear_trails(),
                _ => {
                    self.bonus_stack.add(bonus.clone());
                    self.resolve_game_stack(None);
                }
            },
            BonusTarget::Nobody => {}
        }
        if duration > 0 {
            self.applied.insert(bonus.id, AppliedBonus { target, timer: None });
            self.after.push(Directive::BonusOff { bonus: bonus.id, after: duration });
        }
        self.drain();
    }

    /// Expire an applied bonus: remove it from every stack it landed on.
    /// A second call, or a call after a round reset, is a no-op.
    pub fn bonus_off(&mut self, id: u64) {
        let Some(applied) = self.applied.remove(&id) else { return };
        if let Some(timer) = applied.timer {
            timer.abort();
        }
        match applied.target {
            BonusTarget::Avatars(ids) => {
                for avatar in ids {
                    if let Some(avatar) = self.avatars.get_mut(avatar) {
                        avatar.stack_remove(id);
                    }
                }
            }
            BonusTarget::Game => {
                if let Some(bonus) = self.bonus_stack.remove(id) {
                    self.resolve_game_stack(Some(&bonus));
                }
            }
            BonusTarget::Nobody => {}
        }
        self.drain();
    }

    /// Spawn step driven by the manager's cadence task.
    pub fn pop_bonus(&mut self) {
        let alive = self.alive_count();
        let present = self.present_count();
        let Game { world, bonus_manager, events, .. } = self;
        if let Some(bonus) = bonus_manager.pop(world, alive, present) {
            events.push(GameEvent::BonusPop {
                bonus: bonus.id,
                x: bonus.x,
                y: bonus.y,
                kind: bonus.kind.name(),
            });
        }
    }

    fn resolve_game_stack(&mut self, removed: Option<&Bonus>) {
        let aggregate = self.bonus_stack.aggregate(removed, "");
        if let Some(count) = aggregate.borderless {
            self.set_borderless(count != 0);
        }
    }

    pub fn set_borderless(&mut self, borderless: bool) {
        if self.borderless != borderless {
            self.borderless = borderless;
            self.events.push(GameEvent::Borderless(borderless));
        }
    }

    /// Wipe every trail body from the field, leaving the world live.
    pub fn clear_trails(&mut self) {
        self.world.clear();
        self.world.activate();
        self.events.push(GameEvent::Clear);
    }

    fn clear_applied(&mut self) {
        for (_, applied) in self.applied.drain() {
            if let Some(timer) = applied.timer {
                timer.abort();
            }
        }
    }
}

// round state machine
impl Game {
    pub fn new_round(&mut self) {
        self.started = true;
        if !self.in_round {
            self.in_round = true;
            self.on_round_new();
            self.after.push(Directive::Start(crate::WARMUP_TIME));
        }
    }

    fn on_round_new(&mut self) {
        self.events.push(GameEvent::RoundNew);
        self.borderless = false;
        self.bonus_manager.clear();
        self.clear_applied();
        self.round_winner = None;
        self.world.clear();
        self.deaths.clear();
        self.bonus_stack.clear();
        for id in self.avatars.ids() {
            match self.avatars.get_mut(id) {
                Some(avatar) if avatar.present => avatar.clear(),
                _ => {}
            }
        }
        for id in self.avatars.ids() {
            let Some(present) = self.avatars.get(id).map(|avatar| avatar.present) else {
                continue;
            };
            if present {
                let radius = self
                    .avatars
                    .get(id)
                    .map(|avatar| avatar.radius())
                    .unwrap_or(crate::RADIUS_DEFAULT);
                let (x, y) = self.world.random_position(radius, crate::SPAWN_MARGIN);
                let angle = self.world.random_direction(x, y, crate::SPAWN_ANGLE_MARGIN);
                if let Some(avatar) = self.avatars.get_mut(id) {
                    avatar.set_position(x, y);
                    avatar.set_angle(angle);
                }
            } else {
                self.deaths.push(id);
            }
        }
        self.drain();
    }

    /// Warmup is over; the controller spawns the tick and spawn loops
    /// right after this returns.
    pub fn on_start(&mut self) {
        self.events.push(GameEvent::Start);
        self.after.push(Directive::Prints(crate::PRINT_START_DELAY));
        self.world.activate();
        self.rendered = Some(crate::clock());
        self.bonus_manager.start();
    }

    pub fn start_prints(&mut self) {
        for avatar in self.avatars.iter_mut() {
            avatar.print_start();
        }
        self.drain();
    }

    pub fn check_round_end(&mut self) {
        if self.in_round && self.alive_count() <= 1 {
            self.end_round();
        }
    }

    pub fn end_round(&mut self) {
        if self.in_round {
            self.in_round = false;
            self.resolve_scores();
            self.drain();
            self.events.push(GameEvent::RoundEnd { winner: self.round_winner });
            self.after.push(Directive::Stop(crate::WARMDOWN_TIME));
        }
    }

    /// A lone survivor takes the round; everyone commits their round
    /// score into the total.
    fn resolve_scores(&mut self) {
        let winner = match self.avatars.len() {
            1 => self.avatars.first().map(|avatar| avatar.id),
            _ => self.avatars.iter().find(|avatar| avatar.alive).map(|avatar| avatar.id),
        };
        if let Some(id) = winner {
            let award = (self.avatars.len() as u64).saturating_sub(1).max(1);
            if let Some(avatar) = self.avatars.get_mut(id) {
                avatar.add_score(award);
            }
            self.round_winner = Some(id);
        }
        for avatar in self.avatars.iter_mut() {
            avatar.resolve_score();
        }
    }

    /// Warmdown is over. Stop the loop, settle the map size, and either
    /// finish the game or queue the next round.
    pub fn stop(&mut self) {
        if let Some(tick) = self.timers.tick.take() {
            tick.abort();
        }
        self.events.push(GameEvent::Stop);
        self.rendered = None;
        self.bonus_manager.stop();
        let size = Self::size_for(self.present_count());
        if self.size != size {
            self.set_size(size);
        }
        match self.winner() {
            Won::Not => self.new_round(),
            Won::Decided => {
                self.end();
            }
            Won::Champion(id) => {
                self.game_winner = Some(id);
                self.end();
            }
        }
    }

    /// Win test: the game ends when nobody is left, when a multi-player
    /// game is down to one present avatar, or when someone clears the max
    /// score without being tied at the top.
    pub fn winner(&self) -> Won {
        let present = self.present_count();
        if present == 0 {
            return Won::Decided;
        }
        if self.avatars.len() > 1 && present <= 1 {
            return Won::Decided;
        }
        let mut leaders = self
            .avatars
            .iter()
            .filter(|avatar| avatar.present && avatar.score >= self.max_score)
            .collect::<Vec<_>>();
        leaders.sort_by_key(|avatar| std::cmp::Reverse(avatar.score));
        match leaders.as_slice() {
            [] => Won::Not,
            [champion] => Won::Champion(champion.id),
            [first, second, ..] if first.score == second.score => Won::Not,
            [first, ..] => Won::Champion(first.id),
        }
    }

    pub fn end(&mut self) -> bool {
        if !self.started {
            return false;
        }
        self.started = false;
        self.events.push(GameEvent::End);
        self.after.push(Directive::End);
        self.avatars.clear();
        self.world.clear();
        true
    }

    /// Kill and discard a leaver's avatar mid-game.
    pub fn remove_avatar(&mut self, id: u64) {
        if let Some(avatar) = self.avatars.get_mut(id) {
            avatar.die(None);
            avatar.destroy();
        }
        self.drain();
        self.events.push(GameEvent::PlayerLeave { player: id });
        self.check_round_end();
    }

    /// The world regenerates whenever the game size changes.
    pub fn set_size(&mut self, size: f64) {
        self.size = size;
        self.world = World::new(size);
        self.bonus_manager.set_size(size);
    }

    /// Abort every outstanding task owned by this game.
    pub fn teardown(&mut self) {
        let handles = [
            self.timers.tick.take(),
            self.timers.warm.take(),
            self.timers.prints.take(),
            self.timers.waiting.take(),
            self.bonus_manager.popper.take(),
        ];
        for handle in handles.into_iter().flatten() {
            handle.abort();
        }
        self.clear_applied();
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod game_tests {
    use super::*;

    fn roster(names: &[&str]) -> Collection<Player> {
        let mut players = Collection::new();
        for name in names {
            players.add(Player::new(1, name, None));
        }
        players
    }

    fn game(names: &[&str]) -> Game {
        Game::new("arena", &roster(names), &RoomConfig::new())
    }

    #[test]
    fn size_grows_sublinearly() {
        assert_eq!(Game::size_for(1), 80.0);
        assert_eq!(Game::size_for(2), 88.0);
        assert_eq!(Game::size_for(6), 113.0);
    }

    #[test]
    fn max_score_defaults_from_player_count() {
        assert_eq!(game(&["a"]).max_score, 1);
        assert_eq!(game(&["a", "b"]).max_score, 10);
        assert_eq!(game(&["a", "b", "c"]).max_score, 20);
    }

    #[test]
    fn joint_death_credits_the_pre_tick_count() {
        let mut game = game(&["left", "right"]);
        game.started = true;
        game.in_round = true;
        game.world.activate();
        let ids = game.avatars.ids();
        let (a, b) = (ids[0], ids[1]);
        game.avatars.get_mut(a).map(|avatar| avatar.set_position(10.0, 50.0));
        game.avatars.get_mut(b).map(|avatar| avatar.set_position(20.0, 50.0));
        // each avatar sits on a trail segment of the other
        game.world.add_body(Body::trail(b, 10.0, 50.0, 0.6, 0));
        game.world.add_body(Body::trail(a, 20.0, 50.0, 0.6, 0));
        game.update(16.0);
        assert!(game.avatars.iter().all(|avatar| !avatar.alive));
        assert!(game.avatars.iter().all(|avatar| avatar.score == 0));
        assert!(game.round_winner.is_none());
        assert!(!game.in_round);
        assert!(matches!(game.after.last(), Some(Directive::Stop(_))));
    }

    #[test]
    fn second_tick_death_credits_one() {
        let mut game = game(&["left", "right", "third"]);
        game.started = true;
        game.in_round = true;
        game.world.activate();
        let ids = game.avatars.ids();
        game.avatars.get_mut(ids[0]).map(|avatar| avatar.set_position(10.0, 50.0));
        game.avatars.get_mut(ids[1]).map(|avatar| avatar.set_position(20.0, 50.0));
        game.avatars.get_mut(ids[2]).map(|avatar| avatar.set_position(30.0, 50.0));
        game.world.add_body(Body::trail(ids[1], 10.0, 50.0, 0.6, 0));
        game.update(16.0);
        assert_eq!(game.deaths.len(), 1);
        game.world.add_body(Body::trail(ids[0], 20.0, 50.0, 0.6, 10));
        game.update(16.0);
        // the second round of deaths ends the round, committing the credit
        let second = game.avatars.get(ids[1]).expect("still registered");
        assert_eq!(second.score, 1);
        let first = game.avatars.get(ids[0]).expect("still registered");
        assert_eq!(first.score, 0);
    }

    #[test]
    fn solo_round_awards_the_lone_player() {
        let mut game = game(&["alice"]);
        game.started = true;
        game.in_round = true;
        game.end_round();
        let alice = game.avatars.first().expect("registered");
        assert_eq!(alice.score, 1);
        assert_eq!(game.round_winner, Some(alice.id));
        let id = alice.id;
        game.stop();
        assert_eq!(game.game_winner, Some(id));
        assert!(!game.started);
        assert!(matches!(game.after.last(), Some(Directive::End)));
    }

    #[test]
    fn tied_leaders_do_not_win() {
        let mut game = game(&["a", "b"]);
        game.started = true;
        for avatar in game.avatars.iter_mut() {
            avatar.set_score(game.max_score);
        }
        assert_eq!(game.winner(), Won::Not);
        let leader = game.avatars.ids()[0];
        game.avatars.get_mut(leader).map(|avatar| avatar.set_score(game.max_score + 1));
        assert_eq!(game.winner(), Won::Champion(leader));
    }

    #[test]
    fn deserted_game_is_decided() {
        let mut game = game(&["a", "b"]);
        game.started = true;
        for avatar in game.avatars.iter_mut() {
            avatar.destroy();
        }
        assert_eq!(game.winner(), Won::Decided);
    }

    #[test]
    fn borderless_wraps_instead_of_killing() {
        let mut game = game(&["runner"]);
        game.started = true;
        game.in_round = true;
        game.world.activate();
        game.borderless = true;
        let id = game.avatars.ids()[0];
        let size = game.size;
        if let Some(avatar) = game.avatars.get_mut(id) {
            avatar.set_position(size - 0.2, 50.0);
            avatar.set_angle(1.0);
            avatar.set_angle(0.0);
        }
        for _ in 0..10 {
            game.update(16.0);
        }
        let avatar = game.avatars.get(id).expect("registered");
        assert!(avatar.alive);
        assert!(avatar.x < 10.0);
        assert_eq!(avatar.y, 50.0);
    }

    #[test]
    fn wall_kills_when_bordered() {
        let mut game = game(&["runner"]);
        game.started = true;
        game.in_round = true;
        game.world.activate();
        let id = game.avatars.ids()[0];
        let size = game.size;
        if let Some(avatar) = game.avatars.get_mut(id) {
            avatar.set_position(size - 0.5, 50.0);
            avatar.set_angle(1.0);
            avatar.set_angle(0.0);
        }
        game.update(16.0);
        assert!(!game.avatars.get(id).expect("registered").alive);
    }

    #[test]
    fn invincible_avatars_pass_through_trails() {
        let mut game = game(&["ghost", "other"]);
        game.started = true;
        game.in_round = true;
        game.world.activate();
        let ids = game.avatars.ids();
        game.avatars.get_mut(ids[0]).map(|avatar| {
            avatar.set_position(40.0, 40.0);
            avatar.set_invincible(true);
        });
        game.avatars.get_mut(ids[1]).map(|avatar| avatar.set_position(60.0, 60.0));
        game.world.add_body(Body::trail(ids[1], 40.0, 40.0, 0.6, 0));
        game.update(16.0);
        assert!(game.avatars.get(ids[0]).expect("registered").alive);
    }

    #[test]
    fn timed_bonus_applies_and_expires() {
        let mut game = game(&["picker", "victim"]);
        let ids = game.avatars.ids();
        let mut bonus = Bonus::new(BonusKind::SelfFast, 0.0, 0.0);
        bonus.id = 99;
        game.apply(bonus, ids[0]);
        assert_eq!(game.avatars.get(ids[0]).expect("registered").velocity(), 24.0);
        assert!(matches!(
            game.after.last(),
            Some(Directive::BonusOff { bonus: 99, after: 4_000 })
        ));
        game.bonus_off(99);
        assert_eq!(
            game.avatars.get(ids[0]).expect("registered").velocity(),
            crate::VELOCITY_DEFAULT
        );
        game.bonus_off(99);
    }

    #[test]
    fn enemy_bonus_spares_the_picker() {
        let mut game = game(&["picker", "victim"]);
        let ids = game.avatars.ids();
        let mut bonus = Bonus::new(BonusKind::EnemySlow, 0.0, 0.0);
        bonus.id = 5;
        game.apply(bonus, ids[0]);
        assert_eq!(
            game.avatars.get(ids[0]).expect("registered").velocity(),
            crate::VELOCITY_DEFAULT
        );
        // 16 - 12 clamps up to the half-speed floor
        assert_eq!(
            game.avatars.get(ids[1]).expect("registered").velocity(),
            crate::VELOCITY_DEFAULT / 2.0
        );
    }

    #[test]
    fn clear_bonus_wipes_the_field() {
        let mut game = game(&["a", "b"]);
        game.started = true;
        game.in_round = true;
        game.world.activate();
        game.world.add_body(Body::trail(1, 40.0, 40.0, 0.6, 0));
        let mut bonus = Bonus::new(BonusKind::GameClear, 0.0, 0.0);
        bonus.id = 3;
        let picker = game.avatars.ids()[0];
        game.apply(bonus, picker);
        assert!(game.world.active);
        assert!(game.world.body(1).is_none());
        assert!(game.events.iter().any(|event| matches!(event, GameEvent::Clear)));
    }

    #[test]
    fn borderless_bonus_toggles_the_game_flag() {
        let mut game = game(&["a", "b"]);
        let picker = game.avatars.ids()[0];
        let mut bonus = Bonus::new(BonusKind::GameBorderless, 0.0, 0.0);
        bonus.id = 8;
        game.apply(bonus, picker);
        assert!(game.borderless);
        game.bonus_off(8);
        assert!(!game.borderless);
    }

    #[test]
    fn leaver_is_killed_and_round_checked() {
        let mut game = game(&["stay", "leave"]);
        game.started = true;
        game.in_round = true;
        let leaver = game.avatars.ids()[1];
        game.remove_avatar(leaver);
        let gone = game.avatars.get(leaver).expect("still registered");
        assert!(!gone.present);
        assert!(!gone.alive);
        assert!(!game.in_round);
    }

    #[test]
    fn round_reset_places_only_present_avatars() {
        let mut game = game(&["stay", "gone"]);
        let leaver = game.avatars.ids()[1];
        game.avatars.get_mut(leaver).map(|avatar| avatar.destroy());
        game.new_round();
        assert!(game.started);
        assert!(game.in_round);
        assert!(game.deaths.contains(&leaver));
        let stayer = game.avatars.first().expect("registered");
        assert!(stayer.alive);
        assert!(matches!(game.after.last(), Some(Directive::Start(_))));
    }
}
