pub mod bonus;
pub mod collection;
pub mod control;
pub mod game;
pub mod hosting;
pub mod room;
pub mod session;
pub mod world;

// avatar defaults
const VELOCITY_DEFAULT: f64 = 16.0;
const ANGULAR_VELOCITY_BASE: f64 = 2.8 / 1000.0;
const RADIUS_DEFAULT: f64 = 0.6;
const TRAIL_LATENCY: u64 = 3;
const OLD_BODY_AGE: f64 = 2000.0;

// world parameters
const ISLAND_GRID_SIZE: f64 = 40.0;
const PER_PLAYER_SIZE: f64 = 80.0;
const SPAWN_MARGIN: f64 = 0.05;
const SPAWN_ANGLE_MARGIN: f64 = 0.3;

// round pacing (ms)
const FRAMERATE: f64 = 1000.0 / 60.0;
const WARMUP_TIME: u64 = 3_000;
const WARMDOWN_TIME: u64 = 5_000;
const PRINT_START_DELAY: u64 = 3_000;

// bonus manager parameters
const BONUS_CAP: usize = 20;
const BONUS_POPING_TIME: f64 = 3_000.0;
const BONUS_POPING_MARGIN: f64 = 0.01;
const BONUS_RADIUS: f64 = 3.0;

// room and session pacing (ms)
const LAUNCH_TIME: u64 = 5_000;
const TIME_TO_CLOSE: u64 = 10_000;
const WAITING_TIME: u64 = 30_000;
const PING_INTERVAL: u64 = 1_000;
const FLUSH_INTERVAL: u64 = 1;

// input limits
const MIN_PLAYER: usize = 1;
const NAME_MAX_LENGTH: usize = 25;
const TALK_MAX_LENGTH: usize = 140;
const CHAT_TAIL: usize = 100;
const PASSWORD_LENGTH: usize = 4;

/// trait for random generation, mainly (strictly?) for testing
pub trait Arbitrary {
    fn random() -> Self;
}

/// wall clock in fractional milliseconds
pub(crate) fn clock() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs_f64()
        * 1000.0
}

pub(crate) fn distance(from_x: f64, from_y: f64, to_x: f64, to_y: f64) -> f64 {
    ((from_x - to_x).powi(2) + (from_y - to_y).powi(2)).sqrt()
}

/// initialize logging and exit on ctrl-c
pub fn init() {
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.expect("watch for ctrl-c");
        println!();
        log::warn!("forcing exit");
        std::process::exit(0);
    });
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time moves slow")
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time)).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}
