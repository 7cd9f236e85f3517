mod chat;
mod config;
mod player;
mod room;

pub use chat::*;
pub use config::*;
pub use player::*;
pub use room::*;
