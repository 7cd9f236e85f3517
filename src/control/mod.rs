mod dispatch;
mod game;
mod room;

pub use dispatch::*;
