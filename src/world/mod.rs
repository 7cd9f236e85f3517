mod body;
mod island;
mod world;

pub use body::*;
pub use island::*;
pub use world::*;
