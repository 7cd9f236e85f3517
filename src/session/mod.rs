mod client;
mod group;
mod protocol;

pub use client::*;
pub use group::*;
pub use protocol::*;
