mod lobby;
mod names;
mod server;

pub use lobby::*;
pub use names::*;
pub use server::*;
