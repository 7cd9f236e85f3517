//! hosting Server Binary
//!
//! Runs the HTTP server for hosting live game rooms.
//! Supports WebSocket connections for real-time play.

use kurve::hosting::Server;

#[tokio::main]
async fn main() {
    kurve::init();
    Server::run().await.expect("run hosting server");
}
