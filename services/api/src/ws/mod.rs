//! WebSocket Game Sessions
//!
//! Each WebSocket connection is one single-player game session:
//!
//! - `protocol`: the JSON message format between browser and server.
//! - `session`: the connection lifecycle and the loop that drives the game controller.

pub mod protocol;
pub mod session;

pub use session::ws_handler;
