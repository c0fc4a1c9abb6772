//! UI layer: WebSocket and HTTP entry points.

mod handler;
mod server;
pub mod session;
mod signal;
pub mod state;

pub use server::Server;
pub use state::AppState;
