//! Tsudoi: real-time messaging and presence backend.
//!
//! Users connect over WebSocket, exchange direct and group messages with
//! read receipts, see each other's presence and receive notifications.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
