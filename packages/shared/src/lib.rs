//! Shared utilities for the Tsudoi chat backend.

pub mod logger;
pub mod time;
