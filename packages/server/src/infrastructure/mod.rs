//! Infrastructure layer: stores, identity verification, outbound transport
//! and wire DTOs.

pub mod dto;
pub mod identity;
pub mod message_pusher;
pub mod repository;
