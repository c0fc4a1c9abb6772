//! Domain services holding the process-wide realtime state.
//!
//! Each service is an owned object created per server instance and shared
//! through `Arc`, so every test can start from a fresh state.

pub mod membership_index;
pub mod presence_registry;
pub mod room_router;

pub use membership_index::MembershipIndex;
pub use presence_registry::PresenceRegistry;
pub use room_router::RoomRouter;
