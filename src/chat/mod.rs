//! Chat: incoming ring buffer + MRU private-sender list, and an outgoing
//! flood-limited send queue (§4.7).

pub mod controller;
pub mod queue;

pub use controller::ChatController;
pub use queue::{ChatEntry, ChatTarget, ChatType};
