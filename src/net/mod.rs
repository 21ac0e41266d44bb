//! Networking: the external transport contract, the packet dispatcher, and
//! the (in-scope) security-solver client.

pub mod connection;
pub mod dispatch;
pub mod packet;
pub mod security;

pub use connection::{ArenaSettings, Connection, Settings, ShipSettings, SpawnSettings};
pub use dispatch::PacketDispatcher;
pub use security::SecuritySolver;
