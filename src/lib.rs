//! # Nullpoint Core
//!
//! Deterministic simulation core for a headless bot client in the
//! Subspace/Continuum lineage of 2D top-down space-combat games.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      NULLPOINT CORE                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── tick.rs     - Tick / SmallTick / MicroTick clocks        │
//! │  ├── vec2.rs     - 2D vector (f32)                            │
//! │  └── rng.rs      - Explicit-seed PRNG                         │
//! │                                                              │
//! │  net/            - Wire protocol & external collaborator     │
//! │  ├── connection.rs - Connection trait, ArenaSettings          │
//! │  ├── dispatch.rs   - Packet type -> handler registry          │
//! │  ├── packet.rs     - Reader/writer, incoming packet parsing   │
//! │  └── security.rs   - Thread-pooled security-solver client     │
//! │                                                              │
//! │  map/            - Tile map, doors, region bitsets            │
//! │  path/           - A* pathfinder over the tile map            │
//! │  player/         - Roster, attach graph, position sim, spawn  │
//! │  weapon/         - Weapon lifecycle, simulation, damage        │
//! │  ship/           - Ship state, controller, prize economy       │
//! │  chat/           - Incoming ring buffer, outgoing flood queue  │
//! │                                                              │
//! │  soccer.rs       - Powerball simulation                       │
//! │  flag.rs         - Turf flags and green prizes                │
//! │  energy.rs       - Heuristic opponent-energy tracker           │
//! │  basemap.rs      - Flagroom/base region analyzer               │
//! │  game.rs         - GameState: owns every manager, drives tick  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism guarantee
//!
//! This crate mirrors a remote server's simulation tick-for-tick: given the
//! same sequence of incoming packets and the same RNG seeds, it reaches the
//! same world state the server would. It never authoritatively adjudicates
//! anything — kills, flag captures, and prize grants are always driven by
//! server-sent events, and the formulas here exist only to predict what the
//! server will say next, not to replace it.
//!
//! Rendering, input capture, the behavior-tree AI layer, and low-level UDP
//! transport/encryption are external collaborators. This crate only depends
//! on a [`net::Connection`] trait and plain [`net::ArenaSettings`] data.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod basemap;
pub mod chat;
pub mod config;
pub mod core;
pub mod energy;
pub mod error;
pub mod events;
pub mod flag;
pub mod game;
pub mod map;
pub mod net;
pub mod path;
pub mod player;
pub mod ship;
pub mod soccer;
pub mod weapon;

pub use core::{MicroTick, SmallTick, Tick, Vec2, VieRng};
pub use error::CoreError;
pub use game::GameState;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Simulation tick rate (Hz). One tick is 1/100 s.
pub const TICK_RATE: u32 = 100;
