//! Ship pathfinding: a precomputed node grid plus A* search (§4.8).

pub mod astar;
pub mod node;

pub use astar::{AlwaysConnected, Path, Pathfinder, RegionRegistry};
pub use node::{NodeGrid, WeightConfig, WeightType};
