//! Core deterministic primitives.
//!
//! Tick clocks, the PRNG, and 2D vector math used throughout the rest of the
//! crate.

pub mod rng;
pub mod tick;
pub mod vec2;

pub use rng::VieRng;
pub use tick::{MicroTick, SmallTick, Tick};
pub use vec2::Vec2;
