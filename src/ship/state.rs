//! Per-player ship runtime: cooldowns, timed effects, and the prize RNG
//! seed, kept separately from [`crate::player::state::Player`] the same way
//! `weapon::manager` keeps live weapon instances out of `Player` itself.

use crate::core::Tick;
use crate::core::Vec2;

/// Local input state for one player's ship, sampled once per tick by the
/// host application (key/button edges, not wire data).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShipInput {
    /// -1 = reverse, 0 = none, 1 = forward.
    pub thrust: i8,
    /// -1 = counter-clockwise, 0 = none, 1 = clockwise.
    pub rotate: i8,
    pub afterburner: bool,
    pub fire_bullet: bool,
    pub fire_bomb: bool,
    pub fire_burst: bool,
    pub fire_thor: bool,
    pub fire_decoy: bool,
    pub fire_brick: bool,
    pub fire_repel: bool,
    pub fire_rocket: bool,
    /// Key-down edge, not held state: portal is placed on press, warped to
    /// on the next press.
    pub portal_pressed: bool,
    pub warp_pressed: bool,
}

/// Runtime state the ship controller owns per player; created lazily on
/// first tick and cleared on leave.
#[derive(Clone, Debug)]
pub struct ShipRuntime {
    pub rocket_ticks_remaining: u32,
    pub next_bomb_tick: Tick,
    pub next_bullet_tick: Tick,
    pub next_repel_tick: Tick,
    pub portal_position: Option<Vec2>,
    pub on_safety: bool,
    pub emp_ticks_remaining: u32,
    pub prize_seed: i32,
}

impl Default for ShipRuntime {
    fn default() -> Self {
        ShipRuntime {
            rocket_ticks_remaining: 0,
            next_bomb_tick: Tick(0),
            next_bullet_tick: Tick(0),
            next_repel_tick: Tick(0),
            portal_position: None,
            on_safety: false,
            emp_ticks_remaining: 0,
            prize_seed: 0,
        }
    }
}
