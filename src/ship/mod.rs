//! Ship control: thrust/rotation/energy/firing order and prize economy
//! (§4.6).

pub mod controller;
pub mod prize;
pub mod state;

pub use controller::{reset_ship, ShipController};
pub use prize::{apply_prize, generate_prize, Prize, PRIZE_COUNT};
pub use state::{ShipInput, ShipRuntime};
