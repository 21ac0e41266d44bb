//! Weapon lifecycle: bit-packed wire data, damage formulas, and the
//! manager that fires and simulates live weapon instances.

pub mod damage;
pub mod manager;
pub mod types;

pub use manager::WeaponManager;
pub use types::{Weapon, WeaponData, WeaponFlags, WeaponType, INVALID_LINK, INVALID_PROX_PLAYER};
