//! Weapon type tag and the bit-packed `WeaponData` carried in position
//! packets and fire requests.
//!
//! Grounded on the `weapon` field of `LargePositionPacket`/
//! `SmallPositionPacket` (`net::packet`) and `WeaponManager::FireWeapons`/
//! `GenerateWeapon`.

use serde::{Deserialize, Serialize};

use crate::core::{MicroTick, Tick, Vec2};

/// What a weapon instance is. Mines are [`WeaponType::Bomb`] or
/// [`WeaponType::ProximityBomb`] with `data.alternate` set, not a distinct
/// type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponType {
    Bullet,
    BouncingBullet,
    Bomb,
    ProximityBomb,
    Thor,
    Repel,
    Burst,
    Decoy,
}

impl WeaponType {
    fn from_bits(bits: u16) -> Option<WeaponType> {
        Some(match bits {
            0 => return None,
            1 => WeaponType::Bullet,
            2 => WeaponType::BouncingBullet,
            3 => WeaponType::Bomb,
            4 => WeaponType::ProximityBomb,
            5 => WeaponType::Repel,
            6 => WeaponType::Decoy,
            7 => WeaponType::Burst,
            8 => WeaponType::Thor,
            _ => return None,
        })
    }

    fn to_bits(self) -> u16 {
        match self {
            WeaponType::Bullet => 1,
            WeaponType::BouncingBullet => 2,
            WeaponType::Bomb => 3,
            WeaponType::ProximityBomb => 4,
            WeaponType::Repel => 5,
            WeaponType::Decoy => 6,
            WeaponType::Burst => 7,
            WeaponType::Thor => 8,
        }
    }

    pub fn is_bomb(self) -> bool {
        matches!(self, WeaponType::Bomb | WeaponType::ProximityBomb | WeaponType::Thor)
    }

    pub fn is_prox(self) -> bool {
        matches!(self, WeaponType::ProximityBomb | WeaponType::Thor)
    }

    pub fn is_bullet(self) -> bool {
        matches!(self, WeaponType::Bullet | WeaponType::BouncingBullet)
    }
}

/// The bit-packed weapon descriptor carried as a raw `u16` in position
/// packets: type (5 bits), level (2 bits), shrap count (5 bits), alternate
/// flag (1 bit), shrap level (2 bits), shrap-bouncing flag (1 bit).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WeaponData {
    pub kind_bits: u16,
    pub level: u8,
    pub shrap: u8,
    pub alternate: bool,
    pub shrap_level: u8,
    pub shrap_bouncing: bool,
}

impl WeaponData {
    pub fn from_bits(bits: u16) -> WeaponData {
        WeaponData {
            kind_bits: bits & 0x1F,
            level: ((bits >> 5) & 0x3) as u8,
            shrap: ((bits >> 7) & 0x1F) as u8,
            alternate: (bits >> 12) & 0x1 != 0,
            shrap_level: ((bits >> 13) & 0x3) as u8,
            shrap_bouncing: (bits >> 15) & 0x1 != 0,
        }
    }

    pub fn to_bits(self) -> u16 {
        (self.kind_bits & 0x1F)
            | ((self.level as u16 & 0x3) << 5)
            | ((self.shrap as u16 & 0x1F) << 7)
            | ((self.alternate as u16) << 12)
            | ((self.shrap_level as u16 & 0x3) << 13)
            | ((self.shrap_bouncing as u16) << 15)
    }

    pub fn weapon_type(&self) -> Option<WeaponType> {
        WeaponType::from_bits(self.kind_bits)
    }

    pub fn is_empty(&self) -> bool {
        self.kind_bits == 0
    }
}

/// Flags recorded on a live [`Weapon`] instance (not wire-carried).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WeaponFlags(u8);

impl WeaponFlags {
    pub const EMP: WeaponFlags = WeaponFlags(1 << 0);
    pub const BURST_ACTIVE: WeaponFlags = WeaponFlags(1 << 1);

    pub const fn empty() -> Self {
        WeaponFlags(0)
    }

    pub fn contains(self, other: WeaponFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: WeaponFlags) {
        self.0 |= other.0;
    }
}

/// Sentinel: this weapon isn't part of a multi-barrel/multi-fire group.
pub const INVALID_LINK: u32 = 0xFFFFFFFF;
/// Sentinel: no player is currently latched by this weapon's proximity sensor.
pub const INVALID_PROX_PLAYER: u16 = 0xFFFF;

/// One live weapon instance in flight.
#[derive(Clone, Copy, Debug)]
pub struct Weapon {
    pub player_id: crate::player::PlayerId,
    pub frequency: u16,
    pub data: WeaponData,
    pub position: Vec2,
    pub velocity: Vec2,
    pub last_tick: Tick,
    pub end_tick: Tick,
    pub bounces_remaining: u32,
    pub flags: WeaponFlags,
    pub link_id: u32,
    pub last_event_position: Vec2,
    pub last_event_time: MicroTick,
    pub rng_seed: u32,
    pub prox_hit_player_id: u16,
    pub prox_highest_offset: f32,
    pub sensor_end_tick: Tick,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weapon_data_round_trips_through_bits() {
        let data = WeaponData {
            kind_bits: 3,
            level: 2,
            shrap: 17,
            alternate: true,
            shrap_level: 1,
            shrap_bouncing: true,
        };
        assert_eq!(WeaponData::from_bits(data.to_bits()), data);
    }

    #[test]
    fn zero_bits_is_no_weapon() {
        assert!(WeaponData::from_bits(0).is_empty());
        assert_eq!(WeaponData::from_bits(0).weapon_type(), None);
    }

    #[test]
    fn bomb_and_prox_classification() {
        assert!(WeaponType::Bomb.is_bomb());
        assert!(!WeaponType::Bomb.is_prox());
        assert!(WeaponType::ProximityBomb.is_prox());
        assert!(WeaponType::Thor.is_prox());
        assert!(WeaponType::Bullet.is_bullet());
    }
}
