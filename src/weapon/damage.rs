//! Damage and EMP-shutdown formulas.
//!
//! Ported from the formulas named in `SPEC_FULL.md` §4.5: damage is computed
//! from a weapon's type/level and a handful of `Settings` percentages, then
//! (unless `exact_damage` is set) run through a single extra randomization
//! pass the same way bullet/burst damage is randomized client-side.

use crate::core::VieRng;
use crate::net::Settings;
use crate::weapon::types::WeaponType;

/// Base damage (before distance falloff, EMP/bounce modifiers, or
/// randomization) for one hit of `weapon_type` at `level`.
pub fn base_damage(settings: &Settings, weapon_type: WeaponType, level: u8, is_shrap: bool, shrap_life_remaining: i32) -> u32 {
    match weapon_type {
        WeaponType::Bullet | WeaponType::BouncingBullet => {
            let mut damage = settings.bullet_damage_level / 1000 + settings.bullet_damage_upgrade / 1000 * level as u32;
            if is_shrap {
                damage = damage * settings.shrapnel_damage_percent / 1000;
            }
            if is_shrap && shrap_life_remaining <= 25 {
                damage = damage * settings.inactive_shrap_damage / 1000;
            }
            damage
        }
        WeaponType::Bomb | WeaponType::ProximityBomb => settings.bomb_damage_level / 1000,
        WeaponType::Thor => {
            let effective_level = 3 + level as u32;
            settings.bomb_damage_level * (1 + effective_level * effective_level) / 1000
        }
        WeaponType::Burst => settings.burst_damage_level,
        WeaponType::Repel | WeaponType::Decoy => 0,
    }
}

/// Bomb/Thor explosion radius, in pixels, at `level`.
pub fn explode_radius_pixels(settings: &Settings, level: u8) -> u32 {
    settings.bomb_explode_pixels * (1 + level as u32)
}

/// Linear falloff from `full_damage` at `distance == 0` to `0` at
/// `distance >= explode_pixels`.
pub fn falloff_damage(full_damage: u32, distance_pixels: u32, explode_pixels: u32) -> u32 {
    if explode_pixels == 0 || distance_pixels >= explode_pixels {
        return 0;
    }
    full_damage * (explode_pixels - distance_pixels) / explode_pixels
}

/// Apply the EMP and "has already bounced" damage percentage modifiers.
pub fn apply_modifiers(settings: &Settings, damage: u32, is_emp: bool, has_bounced: bool) -> u32 {
    let mut damage = damage;
    if is_emp {
        damage = damage * settings.ebomb_damage_percent / 1000;
    }
    if has_bounced {
        damage = damage * settings.bbomb_damage_percent / 1000;
    }
    damage
}

/// A shooter caught in their own bomb blast takes half their computed
/// contribution, floored at zero, never negative.
pub fn shooter_self_damage(damage: u32) -> u32 {
    damage / 2
}

/// Random jitter applied to bullet/burst damage unless `exact_damage` is
/// set: `floor(sqrt(rand() * 1000 mod (damage^2 + 1)))`.
pub fn randomize(settings: &Settings, rng: &mut VieRng, damage: u32) -> u32 {
    if settings.exact_damage || damage == 0 {
        return damage;
    }
    let modulus = (damage as u64 * damage as u64 + 1) as u32;
    let draw = (rng.next() as u64 * 1000) as u32 % modulus;
    (draw as f64).sqrt() as u32
}

/// EMP energy-shutdown duration, in seconds, for a non-shooter hit by an EMP
/// weapon outside a safe zone.
pub fn emp_shutdown_seconds(settings: &Settings, damage: u32, bomb_damage: u32) -> f32 {
    if damage == 0 || bomb_damage == 0 {
        return 0.0;
    }
    (settings.ebomb_shutdown_time as f32 * damage as f32) / bomb_damage as f32 / 100.0
}

/// Minimum remaining shrapnel lifetime for a bullet/bouncing-bullet shrap
/// to still deal full (non-inactive) damage.
pub const SHRAP_INACTIVE_THRESHOLD_TICKS: i32 = 25;

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        let mut s = Settings::default();
        s.bomb_damage_level = 4000;
        s.bomb_explode_pixels = 40;
        s.ebomb_damage_percent = 500;
        s.bbomb_damage_percent = 800;
        s.ebomb_shutdown_time = 300;
        s.exact_damage = true;
        s
    }

    #[test]
    fn falloff_is_zero_at_and_beyond_explode_radius() {
        let damage = falloff_damage(1000, 40, 40);
        assert_eq!(damage, 0);
        let damage = falloff_damage(1000, 41, 40);
        assert_eq!(damage, 0);
    }

    #[test]
    fn falloff_is_full_at_zero_distance() {
        assert_eq!(falloff_damage(1000, 0, 40), 1000);
    }

    #[test]
    fn thor_damage_uses_shifted_level() {
        let settings = settings();
        let d = base_damage(&settings, WeaponType::Thor, 0, false, 0);
        // level -> 3, formula: BombDamageLevel * (1 + 9) / 1000
        assert_eq!(d, settings.bomb_damage_level * 10 / 1000);
    }

    #[test]
    fn emp_modifier_scales_down_damage() {
        let settings = settings();
        let d = apply_modifiers(&settings, 1000, true, false);
        assert_eq!(d, 500);
    }

    #[test]
    fn exact_damage_skips_randomization() {
        let settings = settings();
        let mut rng = VieRng::new(1);
        assert_eq!(randomize(&settings, &mut rng, 777), 777);
    }
}
