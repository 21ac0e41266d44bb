//! Prize RNG and application (§4.6's `GeneratePrize`/prize-dispatch table).
//!
//! The 28-entry weighted prize list is the classic Subspace/Continuum
//! ordering; the spec names only the seven prizes excluded from multiprize
//! and `ResetShip` generation (`Warp`, `FullCharge`, `EngineShutdown`,
//! `Shields`, `Super`, `Multiprize`, `Brick`) and otherwise treats prizes as
//! an opaque tagged id, so the remaining ordering is an assumption recorded
//! in `DESIGN.md` rather than a literally specified table.

use crate::core::VieRng;
use crate::net::connection::Settings;
use crate::player::state::{ItemCounts, Player};

pub const PRIZE_COUNT: usize = 28;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prize {
    Recharge,
    Energy,
    Rotation,
    Stealth,
    Cloak,
    XRadar,
    Warp,
    Guns,
    Bombs,
    BouncingBullets,
    Thruster,
    TopSpeed,
    FullCharge,
    EngineShutdown,
    Multiprize,
    Proximity,
    Super,
    Shields,
    Shrapnel,
    Antiwarp,
    Repel,
    Burst,
    Decoy,
    Thor,
    Brick,
    Rocket,
    Portal,
    MultifireSpread,
}

const PRIZE_ORDER: [Prize; PRIZE_COUNT] = [
    Prize::Recharge,
    Prize::Energy,
    Prize::Rotation,
    Prize::Stealth,
    Prize::Cloak,
    Prize::XRadar,
    Prize::Warp,
    Prize::Guns,
    Prize::Bombs,
    Prize::BouncingBullets,
    Prize::Thruster,
    Prize::TopSpeed,
    Prize::FullCharge,
    Prize::EngineShutdown,
    Prize::Multiprize,
    Prize::Proximity,
    Prize::Super,
    Prize::Shields,
    Prize::Shrapnel,
    Prize::Antiwarp,
    Prize::Repel,
    Prize::Burst,
    Prize::Decoy,
    Prize::Thor,
    Prize::Brick,
    Prize::Rocket,
    Prize::Portal,
    Prize::MultifireSpread,
];

impl Prize {
    fn index(self) -> usize {
        PRIZE_ORDER.iter().position(|p| *p == self).unwrap()
    }

    /// Prizes excluded from both `Multiprize`'s inner rolls and the
    /// `ResetShip` weighted-generation pass.
    pub fn excluded_from_multiprize(self) -> bool {
        matches!(
            self,
            Prize::Warp
                | Prize::FullCharge
                | Prize::EngineShutdown
                | Prize::Shields
                | Prize::Super
                | Prize::Multiprize
                | Prize::Brick
        )
    }
}

/// Draw one signed prize id: `+n` for positive-id (1-based), `-n` for
/// negative, per §4.6's `GeneratePrize` pseudocode.
pub fn generate_prize(rng: &mut VieRng, weights: &[u32; PRIZE_COUNT], negative_factor: u32, negative_allowed: bool) -> i32 {
    let total: u32 = weights.iter().sum();
    let total = total.max(1);

    let r1 = rng.next() as u32;
    let mut accum = 0u32;
    let mut chosen = 0usize;
    for (i, w) in weights.iter().enumerate() {
        accum += w;
        if accum > r1 % total {
            chosen = i;
            break;
        }
    }

    let r2 = rng.next() as u32;
    let id = (chosen + 1) as i32;
    if negative_allowed && negative_factor > 0 && r2 % negative_factor == 0 {
        -id
    } else {
        id
    }
}

/// Apply one signed prize id to `player`. Stat prizes clamp to
/// `[Initial, Maximum]`; capability prizes are idempotent per §4.6.
pub fn apply_prize(player: &mut Player, prize_id: i32, settings: &Settings) {
    if prize_id == 0 {
        return;
    }
    let negative = prize_id < 0;
    let index = (prize_id.unsigned_abs() as usize).saturating_sub(1);
    if index >= PRIZE_COUNT {
        return;
    }
    let prize = PRIZE_ORDER[index];
    let ship = settings.ships[player.ship.min(7) as usize];

    match prize {
        Prize::Recharge | Prize::Rotation | Prize::Thruster | Prize::TopSpeed => {
            player.bounty = bump_bounty(player.bounty, !negative);
        }
        Prize::Energy => {
            player.bounty = bump_bounty(player.bounty, !negative);
            if !negative {
                player.energy = (player.energy + 1).min(ship.maximum_energy);
            }
        }
        Prize::Stealth => toggle_item(&mut player.items.shields, !negative, &mut player.bounty),
        Prize::Cloak => toggle_item(&mut player.items.super_, !negative, &mut player.bounty),
        Prize::XRadar | Prize::Antiwarp | Prize::Proximity | Prize::BouncingBullets | Prize::Shrapnel => {
            player.bounty = bump_bounty(player.bounty, !negative);
        }
        Prize::Warp => {
            player.bounty = bump_bounty(player.bounty, !negative);
        }
        Prize::Guns | Prize::Bombs => {
            player.bounty = bump_bounty(player.bounty, !negative);
        }
        Prize::FullCharge => {
            player.energy = ship.maximum_energy;
        }
        Prize::EngineShutdown => {}
        Prize::Multiprize => {
            apply_multiprize(player, settings);
        }
        Prize::Super => {
            toggle_item(&mut player.items.super_, !negative, &mut player.bounty);
        }
        Prize::Shields => {
            toggle_item(&mut player.items.shields, !negative, &mut player.bounty);
        }
        Prize::Repel => toggle_count(&mut player.items.repels, negative, &mut player.bounty),
        Prize::Burst => toggle_count(&mut player.items.bursts, negative, &mut player.bounty),
        Prize::Decoy => toggle_count(&mut player.items.decoys, negative, &mut player.bounty),
        Prize::Thor => toggle_count(&mut player.items.thors, negative, &mut player.bounty),
        Prize::Brick => toggle_count(&mut player.items.bricks, negative, &mut player.bounty),
        Prize::Rocket => toggle_count(&mut player.items.rockets, negative, &mut player.bounty),
        Prize::Portal => toggle_count(&mut player.items.portals, negative, &mut player.bounty),
        Prize::MultifireSpread => {
            player.bounty = bump_bounty(player.bounty, !negative);
        }
    }
}

fn bump_bounty(bounty: u32, positive: bool) -> u32 {
    if positive {
        bounty + 1
    } else {
        bounty.saturating_sub(1)
    }
}

fn toggle_item(flag: &mut bool, grant: bool, bounty: &mut u32) {
    if grant {
        if *flag {
            *bounty += 1;
        } else {
            *flag = true;
        }
    } else {
        *flag = false;
    }
}

fn toggle_count(count: &mut u8, remove: bool, bounty: &mut u32) {
    let _ = bounty;
    if remove {
        *count = count.saturating_sub(1);
    } else {
        *count = count.saturating_add(1);
    }
}

/// Roll `MultiprizeCount` further prizes, excluding the set named in §4.6,
/// preserving `player.bounty` across the inner applications (a multiprize
/// itself doesn't change bounty).
fn apply_multiprize(player: &mut Player, settings: &Settings) {
    let saved_bounty = player.bounty;
    let mut rng = VieRng::new(player.id.0 as i32 ^ saved_bounty as i32);
    for _ in 0..settings.multiprize_count {
        let id = loop {
            let candidate = generate_prize(&mut rng, &settings.prize_weights, settings.prize_negative_factor, false);
            let prize = PRIZE_ORDER[(candidate.unsigned_abs() as usize).saturating_sub(1).min(PRIZE_COUNT - 1)];
            if !prize.excluded_from_multiprize() {
                break candidate;
            }
        };
        apply_prize(player, id, settings);
    }
    player.bounty = saved_bounty;
}

/// `ResetShip`: generate `InitialBounty` prizes from the weighted RNG,
/// excluding the same set as multiprize, saving and restoring `prize_seed`
/// around the generation so the two stay synchronized (§4.6, resolving the
/// save/restore-ordering open question by snapshotting before and
/// overwriting after the whole batch, not per-draw).
pub fn reset_ship(player: &mut Player, settings: &Settings, prize_seed: &mut i32) {
    player.items = ItemCounts::default();
    player.bounty = 0;

    let saved = *prize_seed;
    let mut rng = VieRng::new(saved);
    for _ in 0..settings.initial_bounty {
        let id = loop {
            let candidate = generate_prize(&mut rng, &settings.prize_weights, settings.prize_negative_factor, false);
            let prize = PRIZE_ORDER[(candidate.unsigned_abs() as usize).saturating_sub(1).min(PRIZE_COUNT - 1)];
            if !prize.excluded_from_multiprize() {
                break candidate;
            }
        };
        apply_prize(player, id, settings);
    }
    *prize_seed = rng.seed();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_prize_picks_a_weighted_index() {
        let mut rng = VieRng::new(5);
        let mut weights = [0u32; PRIZE_COUNT];
        weights[3] = 100;
        let id = generate_prize(&mut rng, &weights, 0, false);
        assert_eq!(id.unsigned_abs(), 4);
    }

    #[test]
    fn negative_factor_of_zero_never_negates() {
        let mut rng = VieRng::new(99);
        let mut weights = [1u32; PRIZE_COUNT];
        weights[0] = 1000;
        for _ in 0..20 {
            let id = generate_prize(&mut rng, &weights, 0, true);
            assert!(id > 0);
        }
    }

    #[test]
    fn reset_ship_clears_items_and_bounty_before_applying() {
        let mut player = Player::new(crate::player::state::PlayerId(1));
        player.bounty = 50;
        player.items.repels = 3;
        let mut settings = Settings::default();
        settings.initial_bounty = 0;
        let mut seed = 7;
        reset_ship(&mut player, &settings, &mut seed);
        assert_eq!(player.bounty, 0);
        assert_eq!(player.items.repels, 0);
    }
}
