//! Powerball/soccer simulation (§4.8).
//!
//! Mirrors `weapon::manager`'s per-axis wall-bounce stepping for ball
//! movement, since the wire protocol treats a ball in flight almost exactly
//! like a bouncing bullet: one microtick-granular simulation step per tick,
//! with `next_x`/`next_y` precomputed one step ahead so a renderer can
//! interpolate smoothly between ticks instead of snapping.

use crate::core::{MicroTick, Tick, Vec2};
use crate::events::EventBus;
use crate::map::tile::TileMap;
use crate::net::connection::Settings;
use crate::net::packet::PowerballPositionPacket;
use crate::player::state::{Player, PlayerId};
use crate::ship::state::ShipRuntime;

/// Integer-fixed-point friction scale: velocity is multiplied by
/// `friction / FRICTION_SCALE` each tick. The per-tick decrement applied to
/// `friction` isn't named by a `Settings` field, so a fixed decay constant
/// is used and recorded as an assumption.
const FRICTION_SCALE: u32 = 1_000_000;
const FRICTION_DECAY_PER_TICK: u32 = 2_000;

/// Minimum ticks between two pickups of the same ball by anyone.
const PICKUP_RATE_LIMIT_TICKS: i32 = 100;

/// Recoil applied to the shooter's weapon cooldowns after a kick, so a
/// fired ball can't be immediately followed by a bomb/bullet at the old
/// cooldown (§4.8).
const KICK_COOLDOWN_TICKS: u32 = 50;

/// One powerball's full simulation state.
#[derive(Clone, Debug)]
pub struct Ball {
    pub id: u8,
    pub position: Vec2,
    pub velocity: Vec2,
    pub next_position: Vec2,
    friction: u32,
    pub carrier: Option<PlayerId>,
    pub carry_timer: u32,
    last_touch: Option<PlayerId>,
    last_touch_tick: Tick,
    last_pickup_tick: Tick,
    last_micro_tick: MicroTick,
}

impl Ball {
    fn new(id: u8, position: Vec2) -> Self {
        Ball {
            id,
            position,
            velocity: Vec2::ZERO,
            next_position: position,
            friction: FRICTION_SCALE,
            carrier: None,
            carry_timer: 0,
            last_touch: None,
            last_touch_tick: Tick(0),
            last_pickup_tick: Tick(0),
            last_micro_tick: MicroTick(0),
        }
    }

    /// Position interpolated between the last simulated tick and the
    /// precomputed next one, for smooth rendering between ticks.
    pub fn interpolated_position(&self, now: MicroTick) -> Vec2 {
        let elapsed = now.diff(self.last_micro_tick).max(0) as f32;
        let t = (elapsed / MicroTick::TICK_DURATION_MICROS as f32).clamp(0.0, 1.0);
        self.position.lerp(self.next_position, t)
    }

    /// Last player known to have touched this ball, if any.
    pub fn last_touch_player(&self) -> Option<PlayerId> {
        self.last_touch
    }
}

fn simulate_axis(ball: &mut Ball, axis: usize, map: &TileMap) {
    let previous = if axis == 0 { ball.position.x } else { ball.position.y };
    if axis == 0 {
        ball.position.x += ball.velocity.x;
    } else {
        ball.position.y += ball.velocity.y;
    }
    if map.is_solid(ball.position.x as u16, ball.position.y as u16) {
        if axis == 0 {
            ball.position.x = previous;
            ball.velocity.x = -ball.velocity.x;
        } else {
            ball.position.y = previous;
            ball.velocity.y = -ball.velocity.y;
        }
    }
}

/// Owns every powerball in the arena and drives their shared tick.
pub struct SoccerManager {
    balls: Vec<Ball>,
}

impl SoccerManager {
    pub fn new(ball_count: u8, start_position: Vec2) -> Self {
        SoccerManager {
            balls: (0..ball_count).map(|id| Ball::new(id, start_position)).collect(),
        }
    }

    pub fn ball(&self, id: u8) -> Option<&Ball> {
        self.balls.iter().find(|b| b.id == id)
    }

    fn ball_mut(&mut self, id: u8) -> Option<&mut Ball> {
        self.balls.iter_mut().find(|b| b.id == id)
    }

    pub fn balls(&self) -> impl Iterator<Item = &Ball> {
        self.balls.iter()
    }

    /// One simulation tick for every ball not currently carried: step both
    /// axes, decay velocity by the integer friction factor, and precompute
    /// `next_position` one further step ahead for interpolation. Goals
    /// themselves are server-adjudicated and arrive as a `SoccerGoal`
    /// packet, not detected here.
    pub fn tick(&mut self, current_tick: Tick, current_micro_tick: MicroTick, map: &TileMap, settings: &Settings, events: &mut EventBus) {
        let _ = (settings, events);
        for ball in &mut self.balls {
            if ball.carrier.is_some() {
                if ball.carry_timer > 0 {
                    ball.carry_timer -= 1;
                }
                ball.last_micro_tick = current_micro_tick;
                continue;
            }

            simulate_axis(ball, 0, map);
            simulate_axis(ball, 1, map);

            ball.velocity = ball.velocity * (ball.friction as f32 / FRICTION_SCALE as f32);
            ball.friction = ball.friction.saturating_sub(FRICTION_DECAY_PER_TICK);

            let mut lookahead = ball.clone();
            simulate_axis(&mut lookahead, 0, map);
            simulate_axis(&mut lookahead, 1, map);
            ball.next_position = lookahead.position;
            ball.last_micro_tick = current_micro_tick;
        }
        let _ = current_tick;
    }

    /// Whether `player` may pick up `ball`: within proximity, respecting
    /// pass delay against the previous carrier, not already attached or
    /// carrying, and rate-limited to once per second.
    pub fn try_pickup(&mut self, ball_id: u8, player: &Player, current_tick: Tick, settings: &Settings) -> bool {
        let Some(ball) = self.ball_mut(ball_id) else { return false };
        if ball.carrier.is_some() {
            return false;
        }
        if current_tick.diff(ball.last_pickup_tick) < PICKUP_RATE_LIMIT_TICKS {
            return false;
        }

        let radius = settings.soccer_ball_proximity as f32 / 16.0;
        if ball.position.distance(player.position) > radius {
            return false;
        }

        if ball.last_touch == Some(player.id) && ball.velocity.length_squared() > 0.0 {
            let pass_delay_elapsed = current_tick.diff(ball.last_touch_tick) >= settings.pass_delay as i32;
            if !pass_delay_elapsed {
                return false;
            }
        }

        ball.carrier = Some(player.id);
        ball.last_touch = Some(player.id);
        ball.last_touch_tick = current_tick;
        ball.last_pickup_tick = current_tick;
        ball.velocity = Vec2::ZERO;
        true
    }

    /// Kick a carried ball in `heading`, releasing it from the carrier and
    /// applying the firing-cooldown penalty (§4.8) to the shooter's weapon
    /// timers.
    pub fn fire(&mut self, ball_id: u8, carrier: &Player, heading: Vec2, settings: &Settings, runtime: &mut ShipRuntime, current_tick: Tick) -> bool {
        let Some(ball) = self.ball_mut(ball_id) else { return false };
        if ball.carrier != Some(carrier.id) {
            return false;
        }

        ball.carrier = None;
        ball.friction = FRICTION_SCALE;
        ball.velocity = carrier.velocity + heading * (settings.soccer_ball_speed as f32 / 160.0);
        ball.last_touch = Some(carrier.id);
        ball.last_touch_tick = current_tick;

        runtime.next_bomb_tick = runtime.next_bomb_tick + KICK_COOLDOWN_TICKS;
        runtime.next_bullet_tick = runtime.next_bullet_tick + KICK_COOLDOWN_TICKS;
        true
    }

    /// Apply an incoming `PowerballPosition` packet: an invalid owner with
    /// an advancing timestamp means "ball in flight" (position + velocity);
    /// timestamp `0` means "currently carried" (no velocity to apply). If
    /// the carrier is the local player, start the throw timer.
    pub fn on_position_packet(&mut self, packet: &PowerballPositionPacket, self_id: PlayerId, settings: &Settings, current_tick: Tick) {
        let Some(ball) = self.ball_mut(packet.ball_id) else { return };

        if packet.timestamp == 0 {
            ball.carrier = Some(PlayerId(packet.owner));
            ball.velocity = Vec2::ZERO;
            if PlayerId(packet.owner) == self_id {
                ball.carry_timer = settings.soccer_ball_throw_timer / 100;
            }
            return;
        }

        ball.carrier = None;
        ball.position = Vec2::new((packet.x as f32) / 16.0, (packet.y as f32) / 16.0);
        ball.velocity = Vec2::new(packet.vel_x as f32 / 160.0, packet.vel_y as f32 / 160.0);
        ball.last_touch_tick = current_tick;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friction_decays_velocity_towards_zero() {
        let map = TileMap::load(&[]).unwrap();
        let mut manager = SoccerManager::new(1, Vec2::new(512.0, 512.0));
        manager.ball_mut(0).unwrap().velocity = Vec2::new(1.0, 0.0);
        let mut events = EventBus::new();
        let settings = Settings::default();

        let start_speed = manager.ball(0).unwrap().velocity.length();
        manager.tick(Tick(1), MicroTick(0), &map, &settings, &mut events);
        let after_speed = manager.ball(0).unwrap().velocity.length();
        assert!(after_speed < start_speed);
    }

    #[test]
    fn pickup_respects_proximity_radius() {
        let mut manager = SoccerManager::new(1, Vec2::new(100.0, 100.0));
        let mut settings = Settings::default();
        settings.soccer_ball_proximity = 16;

        let mut player = Player::new(PlayerId(1));
        player.position = Vec2::new(500.0, 500.0);
        assert!(!manager.try_pickup(0, &player, Tick(200), &settings));

        player.position = Vec2::new(100.0, 100.0);
        assert!(manager.try_pickup(0, &player, Tick(200), &settings));
    }

    #[test]
    fn fire_releases_carrier_and_adds_weapon_cooldown() {
        let mut manager = SoccerManager::new(1, Vec2::new(100.0, 100.0));
        let settings = Settings::default();
        let mut player = Player::new(PlayerId(1));
        player.position = Vec2::new(100.0, 100.0);
        manager.try_pickup(0, &player, Tick(200), &settings);

        let mut runtime = ShipRuntime::default();
        let fired = manager.fire(0, &player, Vec2::new(1.0, 0.0), &settings, &mut runtime, Tick(201));
        assert!(fired);
        assert!(manager.ball(0).unwrap().carrier.is_none());
        assert_eq!(runtime.next_bomb_tick, Tick(0) + KICK_COOLDOWN_TICKS);
    }
}
