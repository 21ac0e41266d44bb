//! `GameState`: owns every manager and drives the fixed per-tick order
//! (§2, §5): ship → player → weapon → soccer → chat → map/flag/green.
//!
//! Resolves the `PlayerManager ↔ WeaponManager ↔ ShipController` cyclic
//! reference named in §9's Design Notes by having a single owner hold all
//! three and pass borrowed references between them for the duration of one
//! call, rather than each holding a reference (or index) back into the
//! others permanently.

use crate::basemap::{self, MapBase, MapBuildConfig};
use crate::chat::ChatController;
use crate::core::Tick;
use crate::energy::{EnergyPolicy, HeuristicEnergyTracker};
use crate::error::CoreError;
use crate::events::{EventBus, GameEvent};
use crate::flag::FlagManager;
use crate::map::door::DoorMode;
use crate::map::Map;
use crate::net::connection::Settings;
use crate::net::packet::{self, IncomingKind, IncomingPacket};
use crate::net::Connection;
use crate::player::state::{PlayerId, PlayerManager};
use crate::ship::state::ShipInput;
use crate::ship::ShipController;
use crate::soccer::SoccerManager;

/// Everything the simulation core owns for one arena: rosters, live
/// projectiles, the ball(s), flags/greens, the tile map, and the shared
/// event bus every subsystem publishes onto.
pub struct GameState {
    pub players: PlayerManager,
    pub weapons: crate::weapon::WeaponManager,
    pub ship_controller: ShipController,
    pub soccer: SoccerManager,
    pub chat: ChatController,
    pub flags: FlagManager,
    pub energy: HeuristicEnergyTracker,
    pub map: Map,
    pub events: EventBus,
    pub bases: Vec<MapBase>,
    pub settings: Settings,
    pub current_tick: Tick,
    door_mode: DoorMode,
    door_delay: u32,
    last_position_tick: Tick,
}

impl GameState {
    /// Build a fresh arena state from a loaded map and arena settings.
    /// Runs the base analyzer once, per §4.9.
    pub fn new(map: Map, settings: Settings) -> Self {
        let bases = basemap::find_bases(map.tiles(), &MapBuildConfig::default());
        GameState {
            players: PlayerManager::new(),
            weapons: crate::weapon::WeaponManager::new(),
            ship_controller: ShipController::new(),
            soccer: SoccerManager::new(1, crate::core::Vec2::new(512.0, 512.0)),
            chat: ChatController::new(settings.chat_flood_limit),
            flags: FlagManager::new(0),
            energy: HeuristicEnergyTracker::new(EnergyPolicy::Maximum),
            map,
            events: EventBus::new(),
            bases,
            settings,
            current_tick: Tick(0),
            door_mode: DoorMode::Folded,
            door_delay: 0,
            last_position_tick: Tick(0),
        }
    }

    /// Override the door reseed mode/delay decoded from `ArenaSettings`
    /// (these aren't part of [`Settings`] since they govern `Map`'s own
    /// door-replay clock rather than a per-tick formula).
    pub fn configure_doors(&mut self, mode: DoorMode, delay: u32) {
        self.door_mode = mode;
        self.door_delay = delay;
    }

    /// Parse and route one incoming packet by its dispatcher type.
    pub fn handle_incoming(&mut self, kind: IncomingKind, payload: &[u8]) -> Result<(), CoreError> {
        let packet = packet::parse_incoming(kind, payload)?;
        match packet {
            IncomingPacket::PlayerId { id } => {
                self.players.on_player_id_change(PlayerId(id));
            }
            IncomingPacket::PlayerEntering(entering) => {
                let handle = self.players.on_player_enter(PlayerId(entering.pid), &mut self.events);
                handle.name = entering.name;
                handle.squad = entering.squad;
                handle.ship = entering.ship;
                handle.frequency = entering.freq;
                handle.kill_points = entering.kill_points;
                handle.flag_points = entering.flag_points;
                handle.wins = entering.wins;
                handle.losses = entering.losses;
                handle.koth = entering.koth != 0;
            }
            IncomingPacket::PlayerLeaving { pid } => {
                self.players.on_player_leave(PlayerId(pid), &mut self.events);
                self.weapons.clear_weapons(PlayerId(pid));
            }
            IncomingPacket::Chat(chat_packet) => {
                self.chat.on_incoming(&chat_packet, &self.players, &mut self.events);
            }
            IncomingPacket::FlagPosition(flag_packet) => {
                self.flags.on_flag_position(&flag_packet);
            }
            IncomingPacket::FlagClaim(claim) => {
                self.flags.on_flag_claim(&claim, &self.players, self.current_tick);
            }
            IncomingPacket::DropFlag(claim) => {
                self.flags.on_drop_flag(&claim, self.current_tick, self.settings.flag_drop_delay);
            }
            IncomingPacket::PowerballPosition(ball_packet) => {
                self.soccer
                    .on_position_packet(&ball_packet, self.players.self_id, &self.settings, self.current_tick);
            }
            IncomingPacket::SoccerGoal { ball_id } => {
                if let Some(ball) = self.soccer.ball(ball_id) {
                    self.events.publish(GameEvent::BallGoal {
                        ball_id,
                        owner: ball.last_touch_player(),
                    });
                }
            }
            IncomingPacket::PlayerDeath(death) => {
                self.on_player_death(&death);
            }
            _ => {}
        }
        Ok(())
    }

    fn on_player_death(&mut self, death: &packet::PlayerDeathPacket) {
        let killed = PlayerId(death.killed_id);
        self.weapons.clear_weapons(killed);
        self.events.publish(GameEvent::PlayerDeath { player_id: killed });
        if let Some(ship) = self.players.get(killed).map(|p| self.settings.ships[p.ship.min(7) as usize]) {
            self.energy.reset(killed, &ship);
        }
    }

    /// Advance the whole arena by one tick, in the fixed order (§2, §5):
    /// ship → player → weapon → soccer → chat → map/flag/green. `self_input`
    /// drives the local player's ship controller; every other player's
    /// position is purely extrapolated from its last received packet.
    pub fn tick(&mut self, connection: &mut impl Connection, self_input: ShipInput) {
        self.current_tick = connection.current_tick();

        let self_id = self.players.self_id;
        if !self_id.is_invalid() {
            self.ship_controller.tick(
                self_id,
                self_input,
                &mut self.players,
                &mut self.weapons,
                &self.settings,
                self.map.tiles(),
                self.current_tick,
                &mut self.events,
            );
        }

        for player in self.players.iter_mut() {
            if player.id != self_id {
                crate::player::position::simulate_tick(player, &self.settings, self.map.tiles());
            }
        }

        self.weapons.update(self.current_tick, &self.settings, &mut self.players, self.map.tiles(), &mut self.events);

        self.soccer.tick(
            self.current_tick,
            crate::core::MicroTick(self.current_tick.0 as u64 * crate::core::MicroTick::TICK_DURATION_MICROS),
            self.map.tiles(),
            &self.settings,
            &mut self.events,
        );

        let outgoing_chat = {
            let mut packets = Vec::new();
            self.chat.update(self.current_tick, &self.players, |bytes| packets.push(bytes));
            packets
        };
        for packet in outgoing_chat {
            connection.send_reliable_message(&packet);
        }

        self.flags.expire_greens(self.current_tick);
        let closed_doors = self.map.update_doors(self.current_tick, self.door_mode, self.door_delay);
        let _ = closed_doors;

        if !self_id.is_invalid() {
            self.send_position(connection);
        }
    }

    fn send_position(&mut self, connection: &mut impl Connection) {
        let Some(player) = self.players.get_self() else { return };

        let mut timestamp = self.current_tick.0;
        if Tick(timestamp).diff(self.last_position_tick) <= 0 {
            timestamp = self.last_position_tick.0.wrapping_add(1);
        }
        self.last_position_tick = Tick(timestamp);

        let bytes = crate::player::position::build_outgoing(player, timestamp, &self.settings, |_| 0);
        connection.send(&bytes);
    }

    /// Roll and apply a `ResetShip` prize batch to `player_id` (e.g. on
    /// `?warp`/respawn), using that player's own runtime-held RNG seed.
    pub fn reset_ship(&mut self, player_id: PlayerId) {
        let Some(player) = self.players.get_mut(player_id) else { return };
        crate::ship::reset_ship(&mut self.ship_controller, player, &self.settings);
    }

    pub fn apply_prize(&mut self, player_id: PlayerId, prize_id: i32) {
        if let Some(player) = self.players.get_mut(player_id) {
            crate::ship::apply_prize(player, prize_id, &self.settings);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Map;

    struct FakeConnection {
        tick: Tick,
        sent: Vec<Vec<u8>>,
        reliable: Vec<Vec<u8>>,
        arena_settings: crate::net::connection::ArenaSettings,
    }

    impl Connection for FakeConnection {
        fn send(&mut self, buffer: &[u8]) {
            self.sent.push(buffer.to_vec());
        }
        fn send_reliable_message(&mut self, payload: &[u8]) {
            self.reliable.push(payload.to_vec());
        }
        fn current_tick(&self) -> Tick {
            self.tick
        }
        fn arena_settings(&self) -> &crate::net::connection::ArenaSettings {
            &self.arena_settings
        }
    }

    fn new_state() -> GameState {
        let map = Map::load(&[], 1).unwrap();
        GameState::new(map, Settings::default())
    }

    #[test]
    fn tick_with_no_self_player_does_not_panic() {
        let mut state = new_state();
        let mut conn = FakeConnection {
            tick: Tick(1),
            sent: Vec::new(),
            reliable: Vec::new(),
            arena_settings: crate::net::connection::ArenaSettings::default(),
        };
        state.tick(&mut conn, ShipInput::default());
        assert!(conn.sent.is_empty());
    }

    #[test]
    fn tick_with_self_player_sends_a_position_packet() {
        let mut state = new_state();
        state
            .handle_incoming(IncomingKind::PlayerId, &1u16.to_le_bytes())
            .unwrap();
        state.players.on_player_enter(PlayerId(1), &mut state.events);

        let mut conn = FakeConnection {
            tick: Tick(1),
            sent: Vec::new(),
            reliable: Vec::new(),
            arena_settings: crate::net::connection::ArenaSettings::default(),
        };
        state.tick(&mut conn, ShipInput::default());
        assert_eq!(conn.sent.len(), 1);
        assert_eq!(conn.sent[0][0], 0x03);
    }

    #[test]
    fn player_id_change_sets_self_id() {
        let mut state = new_state();
        state.handle_incoming(IncomingKind::PlayerId, &7u16.to_le_bytes()).unwrap();
        assert_eq!(state.players.self_id, PlayerId(7));
    }

    #[test]
    fn player_entering_populates_roster_fields() {
        let mut state = new_state();
        let mut w = crate::net::packet::PacketWriter::new();
        w.write_u8(1) // ship
            .write_u8(0) // audio
            .write_cstring("bot")
            .write_bytes(&[0u8; 16])
            .write_cstring("squad")
            .write_bytes(&[0u8; 14])
            .write_u32(0) // kill_points
            .write_u32(0) // flag_points
            .write_u16(42) // pid
            .write_u16(3) // freq
            .write_u16(0) // wins
            .write_u16(0) // losses
            .write_u16(0xFFFF) // attach
            .write_u16(0) // flags
            .write_u8(0); // koth

        state.handle_incoming(IncomingKind::PlayerEntering, w.as_slice()).unwrap();
        let player = state.players.get(PlayerId(42)).unwrap();
        assert_eq!(player.name, "bot");
        assert_eq!(player.frequency, 3);
    }

    #[test]
    fn player_leaving_clears_live_weapons() {
        let mut state = new_state();
        state.players.on_player_enter(PlayerId(1), &mut state.events);
        state.weapons.fire_weapons(
            state.players.get(PlayerId(1)).unwrap(),
            crate::weapon::WeaponData {
                kind_bits: 1,
                level: 0,
                shrap: 0,
                alternate: false,
                shrap_level: 0,
                shrap_bouncing: false,
            },
            0,
            0,
            0,
            0,
            Tick(1),
            &state.settings,
            &state.players,
            state.map.tiles(),
            &mut state.events,
        );
        assert_eq!(state.weapons.len(), 1);
        state.handle_incoming(IncomingKind::PlayerLeaving, &1u16.to_le_bytes()).unwrap();
        assert_eq!(state.weapons.len(), 0);
    }
}
