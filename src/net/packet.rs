//! Typed packet reader/writer and incoming packet parsing (§6).
//!
//! Every parse either returns a typed record or [`CoreError::MalformedPacket`];
//! nothing here panics on attacker- or corruption-supplied bytes (Design
//! Notes §9: "replace raw buffer parsing with a typed reader that refuses
//! over-reads").
//!
//! The wire's own wire-level wire-format byte that selects a packet type is
//! owned by the `Connection` collaborator (§1); this module's [`IncomingKind`]
//! is this crate's internal dispatch key, translated from that wire byte by
//! the host application before calling [`parse_incoming`]. Only the payload
//! layouts after the type byte are specified here, and those are taken
//! directly from §6's table.

use crate::error::CoreError;

/// A cursor over an incoming packet's payload bytes.
pub struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    /// Wrap a payload slice for reading.
    pub fn new(data: &'a [u8]) -> Self {
        PacketReader { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CoreError> {
        if self.remaining() < n {
            return Err(CoreError::MalformedPacket {
                packet_type: 0,
                reason: format!("expected {n} more bytes, had {}", self.remaining()),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, CoreError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CoreError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16, CoreError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, CoreError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32, CoreError> {
        Ok(self.read_u32()? as i32)
    }

    /// Read a fixed-size byte field, trimming trailing NUL padding and
    /// decoding as (lossy) UTF-8, matching the original's C-string fields
    /// (`name[20]`, `squad[20]`).
    pub fn read_fixed_str(&mut self, len: usize) -> Result<String, CoreError> {
        let bytes = self.take(len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
    }

    /// Remaining bytes, decoded as a NUL-terminated or unterminated string
    /// (used for chat messages, which run to the end of the packet).
    pub fn read_remaining_str(&mut self) -> Result<String, CoreError> {
        let rest = self.take(self.remaining())?;
        let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        Ok(String::from_utf8_lossy(&rest[..end]).into_owned())
    }
}

/// An append-only little-endian byte writer used to assemble outgoing
/// packets.
#[derive(Default)]
pub struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    pub fn new() -> Self {
        PacketWriter::default()
    }

    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn write_u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn write_i16(&mut self, v: i16) -> &mut Self {
        self.write_u16(v as u16)
    }

    pub fn write_u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Write a string followed by a NUL terminator (matching the original's
    /// `WriteString(data, size)` which always includes the terminator).
    pub fn write_cstring(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        self
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

/// This crate's internal dispatch key for incoming application packets.
///
/// Discriminants are assigned by this crate for internal routing; they are
/// not the wire protocol's own type byte (see module docs).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IncomingKind {
    PlayerId = 1,
    PlayerEntering = 2,
    PlayerLeaving = 3,
    TeamAndShipChange = 4,
    FrequencyChange = 5,
    LargePosition = 6,
    SmallPosition = 7,
    BatchedLargePosition = 8,
    BatchedSmallPosition = 9,
    PlayerDeath = 10,
    Chat = 11,
    FlagPosition = 12,
    FlagClaim = 13,
    DropFlag = 14,
    TurfFlagUpdate = 15,
    SetCoordinates = 16,
    CreateTurret = 17,
    DestroyTurret = 18,
    PlayerPrize = 19,
    CollectedPrize = 20,
    PowerballPosition = 21,
    SoccerGoal = 22,
}

/// `PlayerEntering` payload.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerEnteringPacket {
    pub ship: u8,
    pub audio: u8,
    pub name: String,
    pub squad: String,
    pub kill_points: u32,
    pub flag_points: u32,
    pub pid: u16,
    pub freq: u16,
    pub wins: u16,
    pub losses: u16,
    pub attach: u16,
    pub flags: u16,
    pub koth: u8,
}

/// `TeamAndShipChange` payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TeamAndShipChangePacket {
    pub ship: u8,
    pub pid: u16,
    pub freq: u16,
}

/// `LargePosition` payload (full, per-player).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LargePositionPacket {
    pub direction: u8,
    pub timestamp: u16,
    pub x: u16,
    pub vel_y: i16,
    pub pid: u16,
    pub vel_x: i16,
    pub checksum: u8,
    pub togglables: u8,
    pub ping: u8,
    pub y: u16,
    pub bounty: u16,
    pub weapon: u16,
    pub extra: Option<LargePositionExtra>,
}

/// Optional trailing fields on a `LargePosition` packet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LargePositionExtra {
    pub energy: u16,
    pub latency: u16,
    pub flag_timer: u16,
    pub items: u32,
}

/// `SmallPosition` payload: like `LargePosition` but with byte-narrowed
/// `pid`/`ping`/`bounty` and no `weapon` field in the header.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmallPositionPacket {
    pub direction: u8,
    pub timestamp: u16,
    pub x: u16,
    pub vel_y: i16,
    pub pid: u8,
    pub vel_x: i16,
    pub checksum: u8,
    pub togglables: u8,
    pub ping: u8,
    pub y: u16,
    pub bounty: u8,
}

/// `PlayerDeath` payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerDeathPacket {
    pub green_id: u8,
    pub killer_id: u16,
    pub killed_id: u16,
    pub bounty: u16,
    pub flag_transfer: u16,
}

/// `Chat` payload.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatPacket {
    pub chat_type: u8,
    pub sound: u8,
    pub sender_id: u16,
    pub message: String,
}

/// `FlagPosition` payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlagPositionPacket {
    pub id: u16,
    pub x: u16,
    pub y: u16,
    pub owner: u16,
}

/// `FlagClaim` / `DropFlag` payload (same shape).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlagClaimPacket {
    pub id: u16,
    pub pid: u16,
}

/// `SetCoordinates` payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SetCoordinatesPacket {
    pub x: u16,
    pub y: u16,
}

/// `CreateTurret` / `DestroyTurret` payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TurretPacket {
    pub requester_id: u16,
    pub dest_id: Option<u16>,
}

/// `PlayerPrize` payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerPrizePacket {
    pub timestamp: u32,
    pub x: u16,
    pub y: u16,
    pub prize_id: u16,
    pub pid: u16,
}

/// `CollectedPrize` payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollectedPrizePacket {
    pub count: u16,
    pub prize_id: i16,
}

/// `PowerballPosition` payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerballPositionPacket {
    pub ball_id: u8,
    pub x: u16,
    pub y: u16,
    pub vel_x: i16,
    pub vel_y: i16,
    pub owner: u16,
    pub timestamp: u32,
}

/// A parsed incoming application packet.
#[derive(Clone, Debug, PartialEq)]
pub enum IncomingPacket {
    PlayerId { id: u16 },
    PlayerEntering(PlayerEnteringPacket),
    PlayerLeaving { pid: u16 },
    TeamAndShipChange(TeamAndShipChangePacket),
    FrequencyChange { pid: u16, freq: u16 },
    LargePosition(LargePositionPacket),
    SmallPosition(SmallPositionPacket),
    PlayerDeath(PlayerDeathPacket),
    Chat(ChatPacket),
    FlagPosition(FlagPositionPacket),
    FlagClaim(FlagClaimPacket),
    DropFlag(FlagClaimPacket),
    TurfFlagUpdate { teams: Vec<u16> },
    SetCoordinates(SetCoordinatesPacket),
    CreateTurret(TurretPacket),
    DestroyTurret(TurretPacket),
    PlayerPrize(PlayerPrizePacket),
    CollectedPrize(CollectedPrizePacket),
    PowerballPosition(PowerballPositionPacket),
    SoccerGoal { ball_id: u8 },
}

/// Parse `payload` (bytes after the type byte) according to `kind`.
pub fn parse_incoming(kind: IncomingKind, payload: &[u8]) -> Result<IncomingPacket, CoreError> {
    let mut r = PacketReader::new(payload);
    let packet = match kind {
        IncomingKind::PlayerId => IncomingPacket::PlayerId { id: r.read_u16()? },
        IncomingKind::PlayerEntering => IncomingPacket::PlayerEntering(PlayerEnteringPacket {
            ship: r.read_u8()?,
            audio: r.read_u8()?,
            name: r.read_fixed_str(20)?,
            squad: r.read_fixed_str(20)?,
            kill_points: r.read_u32()?,
            flag_points: r.read_u32()?,
            pid: r.read_u16()?,
            freq: r.read_u16()?,
            wins: r.read_u16()?,
            losses: r.read_u16()?,
            attach: r.read_u16()?,
            flags: r.read_u16()?,
            koth: r.read_u8()?,
        }),
        IncomingKind::PlayerLeaving => IncomingPacket::PlayerLeaving { pid: r.read_u16()? },
        IncomingKind::TeamAndShipChange => {
            IncomingPacket::TeamAndShipChange(TeamAndShipChangePacket {
                ship: r.read_u8()?,
                pid: r.read_u16()?,
                freq: r.read_u16()?,
            })
        }
        IncomingKind::FrequencyChange => IncomingPacket::FrequencyChange {
            pid: r.read_u16()?,
            freq: r.read_u16()?,
        },
        IncomingKind::LargePosition | IncomingKind::BatchedLargePosition => {
            let direction = r.read_u8()?;
            let timestamp = r.read_u16()?;
            let x = r.read_u16()?;
            let vel_y = r.read_i16()?;
            let pid = r.read_u16()?;
            let vel_x = r.read_i16()?;
            let checksum = r.read_u8()?;
            let togglables = r.read_u8()?;
            let ping = r.read_u8()?;
            let y = r.read_u16()?;
            let bounty = r.read_u16()?;
            let weapon = r.read_u16()?;
            let extra = if r.remaining() >= 10 {
                Some(LargePositionExtra {
                    energy: r.read_u16()?,
                    latency: r.read_u16()?,
                    flag_timer: r.read_u16()?,
                    items: r.read_u32()?,
                })
            } else {
                None
            };
            IncomingPacket::LargePosition(LargePositionPacket {
                direction,
                timestamp,
                x,
                vel_y,
                pid,
                vel_x,
                checksum,
                togglables,
                ping,
                y,
                bounty,
                weapon,
                extra,
            })
        }
        IncomingKind::SmallPosition | IncomingKind::BatchedSmallPosition => {
            IncomingPacket::SmallPosition(SmallPositionPacket {
                direction: r.read_u8()?,
                timestamp: r.read_u16()?,
                x: r.read_u16()?,
                vel_y: r.read_i16()?,
                pid: r.read_u8()?,
                vel_x: r.read_i16()?,
                checksum: r.read_u8()?,
                togglables: r.read_u8()?,
                ping: r.read_u8()?,
                y: r.read_u16()?,
                bounty: r.read_u8()?,
            })
        }
        IncomingKind::PlayerDeath => IncomingPacket::PlayerDeath(PlayerDeathPacket {
            green_id: r.read_u8()?,
            killer_id: r.read_u16()?,
            killed_id: r.read_u16()?,
            bounty: r.read_u16()?,
            flag_transfer: r.read_u16()?,
        }),
        IncomingKind::Chat => IncomingPacket::Chat(ChatPacket {
            chat_type: r.read_u8()?,
            sound: r.read_u8()?,
            sender_id: r.read_u16()?,
            message: r.read_remaining_str()?,
        }),
        IncomingKind::FlagPosition => IncomingPacket::FlagPosition(FlagPositionPacket {
            id: r.read_u16()?,
            x: r.read_u16()?,
            y: r.read_u16()?,
            owner: r.read_u16()?,
        }),
        IncomingKind::FlagClaim => IncomingPacket::FlagClaim(FlagClaimPacket {
            id: r.read_u16()?,
            pid: r.read_u16()?,
        }),
        IncomingKind::DropFlag => IncomingPacket::DropFlag(FlagClaimPacket {
            id: r.read_u16()?,
            pid: r.read_u16()?,
        }),
        IncomingKind::TurfFlagUpdate => {
            let mut teams = Vec::with_capacity(r.remaining() / 2);
            while r.remaining() >= 2 {
                teams.push(r.read_u16()?);
            }
            IncomingPacket::TurfFlagUpdate { teams }
        }
        IncomingKind::SetCoordinates => IncomingPacket::SetCoordinates(SetCoordinatesPacket {
            x: r.read_u16()?,
            y: r.read_u16()?,
        }),
        IncomingKind::CreateTurret => IncomingPacket::CreateTurret(TurretPacket {
            requester_id: r.read_u16()?,
            dest_id: if r.remaining() >= 2 {
                Some(r.read_u16()?)
            } else {
                None
            },
        }),
        IncomingKind::DestroyTurret => IncomingPacket::DestroyTurret(TurretPacket {
            requester_id: r.read_u16()?,
            dest_id: if r.remaining() >= 2 {
                Some(r.read_u16()?)
            } else {
                None
            },
        }),
        IncomingKind::PlayerPrize => IncomingPacket::PlayerPrize(PlayerPrizePacket {
            timestamp: r.read_u32()?,
            x: r.read_u16()?,
            y: r.read_u16()?,
            prize_id: r.read_u16()?,
            pid: r.read_u16()?,
        }),
        IncomingKind::CollectedPrize => IncomingPacket::CollectedPrize(CollectedPrizePacket {
            count: r.read_u16()?,
            prize_id: r.read_i16()?,
        }),
        IncomingKind::PowerballPosition => {
            IncomingPacket::PowerballPosition(PowerballPositionPacket {
                ball_id: r.read_u8()?,
                x: r.read_u16()?,
                y: r.read_u16()?,
                vel_x: r.read_i16()?,
                vel_y: r.read_i16()?,
                owner: r.read_u16()?,
                timestamp: r.read_u32()?,
            })
        }
        IncomingKind::SoccerGoal => IncomingPacket::SoccerGoal {
            ball_id: r.read_u8()?,
        },
    };
    Ok(packet)
}

/// Assemble an outgoing `0x06` chat packet (reliable).
pub fn write_chat(chat_type: u8, sound: u8, target_pid: u16, message: &str) -> Vec<u8> {
    let mut w = PacketWriter::new();
    w.write_u8(0x06)
        .write_u8(chat_type)
        .write_u8(sound)
        .write_u16(target_pid)
        .write_cstring(message);
    w.into_vec()
}

/// Assemble an outgoing "take green" packet.
pub fn write_take_green(x: u16, y: u16, prize_id: i16) -> Vec<u8> {
    let mut w = PacketWriter::new();
    w.write_u16(x).write_u16(y).write_i16(prize_id);
    w.into_vec()
}

/// Assemble an outgoing death report packet.
pub fn write_death(killer_id: u16, bounty: u16) -> Vec<u8> {
    let mut w = PacketWriter::new();
    w.write_u16(killer_id).write_u16(bounty);
    w.into_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_player_id() {
        let payload = 7u16.to_le_bytes();
        let packet = parse_incoming(IncomingKind::PlayerId, &payload).unwrap();
        assert_eq!(packet, IncomingPacket::PlayerId { id: 7 });
    }

    #[test]
    fn rejects_short_payload() {
        let err = parse_incoming(IncomingKind::PlayerId, &[1]).unwrap_err();
        assert!(matches!(err, CoreError::MalformedPacket { .. }));
    }

    #[test]
    fn parses_large_position_without_extra() {
        let mut w = PacketWriter::new();
        w.write_u8(10) // direction
            .write_u16(500) // timestamp
            .write_u16(1600) // x
            .write_i16(0) // vel_y
            .write_u16(3) // pid
            .write_i16(160) // vel_x
            .write_u8(0) // checksum
            .write_u8(0) // togglables
            .write_u8(20) // ping
            .write_u16(1600) // y
            .write_u16(0) // bounty
            .write_u16(0); // weapon

        let packet = parse_incoming(IncomingKind::LargePosition, w.as_slice()).unwrap();
        match packet {
            IncomingPacket::LargePosition(p) => {
                assert_eq!(p.pid, 3);
                assert_eq!(p.vel_x, 160);
                assert!(p.extra.is_none());
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn parses_large_position_with_extra() {
        let mut w = PacketWriter::new();
        w.write_u8(0)
            .write_u16(0)
            .write_u16(0)
            .write_i16(0)
            .write_u16(1)
            .write_i16(0)
            .write_u8(0)
            .write_u8(0)
            .write_u8(0)
            .write_u16(0)
            .write_u16(0)
            .write_u16(0)
            .write_u16(500) // energy
            .write_u16(20) // latency
            .write_u16(300) // flag_timer
            .write_u32(0x1234); // items

        let packet = parse_incoming(IncomingKind::LargePosition, w.as_slice()).unwrap();
        match packet {
            IncomingPacket::LargePosition(p) => {
                let extra = p.extra.unwrap();
                assert_eq!(extra.energy, 500);
                assert_eq!(extra.items, 0x1234);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn write_chat_round_trips_fields() {
        let bytes = write_chat(2, 0, 9, "hi");
        assert_eq!(bytes[0], 0x06);
        assert_eq!(bytes[1], 2);
        assert_eq!(bytes[2], 0);
        assert_eq!(u16::from_le_bytes([bytes[3], bytes[4]]), 9);
        assert_eq!(&bytes[5..7], b"hi");
        assert_eq!(bytes[7], 0);
    }

    #[test]
    fn fixed_str_trims_at_nul() {
        let mut data = vec![b'b', b'o', b't'];
        data.resize(20, 0);
        let mut r = PacketReader::new(&data);
        assert_eq!(r.read_fixed_str(20).unwrap(), "bot");
    }
}
