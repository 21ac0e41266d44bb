//! Player roster, attach graph, position simulation, and spawn placement.

pub mod attach;
pub mod position;
pub mod spawn;
pub mod state;

pub use attach::{ArenaIndex, AttachArena};
pub use position::{apply_extra, apply_incoming, build_outgoing, decode_large, decode_small, simulate_tick};
pub use spawn::spawn_player;
pub use state::{
    ItemCounts, Player, PlayerId, PlayerManager, PlayerStatus, ANIM_DURATION_BOMB_FLASH,
    ANIM_DURATION_SHIP_EXPLODE, ANIM_DURATION_SHIP_WARP, PLAYER_TIMEOUT_DEFAULT,
};
