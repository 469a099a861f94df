//! Static and constant values used to configure Encore.

/// Length of the human-facing room join code.
pub const ENCORE_ROOM_CODE_LENGTH: usize = 4;

/// Alphabet used for join codes. Skips easily-confused characters.
pub const ENCORE_ROOM_CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Minimum number of connected players required to start a game.
pub const ENCORE_MIN_PLAYERS_TO_START: usize = 2;

/// Maximum length of a player or room name.
pub const ENCORE_NAME_MAX_LENGTH: usize = 20;

/// Year window used when building the distractor similarity pool.
pub const ENCORE_SIMILAR_YEAR_WINDOW: i32 = 5;

/// Time in seconds a disconnected player keeps their seat before the room is told.
pub const ENCORE_DEFAULT_GRACE_SECS: u64 = 30;

/// Age in days after which finished rooms are purged.
pub const ENCORE_DEFAULT_HOUSEKEEPING_DAYS: i64 = 3;

/// Interval in seconds between housekeeping sweeps.
pub const ENCORE_DEFAULT_HOUSEKEEPING_INTERVAL: u64 = 60 * 60;

/// How many candidate songs are fetched when building a distractor pool.
pub const ENCORE_DISTRACTOR_POOL_LIMIT: usize = 50;

#[allow(dead_code)]
/// Encore's version.
pub static ENCORE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[allow(dead_code)]
/// Encore's project name.
pub static ENCORE_NAME: &str = "Encore";
