pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
/// Sentinel prev-hash carried by the genesis block.
pub const GENESIS_PREV_HASH: &str = "0";
pub const DEFAULT_DIFFICULTY: usize = 2;
/// Wall-clock capture format for block timestamps (UTC).
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S";
