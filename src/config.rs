//! Driver constants
//!
//! Bus addresses, polling cadence, and value limits for the RDA5807.

/// I2C address for sequential register access.
///
/// Writes start at register 0x2, reads at register 0xA, both with
/// auto-increment.
pub const I2C_SEQUENTIAL_ADDRESS: u8 = 0x10;

/// I2C address for random register access (index-prefixed transfers).
pub const I2C_RANDOM_ACCESS_ADDRESS: u8 = 0x11;

/// Poll interval while a tune operation is in flight, in milliseconds.
///
/// Tuning settles in roughly 10 ms on this chip.
pub const TUNE_POLL_INTERVAL_MS: u32 = 5;

/// Poll interval while a seek operation is in flight, in milliseconds.
///
/// Deliberately coarse: seek takes up to seconds and frequent bus
/// traffic injects audible interference into the front end.
pub const SEEK_POLL_INTERVAL_MS: u32 = 200;

/// Hold time for each phase of the power-up reset pulse, in milliseconds.
pub const RESET_HOLD_MS: u32 = 5;

/// Suggested interval for [`crate::Rda5807::read_rds_group`], in
/// milliseconds. The chip delivers a new group roughly every 87 ms.
pub const RDS_POLL_INTERVAL_MS: u32 = 40;

/// Maximum audio volume.
pub const MAX_VOLUME: u8 = 15;

/// Maximum seek threshold.
pub const MAX_SEEK_THRESHOLD: u8 = 15;

/// Seek threshold in effect after construction.
pub const DEFAULT_SEEK_THRESHOLD: u8 = 8;

/// Program service name length in characters.
pub const PS_NAME_LEN: usize = 8;

/// Radio text capacity in characters.
pub const RADIO_TEXT_LEN: usize = 64;

/// Capacity of the alternative-frequency list.
pub const ALT_FREQ_CAPACITY: usize = 25;
