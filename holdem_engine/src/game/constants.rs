//! Table-wide limits and defaults.

use super::entities::Chips;

/// Largest table a single deck can serve: 2 hole cards per seat plus the
/// five community cards must fit in 52 cards.
pub const MAX_SEATS: usize = 23;

/// Smallest table a hand can be played at.
pub const MIN_SEATS: usize = 2;

pub const DEFAULT_MAX_SEATS: usize = 9;
pub const DEFAULT_SMALL_BLIND: Chips = 25;
pub const DEFAULT_BIG_BLIND: Chips = 50;
pub const DEFAULT_STARTING_STACK: Chips = 5000;
pub const DEFAULT_TURN_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_NEXT_HAND_DELAY_SECS: u64 = 5;

/// Longest turn clock and pause between hands a table accepts.
pub const MAX_TURN_TIMEOUT_SECS: u64 = 3600;
pub const MAX_NEXT_HAND_DELAY_SECS: u64 = 3600;

/// Display names and avatars are truncated to this many characters.
pub const MAX_USER_INPUT_LENGTH: usize = 32;

/// Number of community cards dealt by the time of showdown.
pub const BOARD_SIZE: usize = 5;

/// Number of private cards dealt to each active seat.
pub const HOLE_CARDS: usize = 2;
