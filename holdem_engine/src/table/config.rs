//! Table configuration models.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::TableError;
use crate::game::{
    constants,
    entities::{Blinds, Chips},
};

/// Table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Small blind amount
    pub small_blind: Chips,

    /// Big blind amount
    pub big_blind: Chips,

    /// Chips a player sits down with
    pub starting_stack: Chips,

    /// Number of seats (2..=23)
    pub max_seats: usize,

    /// Seconds a seat has to act before the clock acts for it
    pub turn_timeout_secs: u64,

    /// Pause between hands; `None` waits for a manual start
    pub next_hand_delay_secs: Option<u64>,

    /// Capacity of the actor inbox
    pub inbox_capacity: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            small_blind: constants::DEFAULT_SMALL_BLIND,
            big_blind: constants::DEFAULT_BIG_BLIND,
            starting_stack: constants::DEFAULT_STARTING_STACK,
            max_seats: constants::DEFAULT_MAX_SEATS,
            turn_timeout_secs: constants::DEFAULT_TURN_TIMEOUT_SECS,
            next_hand_delay_secs: Some(constants::DEFAULT_NEXT_HAND_DELAY_SECS),
            inbox_capacity: 100,
        }
    }
}

impl TableConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), TableError> {
        if self.small_blind == 0 {
            return Err(TableError::InvalidConfig(
                "Small blind must be positive".to_string(),
            ));
        }

        if self.big_blind < self.small_blind {
            return Err(TableError::InvalidConfig(
                "Big blind must be at least the small blind".to_string(),
            ));
        }

        if self.starting_stack == 0 {
            return Err(TableError::InvalidConfig(
                "Starting stack must be positive".to_string(),
            ));
        }

        if !(constants::MIN_SEATS..=constants::MAX_SEATS).contains(&self.max_seats) {
            return Err(TableError::InvalidConfig(format!(
                "Max seats must be between {} and {}",
                constants::MIN_SEATS,
                constants::MAX_SEATS
            )));
        }

        // Every seat filled with a starting stack must fit in `Chips`.
        let table_chips = u64::from(self.starting_stack) * self.max_seats as u64;
        if table_chips > u64::from(Chips::MAX) {
            return Err(TableError::InvalidConfig(format!(
                "Starting stack times max seats must not exceed {}",
                Chips::MAX
            )));
        }

        if !(1..=constants::MAX_TURN_TIMEOUT_SECS).contains(&self.turn_timeout_secs) {
            return Err(TableError::InvalidConfig(format!(
                "Turn timeout must be between 1 and {} seconds",
                constants::MAX_TURN_TIMEOUT_SECS
            )));
        }

        if self
            .next_hand_delay_secs
            .is_some_and(|secs| secs > constants::MAX_NEXT_HAND_DELAY_SECS)
        {
            return Err(TableError::InvalidConfig(format!(
                "Next hand delay must not exceed {} seconds",
                constants::MAX_NEXT_HAND_DELAY_SECS
            )));
        }

        if self.inbox_capacity == 0 {
            return Err(TableError::InvalidConfig(
                "Inbox capacity must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub fn blinds(&self) -> Blinds {
        Blinds {
            small: self.small_blind,
            big: self.big_blind,
        }
    }

    pub fn turn_timeout(&self) -> Duration {
        Duration::from_secs(self.turn_timeout_secs)
    }

    pub fn next_hand_delay(&self) -> Option<Duration> {
        self.next_hand_delay_secs.map(Duration::from_secs)
    }
}
