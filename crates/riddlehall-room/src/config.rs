//! Room settings and service-wide room configuration.

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::RoomError;

// ---------------------------------------------------------------------------
// RoomSettings
// ---------------------------------------------------------------------------

/// Per-room settings chosen by the host.
///
/// Both fields can be changed while the room is in the lobby. Capacity
/// can never drop below the number of players already in the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    /// Maximum number of players, host included.
    pub capacity: usize,
    /// Length of a match in minutes.
    pub time_limit_minutes: u32,
}

impl RoomSettings {
    pub const MIN_CAPACITY: usize = 2;
    pub const MAX_CAPACITY: usize = 6;

    /// Builds validated settings.
    pub fn new(capacity: usize, time_limit_minutes: u32) -> Result<Self, RoomError> {
        let settings = Self {
            capacity,
            time_limit_minutes,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Checks both fields against their allowed ranges.
    pub fn validate(&self) -> Result<(), RoomError> {
        if !(Self::MIN_CAPACITY..=Self::MAX_CAPACITY).contains(&self.capacity) {
            return Err(RoomError::CapacityOutOfRange(self.capacity));
        }
        if self.time_limit_minutes == 0 {
            return Err(RoomError::TimeLimitOutOfRange(self.time_limit_minutes));
        }
        Ok(())
    }

    /// How long a match may run before it ends with `TIMEOUT`.
    pub fn match_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.time_limit_minutes) * 60)
    }
}

// ---------------------------------------------------------------------------
// MatchRules
// ---------------------------------------------------------------------------

/// Budgets and strike limits applied to every match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchRules {
    /// Questions the whole table may ask per match.
    pub question_budget: u32,
    /// Guess attempts per participant. The shared guess budget starts at
    /// this times the number of participants.
    pub guesses_per_player: u32,
    /// Consecutive timed-out turns after which a questioner is removed.
    pub questioner_strikes: u32,
    /// Consecutive missed prompts after which the host is removed.
    pub host_strikes: u32,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            question_budget: 30,
            guesses_per_player: 3,
            questioner_strikes: 2,
            host_strikes: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// TimingConfig
// ---------------------------------------------------------------------------

/// Delays for the lobby countdown and the host escalation.
///
/// Stored as whole seconds so the JSON form stays readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// After everyone is ready, how long until the host is warned.
    pub start_warning_secs: u64,
    /// After everyone is ready, how long until the host is removed.
    pub start_timeout_secs: u64,
    /// How long the host has to answer a question or judge a guess.
    pub host_response_secs: u64,
    /// How long the host has after a warning.
    pub host_grace_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            start_warning_secs: 150,
            start_timeout_secs: 180,
            host_response_secs: 60,
            host_grace_secs: 30,
        }
    }
}

impl TimingConfig {
    pub fn start_warning(&self) -> Duration {
        Duration::from_secs(self.start_warning_secs)
    }

    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    pub fn host_response(&self) -> Duration {
        Duration::from_secs(self.host_response_secs)
    }

    pub fn host_grace(&self) -> Duration {
        Duration::from_secs(self.host_grace_secs)
    }
}

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Service-wide configuration shared by every room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Lowest room id handed out.
    pub first_room_id: u64,
    /// Highest room id handed out.
    pub last_room_id: u64,
    /// Capacity of each room actor's command channel.
    pub channel_size: usize,
    pub rules: MatchRules,
    pub timing: TimingConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            first_room_id: 100,
            last_room_id: 999,
            channel_size: 64,
            rules: MatchRules::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl RoomConfig {
    /// The ids the room store may allocate.
    pub fn room_ids(&self) -> RangeInclusive<u64> {
        self.first_room_id..=self.last_room_id
    }
}
