//! # Riddlehall
//!
//! Room and match coordination for party deduction games.
//!
//! A host picks a puzzle and opens a room. Players join, ready up and take
//! turns asking the host yes/no questions or submitting guesses, while the
//! host answers and judges. Riddlehall owns the rooms, the turn order, the
//! budgets and every timer; the embedding service supplies puzzles, delivers
//! events and records outcomes through the hooks in [`prelude`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use riddlehall::prelude::*;
//!
//! # async fn run() -> Result<(), RiddlehallError> {
//! let config = HallConfig::load()?;
//! riddlehall::telemetry::init(config.log_filter());
//!
//! let (notifier, _events) = ChannelNotifier::new();
//! let rooms = Riddlehall::builder()
//!     .config(config)
//!     .build(PuzzleShelf::new(), notifier)?;
//!
//! let listings = rooms.list_rooms();
//! # let _ = listings;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
mod hall;
pub mod telemetry;

pub use config::{ConfigError, HallConfig};
pub use error::RiddlehallError;
pub use hall::{HallBuilder, LogStats, Riddlehall};

pub use riddlehall_protocol as protocol;
pub use riddlehall_room as room;

/// The types most embedders need.
pub mod prelude {
    pub use crate::{
        ConfigError, HallBuilder, HallConfig, LogStats, Riddlehall, RiddlehallError,
    };
    pub use riddlehall_protocol::{
        AnswerAttempt, AnswerStatus, EndReason, MatchEnd, MatchId, MatchView, Member,
        PassReason, PuzzleRef, ReadyState, RoomId, RoomListing, RoomSnapshot, RoomState,
        ServerEvent, Topic, UserChannel, UserId,
    };
    pub use riddlehall_room::{
        ChannelNotifier, ErrorKind, LeaveOutcome, MemoryStats, Notifier, Outbound, Puzzle,
        PuzzleResolver, PuzzleShelf, RoomConfig, RoomError, RoomManager, RoomSettings,
        StatsSink,
    };
}
