//! Room and match coordination for Riddlehall.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! roster, its settings and, while a game is on, its [`Match`]. Every
//! action on a room is a command in that actor's queue, so no two actions
//! on the same room ever interleave.
//!
//! # Key types
//!
//! - [`RoomManager`]: creates rooms and routes every user action
//! - [`RoomStore`]: live rooms, their lobby listings, the user → room index
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`Match`]: turn order, budgets and the guess queue of one game
//! - [`PuzzleResolver`], [`Notifier`], [`StatsSink`]: the outside world
//! - [`RoomConfig`]: id pool, match rules and timing

mod actor;
mod config;
mod error;
mod game;
mod hooks;
mod manager;
mod player;
mod room;
mod store;

pub use actor::{Followup, HostEscalation, LeaveOutcome, RoomHandle};
pub use config::{MatchRules, RoomConfig, RoomSettings, TimingConfig};
pub use error::{ErrorKind, RoomError};
pub use game::{Match, Participant, PendingQuestion, Removal};
pub use hooks::{
    ChannelNotifier, MatchOutcome, MemoryStats, Notifier, Outbound, Puzzle, PuzzleResolver,
    PuzzleShelf, RoomServices, StatsError, StatsSink,
};
pub use manager::RoomManager;
pub use player::Player;
pub use store::RoomStore;
