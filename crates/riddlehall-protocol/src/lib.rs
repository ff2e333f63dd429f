//! Shared vocabulary for Riddlehall.
//!
//! This crate defines the "language" every other layer speaks:
//!
//! - **Types** ([`UserId`], [`RoomId`], [`RoomState`], [`AnswerStatus`],
//!   [`QnaEntry`], etc.): identifiers, lobby and match enums, and the
//!   records that appear in the match log.
//! - **Events** ([`ServerEvent`] and its view structs): the typed payloads
//!   handed to the notification sink.
//! - **Errors** ([`ProtocolError`]): what can go wrong when parsing
//!   client-supplied enum values.
//!
//! It knows nothing about rooms, locks or timers. It only describes
//! values.

mod error;
mod events;
mod types;

pub use error::ProtocolError;
pub use events::{
    MatchEnd, MatchView, PlayerView, PuzzleView, RoomListing, RoomSnapshot,
    ServerEvent,
};
pub use types::{
    AnswerAttempt, AnswerStatus, EndReason, EntryKind, MatchId, Member,
    PassReason, PlayerRole, PuzzleRef, QnaEntry, ReadyState, RemovalReason,
    RoomId, RoomState, Topic, UserChannel, UserId,
};
