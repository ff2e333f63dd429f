//! Error types for the room layer.

use riddlehall_protocol::{AnswerStatus, PuzzleRef, RoomId, RoomState, UserId};

/// Broad class of a [`RoomError`].
///
/// No room operation mutates state before failing, so every class means
/// "nothing happened". The class tells the caller whether retrying can
/// help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request is invalid in the current state (wrong role, wrong
    /// turn, out-of-range value).
    Validation,
    /// A budget is used up.
    Exhausted,
    /// A race was lost (stale guess, empty pool, room shut down). The
    /// caller may retry.
    Consistency,
}

/// Errors that can occur during room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    // -- Store --------------------------------------------------------------
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("no room ids left to allocate")]
    PoolExhausted,

    #[error("puzzle {0} not found")]
    PuzzleNotFound(PuzzleRef),

    /// The room's command channel is closed, usually because the room was
    /// destroyed while the request was in flight.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),

    // -- Membership ---------------------------------------------------------
    /// The room is not in the lobby or is full.
    #[error("room {0} cannot be joined")]
    RoomNotJoinable(RoomId),

    #[error("user {0} already in room {1}")]
    AlreadyJoined(UserId, RoomId),

    #[error("user {0} not in room {1}")]
    NotInRoom(UserId, RoomId),

    #[error("user {0} is not in any room")]
    NotInAnyRoom(UserId),

    #[error("user {0} is not the host")]
    NotHost(UserId),

    // -- Lobby --------------------------------------------------------------
    /// Settings can only change in the lobby.
    #[error("settings are locked while the room is {0}")]
    SettingsLocked(RoomState),

    /// A lobby-only action was attempted outside the lobby.
    #[error("room is {0}, lobby actions are closed")]
    NotWaiting(RoomState),

    #[error("no settings change requested")]
    NothingToUpdate,

    #[error("capacity {requested} is below the {current} players present")]
    CapacityTooLow { requested: usize, current: usize },

    #[error("capacity {0} is outside 2..=6")]
    CapacityOutOfRange(usize),

    #[error("time limit of {0} minutes is invalid")]
    TimeLimitOutOfRange(u32),

    #[error("a host transfer to {0} is already pending")]
    TransferAlreadyPending(UserId),

    #[error("no host transfer is pending")]
    NoPendingTransfer,

    #[error("user {0} is not the transfer target")]
    NotTransferTarget(UserId),

    #[error("user {0} cannot receive the host role")]
    InvalidTransferTarget(UserId),

    // -- Match start --------------------------------------------------------
    #[error("no puzzle selected")]
    NoPuzzleSelected,

    #[error("{0} players present, at least 2 needed")]
    NotEnoughPlayers(usize),

    #[error("not every player is ready")]
    PlayersNotReady,

    #[error("match is already starting")]
    AlreadyStarting,

    #[error("match is already playing")]
    AlreadyPlaying,

    #[error("match setup failed: {0}")]
    MatchSetup(String),

    // -- Match play ---------------------------------------------------------
    #[error("room {0} has no active match")]
    NoActiveMatch(RoomId),

    #[error("user {0} is not the current questioner")]
    NotYourTurn(UserId),

    #[error("no questions left in this match")]
    NoQuestionsLeft,

    #[error("no guesses left in this match")]
    NoGuessesLeft,

    #[error("a question is already waiting for the host")]
    QuestionPending,

    #[error("no question is waiting for the host")]
    NoPendingQuestion,

    #[error("host is not waiting on any prompt")]
    HostNotAwaited,

    #[error("status {0} is not valid here")]
    InvalidStatus(AnswerStatus),

    #[error("user {0} is not a participant in this match")]
    NotParticipant(UserId),

    #[error("user {0} has no guess attempts left")]
    AttemptsExhausted(UserId),

    /// The judged guess is not the head of the queue.
    #[error("guess is not the next one awaiting judgment")]
    StaleOrInvalidGuess,

    #[error("text must not be empty")]
    EmptyText,
}

impl RoomError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoQuestionsLeft | Self::NoGuessesLeft | Self::AttemptsExhausted(_) => {
                ErrorKind::Exhausted
            }
            Self::PoolExhausted
            | Self::Unavailable(_)
            | Self::StaleOrInvalidGuess
            | Self::AlreadyStarting
            | Self::AlreadyPlaying => ErrorKind::Consistency,
            _ => ErrorKind::Validation,
        }
    }
}
