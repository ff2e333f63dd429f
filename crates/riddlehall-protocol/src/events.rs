//! Typed events handed to the notification sink.
//!
//! Every state change a room makes is described by one [`ServerEvent`]
//! variant with a fixed payload. The sink decides how to deliver it; the
//! room layer only decides *what* happened and *who* should hear about it
//! (see [`Topic`](crate::Topic) and [`UserChannel`](crate::UserChannel)).
//!
//! `#[serde(tag = "type")]` gives internally tagged JSON, so a join looks
//! like `{"type":"PLAYER_JOINED","room_id":101,"user":{...}}`.

use serde::{Deserialize, Serialize};

use crate::{
    AnswerAttempt, EndReason, Member, MatchId, PlayerRole, QnaEntry, ReadyState,
    RemovalReason, RoomId, RoomState, UserId,
};

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A lobby player as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub user: UserId,
    pub nickname: String,
    pub role: PlayerRole,
    pub ready: ReadyState,
}

/// The selected puzzle as shown to clients.
///
/// `answer` is only filled in for the host and for the end-of-match
/// reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleView {
    pub title: String,
    pub content: String,
    pub creator: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

/// Full state of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub state: RoomState,
    pub capacity: usize,
    pub time_limit_minutes: u32,
    pub host: Option<UserId>,
    pub puzzle: Option<PuzzleView>,
    /// Players in join order.
    pub players: Vec<PlayerView>,
    pub pending_transfer: Option<UserId>,
}

impl RoomSnapshot {
    /// Looks up a player by id.
    pub fn player(&self, user: UserId) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.user == user)
    }
}

/// One line of the lobby's room list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomListing {
    pub room_id: RoomId,
    pub state: RoomState,
    pub host_nickname: Option<String>,
    pub player_count: usize,
    pub capacity: usize,
    pub time_limit_minutes: u32,
    pub puzzle_title: Option<String>,
}

/// Live state of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchView {
    pub match_id: MatchId,
    pub host: UserId,
    pub questioner: Option<UserId>,
    pub turn_order: Vec<UserId>,
    pub remaining_questions: u32,
    pub remaining_guesses: u32,
    pub pending_guesses: usize,
    pub history: Vec<QnaEntry>,
}

/// Final result of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEnd {
    pub match_id: MatchId,
    pub reason: EndReason,
    pub winner: Option<UserId>,
    /// The player whose forced removal ended the match, if any.
    #[serde(default)]
    pub forced_out: Option<UserId>,
    pub answer: Option<String>,
    pub play_time_secs: u64,
    pub history: Vec<QnaEntry>,
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// Everything the room layer can tell the outside world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    // -- Lobby topic --------------------------------------------------------
    /// Current list of rooms, sorted by state then id.
    RoomListed { rooms: Vec<RoomListing> },

    /// A room emptied out and was destroyed.
    RoomDeleted { room_id: RoomId },

    // -- Room topic ---------------------------------------------------------
    /// Full room state after any lobby change.
    RoomUpdated { room: RoomSnapshot },

    PlayerJoined { room_id: RoomId, user: Member },

    PlayerLeft { room_id: RoomId, user: UserId },

    HostChanged {
        room_id: RoomId,
        previous: Option<UserId>,
        host: UserId,
    },

    SettingsUpdated {
        room_id: RoomId,
        capacity: usize,
        time_limit_minutes: u32,
    },

    PuzzleChanged { room_id: RoomId, title: String },

    ReadyChanged {
        room_id: RoomId,
        user: UserId,
        ready: ReadyState,
        can_start: bool,
    },

    HostTransferRequested {
        room_id: RoomId,
        from: UserId,
        to: UserId,
    },

    HostTransferResolved {
        room_id: RoomId,
        from: UserId,
        to: UserId,
        accepted: bool,
    },

    /// Everyone is ready but the host has not started yet.
    StartCountdownWarning {
        room_id: RoomId,
        host: UserId,
        remaining_secs: u64,
    },

    /// The host never started; they are being removed.
    StartCountdownExpired { room_id: RoomId, host: UserId },

    /// Sent once the match is over and the room is a lobby again.
    ReturnedToLobby { room: RoomSnapshot },

    // -- Match topic --------------------------------------------------------
    MatchStarted { room_id: RoomId, game: MatchView },

    QuestionAsked {
        room_id: RoomId,
        asker: UserId,
        text: String,
    },

    QuestionAnswered {
        room_id: RoomId,
        entry: QnaEntry,
        remaining_questions: u32,
    },

    /// A guess joined the queue. The text goes to the host only.
    GuessSubmitted {
        room_id: RoomId,
        user: UserId,
        queued: usize,
    },

    /// The guess the host must judge next (host only).
    GuessToJudge {
        room_id: RoomId,
        attempt: AnswerAttempt,
    },

    GuessJudged {
        room_id: RoomId,
        entry: QnaEntry,
        remaining_guesses: u32,
    },

    TurnChanged {
        room_id: RoomId,
        questioner: Option<UserId>,
    },

    /// A participant left the match.
    RosterChanged {
        room_id: RoomId,
        removed: UserId,
        turn_order: Vec<UserId>,
        remaining_guesses: u32,
    },

    /// The host missed a prompt deadline.
    HostWarning {
        room_id: RoomId,
        warnings: u32,
        grace_secs: u64,
    },

    MatchEnded { room_id: RoomId, result: MatchEnd },

    // -- Point-to-point -----------------------------------------------------
    /// The receiving user was removed from the room or match.
    ForcedOut {
        room_id: RoomId,
        reason: RemovalReason,
    },
}
