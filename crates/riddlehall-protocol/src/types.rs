//! Core vocabulary types for Riddlehall.
//!
//! This module defines every identifier, enum and record that the room
//! layer hands to its callers or to the notification sink. Anything that
//! ends up inside an event payload lives here so that the room crate and
//! whatever pushes events to clients agree on one shape.
//!
//! Enums serialize as `SCREAMING_SNAKE_CASE` strings (`"QUESTIONER"`,
//! `"CORRECT_ANSWER"`), which is the form clients send and receive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a user.
///
/// This is a "newtype wrapper" around `u64`. You can't accidentally pass a
/// `RoomId` where a `UserId` is expected even though both are numbers
/// underneath.
///
/// `#[serde(transparent)]` serializes this as the bare inner number, so
/// `UserId(42)` becomes `42` in JSON rather than `{ "0": 42 }`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// `tracing::info!(%user_id, "joined")` prints "U-42".
impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A short numeric room identifier drawn from a bounded pool.
///
/// Room ids are recycled: once a room is destroyed its id goes back to
/// the pool and a later room may receive it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// Identifies one match inside a room.
///
/// Match ids are only unique within their room; they count up every
/// time the room starts a new game. Timer callbacks carry the id of the
/// match that armed them so a callback can tell whether the match it
/// targets is still the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub u64);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{}", self.0)
    }
}

/// Opaque reference to a puzzle in the external catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PuzzleRef(pub String);

impl PuzzleRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PuzzleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user as the room layer sees them: id plus display name.
///
/// Authentication happens upstream; by the time a `Member` reaches a room
/// its id is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,
    pub nickname: String,
}

impl Member {
    pub fn new(id: UserId, nickname: impl Into<String>) -> Self {
        Self {
            id,
            nickname: nickname.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lobby enums
// ---------------------------------------------------------------------------

/// The role a user plays, in the lobby or in a match.
///
/// In the lobby only `Host` and `Participant` appear. During a match the
/// participant whose turn it is to ask is the `Questioner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerRole {
    Host,
    Participant,
    Questioner,
}

impl fmt::Display for PlayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "HOST"),
            Self::Participant => write!(f, "PARTICIPANT"),
            Self::Questioner => write!(f, "QUESTIONER"),
        }
    }
}

/// Lobby readiness of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadyState {
    Ready,
    Waiting,
}

impl ReadyState {
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "READY"),
            Self::Waiting => write!(f, "WAITING"),
        }
    }
}

impl FromStr for ReadyState {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "READY" => Ok(Self::Ready),
            "WAITING" => Ok(Self::Waiting),
            _ => Err(ProtocolError::unknown("ready state", s)),
        }
    }
}

/// The lifecycle state of a room.
///
/// ```text
/// Waiting ──start──▶ Starting ──match built──▶ Playing ──match ends──▶ Waiting
///                       │
///                       └──construction failed──▶ Waiting
/// ```
///
/// - **Waiting**: lobby. Players join, leave, ready up, change settings.
/// - **Starting**: a start request is building the match. Any other start
///   request observed here is rejected.
/// - **Playing**: a match is live.
///
/// The declaration order is also the sort order used by room listings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomState {
    Waiting,
    Starting,
    Playing,
}

impl RoomState {
    /// Returns `true` if the room accepts new players and lobby actions.
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Waiting)
    }

    /// Returns `true` if transitioning to `target` is a legal move.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Waiting, Self::Starting)
                | (Self::Starting, Self::Playing)
                | (Self::Starting, Self::Waiting)
                | (Self::Playing, Self::Waiting)
        )
    }
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "WAITING"),
            Self::Starting => write!(f, "STARTING"),
            Self::Playing => write!(f, "PLAYING"),
        }
    }
}

impl FromStr for RoomState {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "WAITING" => Ok(Self::Waiting),
            "STARTING" => Ok(Self::Starting),
            "PLAYING" => Ok(Self::Playing),
            _ => Err(ProtocolError::unknown("room state", s)),
        }
    }
}

// ---------------------------------------------------------------------------
// Match enums
// ---------------------------------------------------------------------------

/// How the host rated a question or a guess.
///
/// Questions are answered with `Yes`, `No` or `Irrelevant`. Guesses are
/// judged `Correct` or `Incorrect`. `Pending` marks a guess that has been
/// submitted but not judged yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnswerStatus {
    Yes,
    No,
    Irrelevant,
    Correct,
    Incorrect,
    Pending,
}

impl AnswerStatus {
    /// Returns `true` for statuses a host may give to a question.
    pub fn answers_question(self) -> bool {
        matches!(self, Self::Yes | Self::No | Self::Irrelevant)
    }

    /// Returns `true` for statuses a host may give to a guess.
    pub fn judges_guess(self) -> bool {
        matches!(self, Self::Correct | Self::Incorrect)
    }
}

impl fmt::Display for AnswerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yes => write!(f, "YES"),
            Self::No => write!(f, "NO"),
            Self::Irrelevant => write!(f, "IRRELEVANT"),
            Self::Correct => write!(f, "CORRECT"),
            Self::Incorrect => write!(f, "INCORRECT"),
            Self::Pending => write!(f, "PENDING"),
        }
    }
}

impl FromStr for AnswerStatus {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "YES" => Ok(Self::Yes),
            "NO" => Ok(Self::No),
            "IRRELEVANT" => Ok(Self::Irrelevant),
            "CORRECT" => Ok(Self::Correct),
            "INCORRECT" => Ok(Self::Incorrect),
            "PENDING" => Ok(Self::Pending),
            _ => Err(ProtocolError::unknown("answer status", s)),
        }
    }
}

/// What kind of entry a log line records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    Question,
    Guess,
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndReason {
    /// A guess was judged correct.
    CorrectAnswer,
    /// The shared guess budget ran out.
    ExhaustedAttempts,
    /// Every participant left; only the host remains.
    OnlyHost,
    /// The host left or was removed.
    LeaveHost,
    /// The match ran past its time limit.
    Timeout,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CorrectAnswer => write!(f, "CORRECT_ANSWER"),
            Self::ExhaustedAttempts => write!(f, "EXHAUSTED_ATTEMPTS"),
            Self::OnlyHost => write!(f, "ONLY_HOST"),
            Self::LeaveHost => write!(f, "LEAVE_HOST"),
            Self::Timeout => write!(f, "TIMEOUT"),
        }
    }
}

/// Why a questioner gave up their turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassReason {
    /// The client's question timer ran out. Counts as a strike.
    Timeout,
    /// The player chose to pass.
    Manual,
}

impl FromStr for PassReason {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TIMEOUT" => Ok(Self::Timeout),
            "MANUAL" => Ok(Self::Manual),
            _ => Err(ProtocolError::unknown("pass reason", s)),
        }
    }
}

/// Why a user was removed without asking to leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemovalReason {
    /// A questioner let their turn time out too many times in a row.
    QuestionerTimeout,
    /// The host left prompts unanswered past the grace period.
    HostTimeout,
    /// The host never started a room in which everyone was ready.
    StartTimeout,
}

// ---------------------------------------------------------------------------
// Match records
// ---------------------------------------------------------------------------

/// One judged line in the match log.
///
/// Entries are appended once judged and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QnaEntry {
    pub kind: EntryKind,
    pub asker: UserId,
    pub text: String,
    pub status: AnswerStatus,
}

/// A guess waiting in the queue for the host's judgment.
///
/// The host echoes the `(user, text)` pair back when judging. The room
/// compares it with the head of the queue so a judgment can never apply
/// to a guess other than the one the host was shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerAttempt {
    pub user: UserId,
    pub text: String,
}

impl AnswerAttempt {
    pub fn new(user: UserId, text: impl Into<String>) -> Self {
        Self {
            user,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Addressing
// ---------------------------------------------------------------------------

/// A broadcast topic.
///
/// Everyone browsing rooms subscribes to `Lobby`. Everyone in a room
/// subscribes to that room's `Room` topic, and to its `Match` topic while
/// a game is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "topic", content = "room_id", rename_all = "snake_case")]
pub enum Topic {
    Lobby,
    Room(RoomId),
    Match(RoomId),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "lobby"),
            Self::Room(id) => write!(f, "room/{}", id.0),
            Self::Match(id) => write!(f, "match/{}", id.0),
        }
    }
}

/// A per-user queue for point-to-point events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserChannel {
    /// Lobby-side prompts: host transfer requests, countdown warnings.
    Room,
    /// Match-side prompts: questions and guesses for the host to handle.
    Match,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&UserId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_id_display() {
        assert_eq!(UserId(7).to_string(), "U-7");
        assert_eq!(RoomId(101).to_string(), "R-101");
        assert_eq!(MatchId(3).to_string(), "M-3");
    }

    #[test]
    fn test_puzzle_ref_is_transparent() {
        let json = serde_json::to_string(&PuzzleRef::new("p-9")).unwrap();
        assert_eq!(json, "\"p-9\"");
    }

    #[test]
    fn test_enums_serialize_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&EndReason::CorrectAnswer).unwrap(),
            "\"CORRECT_ANSWER\""
        );
        assert_eq!(
            serde_json::to_string(&PlayerRole::Questioner).unwrap(),
            "\"QUESTIONER\""
        );
        assert_eq!(
            serde_json::to_string(&RemovalReason::StartTimeout).unwrap(),
            "\"START_TIMEOUT\""
        );
    }

    #[test]
    fn test_display_matches_wire_form() {
        for status in [
            AnswerStatus::Yes,
            AnswerStatus::Irrelevant,
            AnswerStatus::Incorrect,
        ] {
            let wire = serde_json::to_string(&status).unwrap();
            assert_eq!(wire, format!("\"{status}\""));
        }
        assert_eq!(EndReason::LeaveHost.to_string(), "LEAVE_HOST");
    }

    #[test]
    fn test_answer_status_from_str_is_case_insensitive() {
        assert_eq!("yes".parse::<AnswerStatus>().unwrap(), AnswerStatus::Yes);
        assert_eq!(
            "Incorrect".parse::<AnswerStatus>().unwrap(),
            AnswerStatus::Incorrect
        );
    }

    #[test]
    fn test_from_str_rejects_unknown_values() {
        let err = "maybe".parse::<AnswerStatus>().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnknownVariant { kind: "answer status", .. }
        ));
        assert!("later".parse::<PassReason>().is_err());
        assert!("ready-ish".parse::<ReadyState>().is_err());
        assert!("FINISHED".parse::<RoomState>().is_err());
    }

    #[test]
    fn test_answer_status_partitions() {
        assert!(AnswerStatus::Irrelevant.answers_question());
        assert!(!AnswerStatus::Correct.answers_question());
        assert!(AnswerStatus::Incorrect.judges_guess());
        assert!(!AnswerStatus::Pending.judges_guess());
        assert!(!AnswerStatus::Pending.answers_question());
    }

    #[test]
    fn test_room_state_transitions() {
        assert!(RoomState::Waiting.can_transition_to(RoomState::Starting));
        assert!(RoomState::Starting.can_transition_to(RoomState::Playing));
        assert!(RoomState::Starting.can_transition_to(RoomState::Waiting));
        assert!(RoomState::Playing.can_transition_to(RoomState::Waiting));
        assert!(!RoomState::Waiting.can_transition_to(RoomState::Playing));
        assert!(!RoomState::Playing.can_transition_to(RoomState::Starting));
    }

    #[test]
    fn test_room_state_orders_waiting_first() {
        let mut states = vec![RoomState::Playing, RoomState::Waiting, RoomState::Starting];
        states.sort();
        assert_eq!(
            states,
            vec![RoomState::Waiting, RoomState::Starting, RoomState::Playing]
        );
        assert!(RoomState::Waiting.is_joinable());
        assert!(!RoomState::Playing.is_joinable());
    }

    #[test]
    fn test_topic_json_format() {
        let json = serde_json::to_value(Topic::Match(RoomId(120))).unwrap();
        assert_eq!(json["topic"], "match");
        assert_eq!(json["room_id"], 120);
        let lobby = serde_json::to_value(Topic::Lobby).unwrap();
        assert_eq!(lobby["topic"], "lobby");
    }

    #[test]
    fn test_topic_display() {
        assert_eq!(Topic::Lobby.to_string(), "lobby");
        assert_eq!(Topic::Room(RoomId(5)).to_string(), "room/5");
    }
}
