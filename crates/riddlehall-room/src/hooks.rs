//! Collaborator hooks: where rooms get puzzles from and where their
//! events and results go.
//!
//! The room layer never talks to a database, a language model or a
//! socket. Instead it defines three traits and is handed implementations
//! when the [`RoomManager`](crate::RoomManager) is built:
//!
//! - [`PuzzleResolver`] looks a puzzle up by reference.
//! - [`Notifier`] delivers [`ServerEvent`]s to one user or to a topic.
//! - [`StatsSink`] records who played and who won.
//!
//! In-memory implementations of each live here too. They are what the
//! tests use, and they are enough to run the service without a catalogue
//! or a statistics backend.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use riddlehall_protocol::{
    EndReason, MatchId, PuzzleRef, PuzzleView, RoomId, ServerEvent, Topic, UserChannel,
    UserId,
};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Puzzles
// ---------------------------------------------------------------------------

/// A puzzle as resolved from the catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    pub reference: PuzzleRef,
    pub title: String,
    pub content: String,
    pub answer: String,
    pub creator: UserId,
}

impl Puzzle {
    /// Client-facing view. The answer is included only when `reveal` is set.
    pub fn view(&self, reveal: bool) -> PuzzleView {
        PuzzleView {
            title: self.title.clone(),
            content: self.content.clone(),
            creator: self.creator,
            answer: reveal.then(|| self.answer.clone()),
        }
    }
}

/// Resolves puzzle references against an external catalogue.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because the manager is shared across every
/// task that handles a client action.
pub trait PuzzleResolver: Send + Sync + 'static {
    /// Returns the puzzle, or `None` if the reference does not resolve.
    fn resolve(
        &self,
        reference: &PuzzleRef,
    ) -> impl std::future::Future<Output = Option<Puzzle>> + Send;
}

/// An in-memory puzzle catalogue.
#[derive(Debug, Default)]
pub struct PuzzleShelf {
    puzzles: DashMap<PuzzleRef, Puzzle>,
}

impl PuzzleShelf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a puzzle.
    pub fn insert(&self, puzzle: Puzzle) {
        self.puzzles.insert(puzzle.reference.clone(), puzzle);
    }

    pub fn len(&self) -> usize {
        self.puzzles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.puzzles.is_empty()
    }
}

impl PuzzleResolver for PuzzleShelf {
    async fn resolve(&self, reference: &PuzzleRef) -> Option<Puzzle> {
        self.puzzles.get(reference).map(|entry| entry.value().clone())
    }
}

impl<P: PuzzleResolver> PuzzleResolver for Arc<P> {
    fn resolve(
        &self,
        reference: &PuzzleRef,
    ) -> impl std::future::Future<Output = Option<Puzzle>> + Send {
        (**self).resolve(reference)
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Delivers events to connected clients.
///
/// Delivery is at-most-once from the room's point of view: the room
/// never retries and never waits. Implementations must not block.
pub trait Notifier: Send + Sync + 'static {
    /// Sends an event to a single user.
    fn notify_user(&self, user: UserId, channel: UserChannel, event: ServerEvent);

    /// Sends an event to every subscriber of a topic.
    fn broadcast(&self, topic: Topic, event: ServerEvent);
}

/// One delivery recorded by [`ChannelNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    User {
        user: UserId,
        channel: UserChannel,
        event: ServerEvent,
    },
    Broadcast {
        topic: Topic,
        event: ServerEvent,
    },
}

impl Outbound {
    pub fn event(&self) -> &ServerEvent {
        match self {
            Self::User { event, .. } | Self::Broadcast { event, .. } => event,
        }
    }
}

/// A [`Notifier`] that forwards every delivery into an unbounded channel.
///
/// The transport layer (or a test) drains the receiving end.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Outbound>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify_user(&self, user: UserId, channel: UserChannel, event: ServerEvent) {
        // Nobody listening is not an error for at-most-once delivery.
        let _ = self.sender.send(Outbound::User {
            user,
            channel,
            event,
        });
    }

    fn broadcast(&self, topic: Topic, event: ServerEvent) {
        let _ = self.sender.send(Outbound::Broadcast { topic, event });
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Summary of a finished match handed to the [`StatsSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub room_id: RoomId,
    pub match_id: MatchId,
    pub reason: EndReason,
    /// Everyone who took part, host first.
    pub participants: Vec<UserId>,
    pub winner: Option<UserId>,
}

/// Failure reported by a [`StatsSink`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stats sink failed: {0}")]
pub struct StatsError(pub String);

/// Records match outcomes.
///
/// Best-effort: a failure is logged and otherwise ignored, and match
/// teardown continues regardless.
pub trait StatsSink: Send + Sync + 'static {
    fn record_match_outcome(&self, outcome: &MatchOutcome) -> Result<(), StatsError>;
}

/// A [`StatsSink`] that keeps every outcome in memory.
#[derive(Debug, Default)]
pub struct MemoryStats {
    outcomes: Mutex<Vec<MatchOutcome>>,
}

impl MemoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every outcome recorded so far, oldest first.
    pub fn outcomes(&self) -> Vec<MatchOutcome> {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StatsSink for MemoryStats {
    fn record_match_outcome(&self, outcome: &MatchOutcome) -> Result<(), StatsError> {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(outcome.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RoomServices
// ---------------------------------------------------------------------------

/// The collaborators every room actor talks to.
///
/// Cheap to clone; each actor gets its own copy.
#[derive(Clone)]
pub struct RoomServices {
    pub notifier: Arc<dyn Notifier>,
    pub stats: Arc<dyn StatsSink>,
}

impl RoomServices {
    pub fn new(notifier: Arc<dyn Notifier>, stats: Arc<dyn StatsSink>) -> Self {
        Self { notifier, stats }
    }
}
