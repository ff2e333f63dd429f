//! Room actor: an isolated Tokio task that owns one room.
//!
//! Each room runs in its own task and is reached only through an mpsc
//! channel. A command is handled from start to finish before the next one
//! is looked at, so every read → decide → mutate sequence on a room is
//! exclusive without a lock. Two joins racing for the last seat, or a
//! leave racing a start, are simply two commands in a queue.
//!
//! Timers feed back into the same queue. A firing arrives as a command
//! carrying its [`TimerToken`], and the actor claims it against its timer
//! registries before acting, so a timer cancelled after it fired is
//! ignored.
//!
//! The handlers are split by concern:
//!
//! - `lobby`: join, leave, settings, ready, host transfer
//! - `session`: start and every in-match action, match teardown
//! - `timers`: countdown and escalation timers and their firings

mod lobby;
mod session;
mod timers;

use std::sync::Arc;

use riddlehall_protocol::{
    AnswerAttempt, AnswerStatus, MatchEnd, MatchView, Member, PassReason, ReadyState,
    RoomId, RoomSnapshot, ServerEvent, Topic, UserChannel, UserId,
};
use riddlehall_timer::{TimerRegistry, TimerToken};
use tokio::sync::{mpsc, oneshot};

use crate::hooks::{Puzzle, RoomServices};
use crate::room::Room;
use crate::store::RoomStore;
use crate::{RoomConfig, RoomError, RoomSettings};

pub(crate) use timers::{LobbyTimer, MatchTimer};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What a leave did to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The room emptied and was destroyed.
    RoomDeleted,
    /// The host left and `new_host` took over.
    HostChanged { new_host: UserId },
    /// A non-host player left.
    ParticipantLeft,
}

/// What happens next in a match after a host response or a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Followup {
    /// Guesses are waiting: the host judges this one next and the turn
    /// stays where it is.
    JudgeNext(AnswerAttempt),
    /// The turn moved to this questioner (`None` if nobody is left).
    NextQuestioner(Option<UserId>),
    /// The match is over.
    Ended(MatchEnd),
}

/// Result of a missed host deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEscalation {
    /// The host was warned and has a shorter grace period.
    Warned { warnings: u32 },
    /// The host was removed and the match ended.
    Removed(MatchEnd),
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

/// Commands sent to a room actor through its channel.
///
/// Every client-facing variant carries a `reply` channel; timer firings
/// are fire-and-forget.
pub(crate) enum RoomCommand {
    Join {
        member: Member,
        reply: Reply<RoomSnapshot>,
    },
    Leave {
        user: UserId,
        reply: Reply<LeaveOutcome>,
    },
    UpdateSettings {
        user: UserId,
        capacity: Option<usize>,
        time_limit_minutes: Option<u32>,
        reply: Reply<RoomSettings>,
    },
    UpdatePuzzle {
        user: UserId,
        puzzle: Puzzle,
        reply: Reply<()>,
    },
    ChangeReady {
        user: UserId,
        ready: ReadyState,
        reply: Reply<bool>,
    },
    RequestTransfer {
        user: UserId,
        target: UserId,
        reply: Reply<()>,
    },
    RespondTransfer {
        user: UserId,
        accept: bool,
        reply: Reply<()>,
    },
    Start {
        user: UserId,
        reply: Reply<MatchView>,
    },
    Ask {
        user: UserId,
        text: String,
        reply: Reply<()>,
    },
    RespondQuestion {
        user: UserId,
        status: AnswerStatus,
        reply: Reply<Followup>,
    },
    SubmitGuess {
        user: UserId,
        text: String,
        reply: Reply<AnswerAttempt>,
    },
    JudgeGuess {
        user: UserId,
        attempt: AnswerAttempt,
        status: AnswerStatus,
        reply: Reply<Followup>,
    },
    PassTurn {
        user: UserId,
        reason: PassReason,
        reply: Reply<Followup>,
    },
    ReportHostTimeout {
        user: UserId,
        reply: Reply<HostEscalation>,
    },
    Snapshot {
        viewer: Option<UserId>,
        reply: Reply<RoomSnapshot>,
    },
    MatchView {
        reply: Reply<MatchView>,
    },
    MatchTimerFired {
        timer: MatchTimer,
        token: TimerToken,
    },
    LobbyTimerFired {
        timer: LobbyTimer,
        token: TimerToken,
    },
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Handle to a running room actor.
///
/// Cheap to clone: it is an `mpsc::Sender` plus the room id. If the room
/// has been destroyed, every call fails with [`RoomError::Unavailable`].
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub(crate) fn new(room_id: RoomId, sender: mpsc::Sender<RoomCommand>) -> Self {
        Self { room_id, sender }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Sends a command and waits for its reply.
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(build(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    pub async fn join(&self, member: Member) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Join { member, reply }).await
    }

    pub async fn leave(&self, user: UserId) -> Result<LeaveOutcome, RoomError> {
        self.request(|reply| RoomCommand::Leave { user, reply }).await
    }

    pub async fn update_settings(
        &self,
        user: UserId,
        capacity: Option<usize>,
        time_limit_minutes: Option<u32>,
    ) -> Result<RoomSettings, RoomError> {
        self.request(|reply| RoomCommand::UpdateSettings {
            user,
            capacity,
            time_limit_minutes,
            reply,
        })
        .await
    }

    pub async fn update_puzzle(&self, user: UserId, puzzle: Puzzle) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::UpdatePuzzle {
            user,
            puzzle,
            reply,
        })
        .await
    }

    /// Returns whether the room can start after the change.
    pub async fn change_ready(&self, user: UserId, ready: ReadyState) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::ChangeReady { user, ready, reply })
            .await
    }

    pub async fn request_host_transfer(
        &self,
        user: UserId,
        target: UserId,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::RequestTransfer {
            user,
            target,
            reply,
        })
        .await
    }

    pub async fn respond_host_transfer(&self, user: UserId, accept: bool) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::RespondTransfer {
            user,
            accept,
            reply,
        })
        .await
    }

    pub async fn start(&self, user: UserId) -> Result<MatchView, RoomError> {
        self.request(|reply| RoomCommand::Start { user, reply }).await
    }

    pub async fn ask(&self, user: UserId, text: String) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Ask { user, text, reply })
            .await
    }

    pub async fn respond_question(
        &self,
        user: UserId,
        status: AnswerStatus,
    ) -> Result<Followup, RoomError> {
        self.request(|reply| RoomCommand::RespondQuestion {
            user,
            status,
            reply,
        })
        .await
    }

    pub async fn submit_guess(&self, user: UserId, text: String) -> Result<AnswerAttempt, RoomError> {
        self.request(|reply| RoomCommand::SubmitGuess { user, text, reply })
            .await
    }

    pub async fn judge_guess(
        &self,
        user: UserId,
        attempt: AnswerAttempt,
        status: AnswerStatus,
    ) -> Result<Followup, RoomError> {
        self.request(|reply| RoomCommand::JudgeGuess {
            user,
            attempt,
            status,
            reply,
        })
        .await
    }

    pub async fn pass_turn(&self, user: UserId, reason: PassReason) -> Result<Followup, RoomError> {
        self.request(|reply| RoomCommand::PassTurn {
            user,
            reason,
            reply,
        })
        .await
    }

    pub async fn report_host_timeout(&self, user: UserId) -> Result<HostEscalation, RoomError> {
        self.request(|reply| RoomCommand::ReportHostTimeout { user, reply })
            .await
    }

    /// Current room state. The host (and only the host) sees the answer.
    pub async fn snapshot(&self, viewer: Option<UserId>) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { viewer, reply })
            .await
    }

    pub async fn match_view(&self) -> Result<MatchView, RoomError> {
        self.request(|reply| RoomCommand::MatchView { reply }).await
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The internal room actor state. Runs inside a Tokio task.
pub(crate) struct RoomActor {
    room: Room,
    config: Arc<RoomConfig>,
    store: Arc<RoomStore>,
    services: RoomServices,
    receiver: mpsc::Receiver<RoomCommand>,
    /// Weak so that timers alone never keep a dead room's channel open.
    mailbox: mpsc::WeakSender<RoomCommand>,
    /// Match duration and host escalation.
    match_timers: TimerRegistry<MatchTimer>,
    /// Pre-game countdown.
    lobby_timers: TimerRegistry<LobbyTimer>,
    /// Host the pre-game countdown was armed for.
    countdown_host: Option<UserId>,
}

impl RoomActor {
    /// Runs the actor loop until the room empties or every handle is gone.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room.id, "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle(cmd);

            if self.room.is_empty() {
                self.shut_down();
                break;
            }
            self.publish_listing();
        }

        tracing::info!(room_id = %self.room.id, "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { member, reply } => {
                let _ = reply.send(self.handle_join(member));
            }
            RoomCommand::Leave { user, reply } => {
                let _ = reply.send(self.handle_leave(user));
            }
            RoomCommand::UpdateSettings {
                user,
                capacity,
                time_limit_minutes,
                reply,
            } => {
                let result = self.handle_update_settings(user, capacity, time_limit_minutes);
                let _ = reply.send(result);
            }
            RoomCommand::UpdatePuzzle {
                user,
                puzzle,
                reply,
            } => {
                let _ = reply.send(self.handle_update_puzzle(user, puzzle));
            }
            RoomCommand::ChangeReady { user, ready, reply } => {
                let _ = reply.send(self.handle_change_ready(user, ready));
            }
            RoomCommand::RequestTransfer {
                user,
                target,
                reply,
            } => {
                let _ = reply.send(self.handle_request_transfer(user, target));
            }
            RoomCommand::RespondTransfer {
                user,
                accept,
                reply,
            } => {
                let _ = reply.send(self.handle_respond_transfer(user, accept));
            }
            RoomCommand::Start { user, reply } => {
                let _ = reply.send(self.handle_start(user));
            }
            RoomCommand::Ask { user, text, reply } => {
                let _ = reply.send(self.handle_ask(user, &text));
            }
            RoomCommand::RespondQuestion {
                user,
                status,
                reply,
            } => {
                let _ = reply.send(self.handle_respond_question(user, status));
            }
            RoomCommand::SubmitGuess { user, text, reply } => {
                let _ = reply.send(self.handle_submit_guess(user, &text));
            }
            RoomCommand::JudgeGuess {
                user,
                attempt,
                status,
                reply,
            } => {
                let _ = reply.send(self.handle_judge_guess(user, attempt, status));
            }
            RoomCommand::PassTurn {
                user,
                reason,
                reply,
            } => {
                let _ = reply.send(self.handle_pass_turn(user, reason));
            }
            RoomCommand::ReportHostTimeout { user, reply } => {
                let _ = reply.send(self.handle_report_host_timeout(user));
            }
            RoomCommand::Snapshot { viewer, reply } => {
                let reveal = viewer.is_some_and(|v| self.room.is_host(v));
                let _ = reply.send(Ok(self.room.snapshot(reveal)));
            }
            RoomCommand::MatchView { reply } => {
                let view = self
                    .room
                    .active
                    .as_ref()
                    .map(|game| game.view())
                    .ok_or(RoomError::NoActiveMatch(self.room.id));
                let _ = reply.send(view);
            }
            RoomCommand::MatchTimerFired { timer, token } => {
                self.on_match_timer(timer, token);
            }
            RoomCommand::LobbyTimerFired { timer, token } => {
                self.on_lobby_timer(timer, token);
            }
        }
    }

    /// Removes the empty room from the store and tells the lobby.
    fn shut_down(&mut self) {
        self.match_timers.cancel_all();
        self.lobby_timers.cancel_all();
        self.receiver.close();

        if self.store.destroy(self.room.id) {
            tracing::info!(room_id = %self.room.id, "room destroyed");
            self.broadcast(
                Topic::Lobby,
                ServerEvent::RoomDeleted {
                    room_id: self.room.id,
                },
            );
            self.broadcast(
                Topic::Lobby,
                ServerEvent::RoomListed {
                    rooms: self.store.find_all_sorted(),
                },
            );
        }
    }

    /// Pushes the room's listing to the store, and the lobby if it changed.
    fn publish_listing(&self) {
        if self.store.update_listing(self.room.listing()) {
            self.broadcast(
                Topic::Lobby,
                ServerEvent::RoomListed {
                    rooms: self.store.find_all_sorted(),
                },
            );
        }
    }

    // -- Notification helpers -----------------------------------------------

    fn notify(&self, user: UserId, channel: UserChannel, event: ServerEvent) {
        self.services.notifier.notify_user(user, channel, event);
    }

    fn broadcast(&self, topic: Topic, event: ServerEvent) {
        self.services.notifier.broadcast(topic, event);
    }

    fn to_room(&self, event: ServerEvent) {
        self.broadcast(Topic::Room(self.room.id), event);
    }

    fn to_match(&self, event: ServerEvent) {
        self.broadcast(Topic::Match(self.room.id), event);
    }

    /// Sends the full room state: without the answer to the room topic,
    /// with it to the host.
    fn room_updated(&self) {
        self.to_room(ServerEvent::RoomUpdated {
            room: self.room.snapshot(false),
        });
        if let Some(host) = self.room.host {
            self.notify(
                host,
                UserChannel::Room,
                ServerEvent::RoomUpdated {
                    room: self.room.snapshot(true),
                },
            );
        }
    }
}

/// Spawns a room actor for `room` and returns a handle to it.
///
/// The caller registers the handle with the store; the actor removes it
/// again when the room empties.
pub(crate) fn spawn_room(
    room: Room,
    config: Arc<RoomConfig>,
    store: Arc<RoomStore>,
    services: RoomServices,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let room_id = room.id;

    let actor = RoomActor {
        room,
        config,
        store,
        services,
        receiver: rx,
        mailbox: tx.downgrade(),
        match_timers: TimerRegistry::new("match"),
        lobby_timers: TimerRegistry::new("lobby"),
        countdown_host: None,
    };

    tokio::spawn(actor.run());

    RoomHandle::new(room_id, tx)
}
