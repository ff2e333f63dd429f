//! Room timers: the pre-game countdown, the match clock and host
//! escalation.
//!
//! Every timer fires by sending a command back into the actor's own
//! channel. The actor then claims the firing against its registry; a
//! firing whose token no longer matches was cancelled or replaced while
//! it sat in the queue, and is dropped. Match timers also carry their
//! match id, so a firing for a finished match never touches the next one.

use std::time::Duration;

use riddlehall_protocol::{EndReason, MatchId, RemovalReason, ServerEvent, UserChannel};
use riddlehall_timer::TimerToken;

use super::{HostEscalation, RoomActor, RoomCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum MatchTimer {
    /// The match time limit.
    Duration(MatchId),
    /// The host owes an answer or a judgment.
    HostResponse(MatchId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum LobbyTimer {
    /// Everyone is ready and the host has not started yet.
    StartWarning,
    /// The host still has not started and is removed.
    StartTimeout,
}

impl RoomActor {
    // -- Arming -------------------------------------------------------------

    pub(super) fn arm_match_timer(&mut self, timer: MatchTimer, delay: Duration) {
        let mailbox = self.mailbox.clone();
        self.match_timers.schedule(timer, delay, move |token| async move {
            if let Some(sender) = mailbox.upgrade() {
                let _ = sender
                    .send(RoomCommand::MatchTimerFired { timer, token })
                    .await;
            }
        });
    }

    fn arm_lobby_timer(&mut self, timer: LobbyTimer, delay: Duration) {
        let mailbox = self.mailbox.clone();
        self.lobby_timers.schedule(timer, delay, move |token| async move {
            if let Some(sender) = mailbox.upgrade() {
                let _ = sender
                    .send(RoomCommand::LobbyTimerFired { timer, token })
                    .await;
            }
        });
    }

    // -- Pre-game countdown -------------------------------------------------

    /// Arms the countdown while the room can start, and cancels it as
    /// soon as it can't. An already running countdown for the same host
    /// keeps its deadline.
    pub(super) fn refresh_lobby_timers(&mut self) {
        if !self.room.can_start() {
            self.cancel_countdown();
            return;
        }
        if self.countdown_host == self.room.host
            && self.lobby_timers.is_armed(&LobbyTimer::StartTimeout)
        {
            return;
        }

        let timing = self.config.timing;
        self.arm_lobby_timer(LobbyTimer::StartWarning, timing.start_warning());
        self.arm_lobby_timer(LobbyTimer::StartTimeout, timing.start_timeout());
        self.countdown_host = self.room.host;
        tracing::debug!(
            room_id = %self.room.id,
            host = ?self.room.host,
            timeout_secs = timing.start_timeout_secs,
            "start countdown armed"
        );
    }

    pub(super) fn cancel_countdown(&mut self) {
        if self.lobby_timers.cancel_all() > 0 {
            tracing::debug!(room_id = %self.room.id, "start countdown cancelled");
        }
        self.countdown_host = None;
    }

    pub(super) fn on_lobby_timer(&mut self, timer: LobbyTimer, token: TimerToken) {
        if !self.lobby_timers.claim(&timer, token) {
            return;
        }
        let room_id = self.room.id;
        let Some(host) = self.countdown_host.filter(|h| self.room.is_host(*h)) else {
            return;
        };
        if !self.room.can_start() {
            self.cancel_countdown();
            return;
        }

        match timer {
            LobbyTimer::StartWarning => {
                let remaining_secs = self
                    .lobby_timers
                    .remaining(&LobbyTimer::StartTimeout)
                    .unwrap_or_default()
                    .as_secs();
                tracing::info!(room_id = %room_id, host = %host, remaining_secs, "host has not started yet");

                let event = ServerEvent::StartCountdownWarning {
                    room_id,
                    host,
                    remaining_secs,
                };
                self.notify(host, UserChannel::Room, event.clone());
                self.to_room(event);
            }
            LobbyTimer::StartTimeout => {
                tracing::warn!(room_id = %room_id, host = %host, "host never started; removing");
                self.cancel_countdown();
                self.to_room(ServerEvent::StartCountdownExpired { room_id, host });
                self.notify(
                    host,
                    UserChannel::Room,
                    ServerEvent::ForcedOut {
                        room_id,
                        reason: RemovalReason::StartTimeout,
                    },
                );
                if let Err(err) = self.handle_leave(host) {
                    tracing::warn!(room_id = %room_id, error = %err, "failed to remove idle host");
                }
            }
        }
    }

    // -- Match timers -------------------------------------------------------

    pub(super) fn on_match_timer(&mut self, timer: MatchTimer, token: TimerToken) {
        if !self.match_timers.claim(&timer, token) {
            return;
        }
        let live = self.room.active.as_ref().map(|game| game.id());

        match timer {
            MatchTimer::Duration(match_id) if live == Some(match_id) => {
                tracing::info!(room_id = %self.room.id, match_id = %match_id, "match time limit reached");
                self.finish_match(EndReason::Timeout, None, None);
            }
            MatchTimer::HostResponse(match_id) if live == Some(match_id) => {
                self.escalate_host();
            }
            _ => {
                tracing::debug!(room_id = %self.room.id, ?timer, "timer for a finished match ignored");
            }
        }
    }

    /// Keeps the host deadline armed exactly while the host owes a
    /// response. The first deadline is the full response time; after a
    /// warning it is the shorter grace period.
    pub(super) fn refresh_host_timer(&mut self) {
        let Some(game) = self.room.active.as_ref() else {
            return;
        };
        let key = MatchTimer::HostResponse(game.id());
        if !game.owes_host() {
            self.match_timers.cancel(&key);
            return;
        }
        if self.match_timers.is_armed(&key) {
            return;
        }

        let delay = if game.host_warnings() == 0 {
            self.config.timing.host_response()
        } else {
            self.config.timing.host_grace()
        };
        self.arm_match_timer(key, delay);
    }

    /// The host answered in time: warnings reset and the deadline restarts.
    pub(super) fn host_responded(&mut self) {
        let Some(game) = self.room.active.as_mut() else {
            return;
        };
        game.reset_host_warnings();
        let key = MatchTimer::HostResponse(game.id());
        self.match_timers.cancel(&key);
        self.refresh_host_timer();
    }

    /// The host missed a deadline. Warns, or removes the host once the
    /// warnings run out.
    ///
    /// A warning lasts until the host's next response. If the prompt goes
    /// away some other way (a pass, the asker leaving), the next prompt
    /// still gets only the grace period.
    pub(super) fn escalate_host(&mut self) -> HostEscalation {
        let room_id = self.room.id;
        let Some(game) = self.room.active.as_mut() else {
            return HostEscalation::Warned { warnings: 0 };
        };
        let warnings = game.warn_host();
        let host = game.host();
        let limit = game.rules().host_strikes;
        let key = MatchTimer::HostResponse(game.id());
        self.match_timers.cancel(&key);

        if warnings >= limit {
            return match self.remove_host(host, RemovalReason::HostTimeout) {
                Some(end) => HostEscalation::Removed(end),
                None => HostEscalation::Warned { warnings },
            };
        }

        let grace_secs = self.config.timing.host_grace_secs;
        tracing::warn!(room_id = %room_id, host = %host, warnings, limit, "host missed a deadline");
        let event = ServerEvent::HostWarning {
            room_id,
            warnings,
            grace_secs,
        };
        self.notify(host, UserChannel::Match, event.clone());
        self.to_match(event);
        self.refresh_host_timer();
        HostEscalation::Warned { warnings }
    }
}
