//! Lobby commands: membership, settings, readiness and host transfer.

use riddlehall_protocol::{
    EndReason, Member, ReadyState, RoomSnapshot, RoomState, ServerEvent, UserChannel, UserId,
};

use super::{LeaveOutcome, RoomActor};
use crate::hooks::Puzzle;
use crate::{RoomError, RoomSettings};

impl RoomActor {
    pub(super) fn handle_join(&mut self, member: Member) -> Result<RoomSnapshot, RoomError> {
        let room_id = self.room.id;
        let user = member.id;
        if self.room.contains(user) {
            return Err(RoomError::AlreadyJoined(user, room_id));
        }
        if !self.room.state.is_joinable() || self.room.is_full() {
            return Err(RoomError::RoomNotJoinable(room_id));
        }

        self.room.add_player(member.clone());
        self.store.set_user_room(user, room_id);
        tracing::info!(
            room_id = %room_id,
            user_id = %user,
            players = self.room.len(),
            "player joined"
        );

        self.to_room(ServerEvent::PlayerJoined {
            room_id,
            user: member,
        });
        self.room_updated();
        self.refresh_lobby_timers();
        Ok(self.room.snapshot(false))
    }

    /// Removes `user` from the room, in the lobby or mid-match.
    ///
    /// A participant leaving a match is taken out of the turn order. The
    /// host leaving ends the match. Either way the earliest joiner left
    /// inherits an empty host slot.
    pub(super) fn handle_leave(&mut self, user: UserId) -> Result<LeaveOutcome, RoomError> {
        let room_id = self.room.id;
        if !self.room.contains(user) {
            return Err(RoomError::NotInRoom(user, room_id));
        }

        let was_host = self.room.is_host(user);
        self.room.remove_player(user);
        self.store.clear_user_room(user, room_id);
        tracing::info!(
            room_id = %room_id,
            user_id = %user,
            was_host,
            players = self.room.len(),
            "player left"
        );
        self.to_room(ServerEvent::PlayerLeft { room_id, user });

        let in_match = self
            .room
            .active
            .as_ref()
            .map(|game| game.is_participant(user));
        match in_match {
            Some(_) if was_host => {
                self.finish_match(EndReason::LeaveHost, None, None);
            }
            Some(true) => {
                self.drop_participant(user, false);
            }
            _ => {}
        }

        if self.room.is_empty() {
            return Ok(LeaveOutcome::RoomDeleted);
        }
        if was_host {
            self.ensure_host(Some(user));
        }
        self.room_updated();
        self.refresh_lobby_timers();

        Ok(match self.room.host {
            Some(new_host) if was_host => LeaveOutcome::HostChanged { new_host },
            _ => LeaveOutcome::ParticipantLeft,
        })
    }

    /// Promotes the earliest joiner if the host slot is empty or stale.
    ///
    /// Resets the pre-game countdown, which belonged to the old host.
    pub(super) fn ensure_host(&mut self, previous: Option<UserId>) -> Option<UserId> {
        if self.room.has_valid_host() || self.room.is_empty() {
            return None;
        }
        let host = self.room.promote_earliest()?;
        self.cancel_countdown();

        tracing::info!(
            room_id = %self.room.id,
            previous = ?previous,
            host = %host,
            "host changed"
        );
        self.to_room(ServerEvent::HostChanged {
            room_id: self.room.id,
            previous,
            host,
        });
        Some(host)
    }

    pub(super) fn handle_update_settings(
        &mut self,
        user: UserId,
        capacity: Option<usize>,
        time_limit_minutes: Option<u32>,
    ) -> Result<RoomSettings, RoomError> {
        self.require_host(user)?;
        if self.room.state != RoomState::Waiting {
            return Err(RoomError::SettingsLocked(self.room.state));
        }
        if capacity.is_none() && time_limit_minutes.is_none() {
            return Err(RoomError::NothingToUpdate);
        }

        let mut next = self.room.settings;
        if let Some(capacity) = capacity {
            next.capacity = capacity;
        }
        if let Some(minutes) = time_limit_minutes {
            next.time_limit_minutes = minutes;
        }
        next.validate()?;
        if next.capacity < self.room.len() {
            return Err(RoomError::CapacityTooLow {
                requested: next.capacity,
                current: self.room.len(),
            });
        }

        self.room.settings = next;
        tracing::debug!(
            room_id = %self.room.id,
            capacity = next.capacity,
            time_limit_minutes = next.time_limit_minutes,
            "settings updated"
        );
        self.to_room(ServerEvent::SettingsUpdated {
            room_id: self.room.id,
            capacity: next.capacity,
            time_limit_minutes: next.time_limit_minutes,
        });
        self.room_updated();
        Ok(next)
    }

    pub(super) fn handle_update_puzzle(
        &mut self,
        user: UserId,
        puzzle: Puzzle,
    ) -> Result<(), RoomError> {
        self.require_host(user)?;
        if self.room.state != RoomState::Waiting {
            return Err(RoomError::SettingsLocked(self.room.state));
        }

        let title = puzzle.title.clone();
        tracing::debug!(
            room_id = %self.room.id,
            puzzle = %puzzle.reference.as_str(),
            "puzzle changed"
        );
        self.room.puzzle = Some(puzzle);
        self.to_room(ServerEvent::PuzzleChanged {
            room_id: self.room.id,
            title,
        });
        self.room_updated();
        self.refresh_lobby_timers();
        Ok(())
    }

    /// Sets a player's readiness. Returns whether the room can start now.
    pub(super) fn handle_change_ready(
        &mut self,
        user: UserId,
        ready: ReadyState,
    ) -> Result<bool, RoomError> {
        let room_id = self.room.id;
        if self.room.state != RoomState::Waiting {
            return Err(RoomError::NotWaiting(self.room.state));
        }
        let player = self
            .room
            .player_mut(user)
            .ok_or(RoomError::NotInRoom(user, room_id))?;
        player.ready = ready;

        let can_start = self.room.can_start();
        tracing::debug!(room_id = %room_id, user_id = %user, ?ready, can_start, "ready changed");
        self.to_room(ServerEvent::ReadyChanged {
            room_id,
            user,
            ready,
            can_start,
        });
        self.room_updated();
        self.refresh_lobby_timers();
        Ok(can_start)
    }

    pub(super) fn handle_request_transfer(
        &mut self,
        user: UserId,
        target: UserId,
    ) -> Result<(), RoomError> {
        self.require_host(user)?;
        if self.room.state != RoomState::Waiting {
            return Err(RoomError::NotWaiting(self.room.state));
        }
        if let Some(pending) = self.room.pending_transfer {
            return Err(RoomError::TransferAlreadyPending(pending));
        }
        if target == user || !self.room.contains(target) {
            return Err(RoomError::InvalidTransferTarget(target));
        }

        self.room.pending_transfer = Some(target);
        tracing::info!(room_id = %self.room.id, from = %user, to = %target, "host transfer requested");

        let event = ServerEvent::HostTransferRequested {
            room_id: self.room.id,
            from: user,
            to: target,
        };
        self.notify(target, UserChannel::Room, event.clone());
        self.to_room(event);
        Ok(())
    }

    /// Accepting swaps roles and ready states between host and target.
    ///
    /// The pre-game countdown is cancelled either way and only re-armed
    /// by the next readiness change.
    pub(super) fn handle_respond_transfer(
        &mut self,
        user: UserId,
        accept: bool,
    ) -> Result<(), RoomError> {
        if self.room.state != RoomState::Waiting {
            return Err(RoomError::NotWaiting(self.room.state));
        }
        let target = self
            .room
            .pending_transfer
            .ok_or(RoomError::NoPendingTransfer)?;
        if target != user {
            return Err(RoomError::NotTransferTarget(user));
        }
        let Some(from) = self.room.host else {
            self.room.pending_transfer = None;
            return Err(RoomError::NoPendingTransfer);
        };

        self.room.pending_transfer = None;
        self.cancel_countdown();

        if accept {
            let host_ready = self.ready_of(from);
            let target_ready = self.ready_of(target);
            self.room.make_host(target);
            if let Some(p) = self.room.player_mut(target) {
                p.ready = host_ready;
            }
            if let Some(p) = self.room.player_mut(from) {
                p.ready = target_ready;
            }
        }
        tracing::info!(
            room_id = %self.room.id,
            from = %from,
            to = %target,
            accepted = accept,
            "host transfer resolved"
        );

        self.to_room(ServerEvent::HostTransferResolved {
            room_id: self.room.id,
            from,
            to: target,
            accepted: accept,
        });
        if accept {
            self.to_room(ServerEvent::HostChanged {
                room_id: self.room.id,
                previous: Some(from),
                host: target,
            });
        }
        self.room_updated();
        Ok(())
    }

    fn require_host(&self, user: UserId) -> Result<(), RoomError> {
        if !self.room.contains(user) {
            return Err(RoomError::NotInRoom(user, self.room.id));
        }
        if !self.room.is_host(user) {
            return Err(RoomError::NotHost(user));
        }
        Ok(())
    }

    fn ready_of(&self, user: UserId) -> ReadyState {
        self.room
            .player(user)
            .map_or(ReadyState::Waiting, |p| p.ready)
    }
}
