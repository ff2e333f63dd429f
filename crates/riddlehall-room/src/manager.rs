//! Room manager: creates rooms and routes every action to the right one.
//!
//! This is the entry point for higher layers (a transport, a controller,
//! a test). Each method looks the room up in the [`RoomStore`] and hands
//! the action to that room's actor, which decides everything under its
//! own exclusive section.

use std::sync::Arc;

use riddlehall_protocol::{
    AnswerAttempt, AnswerStatus, MatchView, Member, PassReason, PuzzleRef, ReadyState, RoomId,
    RoomListing, RoomSnapshot, RoomState, ServerEvent, Topic, UserId,
};

use crate::actor::spawn_room;
use crate::hooks::{PuzzleResolver, RoomServices};
use crate::room::Room;
use crate::{
    Followup, HostEscalation, LeaveOutcome, RoomConfig, RoomError, RoomHandle, RoomSettings,
    RoomStore,
};

/// Creates rooms and routes users to them.
///
/// Cheap to share: wrap it in an `Arc` and call it from any task. The
/// manager itself holds no per-room state beyond the store.
pub struct RoomManager<P: PuzzleResolver> {
    store: Arc<RoomStore>,
    resolver: P,
    services: RoomServices,
    config: Arc<RoomConfig>,
}

impl<P: PuzzleResolver> RoomManager<P> {
    pub fn new(config: RoomConfig, resolver: P, services: RoomServices) -> Self {
        Self {
            store: Arc::new(RoomStore::new(config.room_ids())),
            resolver,
            services,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &Arc<RoomStore> {
        &self.store
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    // -- Lobby --------------------------------------------------------------

    /// Creates a room with `host` in it and returns the host's view of it.
    ///
    /// A host who is still in another room leaves it first.
    pub async fn create_room(
        &self,
        host: Member,
        settings: RoomSettings,
        puzzle: &PuzzleRef,
    ) -> Result<RoomSnapshot, RoomError> {
        settings.validate()?;
        let puzzle = self
            .resolver
            .resolve(puzzle)
            .await
            .ok_or_else(|| RoomError::PuzzleNotFound(puzzle.clone()))?;

        if let Some(previous) = self.store.user_room(host.id) {
            self.force_leave(host.id, previous).await;
        }

        let room_id = self.store.allocate()?;
        let user = host.id;
        let room = Room::new(room_id, settings, host, puzzle);
        let snapshot = room.snapshot(true);
        let listing = room.listing();

        let handle = spawn_room(
            room,
            Arc::clone(&self.config),
            Arc::clone(&self.store),
            self.services.clone(),
        );
        self.store.save(handle, listing);
        self.store.set_user_room(user, room_id);

        tracing::info!(room_id = %room_id, host = %user, "room created");
        self.publish_rooms();
        Ok(snapshot)
    }

    /// Puts `member` into a room, leaving their previous room afterwards.
    pub async fn join_room(
        &self,
        member: Member,
        room_id: RoomId,
    ) -> Result<RoomSnapshot, RoomError> {
        let user = member.id;
        let previous = self.store.user_room(user);
        if previous == Some(room_id) {
            return Err(RoomError::AlreadyJoined(user, room_id));
        }

        let snapshot = self.store.handle(room_id)?.join(member).await?;
        if let Some(previous) = previous {
            self.force_leave(user, previous).await;
        }
        Ok(snapshot)
    }

    pub async fn leave_room(&self, user: UserId) -> Result<LeaveOutcome, RoomError> {
        self.room_of(user)?.leave(user).await
    }

    /// A lost connection counts as leaving. Users in no room are ignored.
    pub async fn disconnect(&self, user: UserId) -> Result<Option<LeaveOutcome>, RoomError> {
        let Some(room_id) = self.store.user_room(user) else {
            return Ok(None);
        };
        tracing::info!(room_id = %room_id, user_id = %user, "user disconnected");
        let result = match self.store.handle(room_id) {
            Ok(handle) => handle.leave(user).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(outcome) => Ok(Some(outcome)),
            Err(
                RoomError::NotInRoom(..) | RoomError::RoomNotFound(_) | RoomError::Unavailable(_),
            ) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn update_settings(
        &self,
        user: UserId,
        capacity: Option<usize>,
        time_limit_minutes: Option<u32>,
    ) -> Result<RoomSettings, RoomError> {
        self.room_of(user)?
            .update_settings(user, capacity, time_limit_minutes)
            .await
    }

    /// Resolves `puzzle` and makes it the room's puzzle.
    pub async fn update_puzzle(&self, user: UserId, puzzle: &PuzzleRef) -> Result<(), RoomError> {
        let handle = self.room_of(user)?;
        let puzzle = self
            .resolver
            .resolve(puzzle)
            .await
            .ok_or_else(|| RoomError::PuzzleNotFound(puzzle.clone()))?;
        handle.update_puzzle(user, puzzle).await
    }

    /// Returns whether the room can start after the change.
    pub async fn change_ready(&self, user: UserId, ready: ReadyState) -> Result<bool, RoomError> {
        self.room_of(user)?.change_ready(user, ready).await
    }

    pub async fn request_host_transfer(
        &self,
        user: UserId,
        target: UserId,
    ) -> Result<(), RoomError> {
        self.room_of(user)?
            .request_host_transfer(user, target)
            .await
    }

    pub async fn respond_host_transfer(&self, user: UserId, accept: bool) -> Result<(), RoomError> {
        self.room_of(user)?
            .respond_host_transfer(user, accept)
            .await
    }

    // -- Match --------------------------------------------------------------

    pub async fn start_match(&self, user: UserId) -> Result<MatchView, RoomError> {
        self.room_of(user)?.start(user).await
    }

    pub async fn ask_question(&self, user: UserId, text: impl Into<String>) -> Result<(), RoomError> {
        self.room_of(user)?.ask(user, text.into()).await
    }

    pub async fn respond_question(
        &self,
        user: UserId,
        status: AnswerStatus,
    ) -> Result<Followup, RoomError> {
        self.room_of(user)?.respond_question(user, status).await
    }

    pub async fn submit_guess(
        &self,
        user: UserId,
        text: impl Into<String>,
    ) -> Result<AnswerAttempt, RoomError> {
        self.room_of(user)?.submit_guess(user, text.into()).await
    }

    pub async fn judge_guess(
        &self,
        user: UserId,
        attempt: AnswerAttempt,
        status: AnswerStatus,
    ) -> Result<Followup, RoomError> {
        self.room_of(user)?
            .judge_guess(user, attempt, status)
            .await
    }

    pub async fn pass_turn(&self, user: UserId, reason: PassReason) -> Result<Followup, RoomError> {
        self.room_of(user)?.pass_turn(user, reason).await
    }

    /// The host's client reports that its response window ran out.
    /// Counts as a missed deadline.
    pub async fn report_host_timeout(&self, user: UserId) -> Result<HostEscalation, RoomError> {
        self.room_of(user)?.report_host_timeout(user).await
    }

    // -- Queries ------------------------------------------------------------

    /// A room as `viewer` may see it.
    pub async fn room_snapshot(
        &self,
        room_id: RoomId,
        viewer: Option<UserId>,
    ) -> Result<RoomSnapshot, RoomError> {
        self.store.handle(room_id)?.snapshot(viewer).await
    }

    pub async fn match_view(&self, room_id: RoomId) -> Result<MatchView, RoomError> {
        self.store.handle(room_id)?.match_view().await
    }

    /// Every room, sorted by state and then by id.
    pub fn list_rooms(&self) -> Vec<RoomListing> {
        self.store.find_all_sorted()
    }

    pub fn list_rooms_in(&self, state: RoomState) -> Vec<RoomListing> {
        self.store.find_by_state(state)
    }

    pub fn user_room(&self, user: UserId) -> Option<RoomId> {
        self.store.user_room(user)
    }

    pub fn room_count(&self) -> usize {
        self.store.len()
    }

    // -- Internals ----------------------------------------------------------

    fn room_of(&self, user: UserId) -> Result<RoomHandle, RoomError> {
        let room_id = self
            .store
            .user_room(user)
            .ok_or(RoomError::NotInAnyRoom(user))?;
        self.store.handle(room_id)
    }

    /// Leaves `room_id` on the user's behalf. Failures only mean the user
    /// was already gone.
    async fn force_leave(&self, user: UserId, room_id: RoomId) {
        let result = match self.store.handle(room_id) {
            Ok(handle) => handle.leave(user).await.map(|_| ()),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            tracing::debug!(room_id = %room_id, user_id = %user, error = %err, "forced leave skipped");
        }
    }

    fn publish_rooms(&self) {
        self.services.notifier.broadcast(
            Topic::Lobby,
            ServerEvent::RoomListed {
                rooms: self.store.find_all_sorted(),
            },
        );
    }
}
