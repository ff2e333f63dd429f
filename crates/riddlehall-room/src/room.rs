//! Room data: roster, settings, lifecycle state and the live match.
//!
//! A `Room` is a plain value owned by exactly one room actor. The lobby
//! and session handlers borrow it mutably for the length of one command,
//! which is the room's exclusive section.

use std::collections::HashMap;

use riddlehall_protocol::{
    MatchId, Member, PlayerRole, ReadyState, RoomId, RoomListing, RoomSnapshot, RoomState,
    UserId,
};

use crate::game::Match;
use crate::hooks::Puzzle;
use crate::player::Player;
use crate::RoomSettings;

#[derive(Debug)]
pub(crate) struct Room {
    pub(crate) id: RoomId,
    pub(crate) settings: RoomSettings,
    pub(crate) state: RoomState,
    pub(crate) host: Option<UserId>,
    pub(crate) puzzle: Option<Puzzle>,
    pub(crate) pending_transfer: Option<UserId>,
    /// Users in the order they joined. The earliest one inherits the
    /// host role when the host goes away.
    join_order: Vec<UserId>,
    players: HashMap<UserId, Player>,
    pub(crate) active: Option<Match>,
    matches_played: u64,
}

impl Room {
    pub(crate) fn new(id: RoomId, settings: RoomSettings, host: Member, puzzle: Puzzle) -> Self {
        let host = Player::host(host);
        let host_id = host.user;
        Self {
            id,
            settings,
            state: RoomState::Waiting,
            host: Some(host_id),
            puzzle: Some(puzzle),
            pending_transfer: None,
            join_order: vec![host_id],
            players: HashMap::from([(host_id, host)]),
            active: None,
            matches_played: 0,
        }
    }

    // -- Roster -------------------------------------------------------------

    pub(crate) fn len(&self) -> usize {
        self.players.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub(crate) fn is_full(&self) -> bool {
        self.players.len() >= self.settings.capacity
    }

    pub(crate) fn contains(&self, user: UserId) -> bool {
        self.players.contains_key(&user)
    }

    pub(crate) fn is_host(&self, user: UserId) -> bool {
        self.host == Some(user)
    }

    pub(crate) fn player(&self, user: UserId) -> Option<&Player> {
        self.players.get(&user)
    }

    pub(crate) fn player_mut(&mut self, user: UserId) -> Option<&mut Player> {
        self.players.get_mut(&user)
    }

    /// User ids in join order.
    pub(crate) fn members(&self) -> &[UserId] {
        &self.join_order
    }

    pub(crate) fn add_player(&mut self, member: Member) {
        let player = Player::joiner(member);
        self.join_order.push(player.user);
        self.players.insert(player.user, player);
    }

    /// Removes a user from the roster. Clears the host slot and any
    /// pending transfer that involved them.
    pub(crate) fn remove_player(&mut self, user: UserId) -> Option<Player> {
        let player = self.players.remove(&user)?;
        self.join_order.retain(|u| *u != user);
        if self.host == Some(user) {
            self.host = None;
            self.pending_transfer = None;
        }
        if self.pending_transfer == Some(user) {
            self.pending_transfer = None;
        }
        Some(player)
    }

    /// Gives the host role to the earliest joiner still present.
    pub(crate) fn promote_earliest(&mut self) -> Option<UserId> {
        let next = self.join_order.first().copied()?;
        self.make_host(next);
        Some(next)
    }

    /// Makes `user` the host. Any previous host becomes a participant.
    pub(crate) fn make_host(&mut self, user: UserId) {
        if let Some(previous) = self.host.filter(|h| *h != user) {
            if let Some(p) = self.players.get_mut(&previous) {
                p.role = PlayerRole::Participant;
            }
        }
        if let Some(p) = self.players.get_mut(&user) {
            p.promote();
        }
        self.host = Some(user);
    }

    /// Whether the host slot points at someone who is still here.
    pub(crate) fn has_valid_host(&self) -> bool {
        self.host
            .and_then(|h| self.players.get(&h))
            .is_some_and(Player::is_host)
    }

    /// Resets every player to their lobby role after a match.
    pub(crate) fn reset_for_lobby(&mut self) {
        let host = self.host;
        for player in self.players.values_mut() {
            if Some(player.user) == host {
                player.promote();
            } else {
                player.demote();
            }
        }
    }

    // -- Start gating -------------------------------------------------------

    pub(crate) fn all_ready(&self) -> bool {
        self.players.values().all(|p| p.ready == ReadyState::Ready)
    }

    /// Everyone ready, at least two players, a puzzle chosen, in the lobby.
    pub(crate) fn can_start(&self) -> bool {
        self.state == RoomState::Waiting
            && self.players.len() >= 2
            && self.puzzle.is_some()
            && self.all_ready()
    }

    pub(crate) fn next_match_id(&mut self) -> MatchId {
        self.matches_played += 1;
        MatchId(self.matches_played)
    }

    // -- Views --------------------------------------------------------------

    /// Full state. The puzzle answer is included only if `reveal` is set.
    pub(crate) fn snapshot(&self, reveal: bool) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.id,
            state: self.state,
            capacity: self.settings.capacity,
            time_limit_minutes: self.settings.time_limit_minutes,
            host: self.host,
            puzzle: self.puzzle.as_ref().map(|p| p.view(reveal)),
            players: self
                .join_order
                .iter()
                .filter_map(|u| self.players.get(u))
                .map(Player::view)
                .collect(),
            pending_transfer: self.pending_transfer,
        }
    }

    pub(crate) fn listing(&self) -> RoomListing {
        RoomListing {
            room_id: self.id,
            state: self.state,
            host_nickname: self
                .host
                .and_then(|h| self.players.get(&h))
                .map(|p| p.nickname.clone()),
            player_count: self.players.len(),
            capacity: self.settings.capacity,
            time_limit_minutes: self.settings.time_limit_minutes,
            puzzle_title: self.puzzle.as_ref().map(|p| p.title.clone()),
        }
    }
}
