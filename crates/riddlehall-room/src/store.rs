//! Room store: the registry of live rooms and the user → room index.
//!
//! Both maps are `DashMap`s so lookups from any task never wait on a
//! room actor. Membership itself is decided inside the room actors; an
//! actor updates the user index in the same command that changes its
//! roster, so the two never disagree for longer than one command.

use std::collections::VecDeque;
use std::ops::RangeInclusive;
use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;
use riddlehall_protocol::{RoomId, RoomListing, RoomState, UserId};

use crate::{RoomError, RoomHandle};

struct RoomEntry {
    handle: RoomHandle,
    listing: RoomListing,
}

/// Registry of every live room.
pub struct RoomStore {
    rooms: DashMap<RoomId, RoomEntry>,
    user_rooms: DashMap<UserId, RoomId>,
    /// Free ids, handed out front first and returned at the back.
    pool: Mutex<VecDeque<RoomId>>,
}

impl RoomStore {
    /// Creates a store whose id pool holds every id in `ids`.
    pub fn new(ids: RangeInclusive<u64>) -> Self {
        Self {
            rooms: DashMap::new(),
            user_rooms: DashMap::new(),
            pool: Mutex::new(ids.map(RoomId).collect()),
        }
    }

    // -- Id pool ------------------------------------------------------------

    /// Takes a free room id.
    pub fn allocate(&self) -> Result<RoomId, RoomError> {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or(RoomError::PoolExhausted)
    }

    /// Returns an id to the pool.
    pub(crate) fn release(&self, room_id: RoomId) {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(room_id);
    }

    /// Number of ids still free.
    pub fn available_ids(&self) -> usize {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    // -- Rooms --------------------------------------------------------------

    /// Registers a freshly spawned room.
    pub(crate) fn save(&self, handle: RoomHandle, listing: RoomListing) {
        self.rooms
            .insert(handle.room_id(), RoomEntry { handle, listing });
    }

    /// Replaces a room's listing. Returns `true` if it changed.
    pub(crate) fn update_listing(&self, listing: RoomListing) -> bool {
        match self.rooms.get_mut(&listing.room_id) {
            Some(mut entry) if entry.listing != listing => {
                entry.listing = listing;
                true
            }
            _ => false,
        }
    }

    /// Removes a room and returns its id to the pool.
    ///
    /// Only called by the room's own actor once its roster is empty. Any
    /// user index entry still pointing at the room is dropped too.
    pub(crate) fn destroy(&self, room_id: RoomId) -> bool {
        if self.rooms.remove(&room_id).is_none() {
            return false;
        }
        self.user_rooms.retain(|_, r| *r != room_id);
        self.release(room_id);
        true
    }

    /// The actor handle for a room.
    pub fn handle(&self, room_id: RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(&room_id)
            .map(|entry| entry.handle.clone())
            .ok_or(RoomError::RoomNotFound(room_id))
    }

    pub fn find_by_id(&self, room_id: RoomId) -> Option<RoomListing> {
        self.rooms.get(&room_id).map(|entry| entry.listing.clone())
    }

    /// Rooms in `state`, by id.
    pub fn find_by_state(&self, state: RoomState) -> Vec<RoomListing> {
        let mut rooms: Vec<RoomListing> = self
            .rooms
            .iter()
            .filter(|entry| entry.listing.state == state)
            .map(|entry| entry.listing.clone())
            .collect();
        rooms.sort_by_key(|r| r.room_id);
        rooms
    }

    /// Every room, sorted by state and then by id.
    pub fn find_all_sorted(&self) -> Vec<RoomListing> {
        let mut rooms: Vec<RoomListing> =
            self.rooms.iter().map(|entry| entry.listing.clone()).collect();
        rooms.sort_by_key(|r| (r.state, r.room_id));
        rooms
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    // -- User index ---------------------------------------------------------

    /// The room a user is currently in.
    pub fn user_room(&self, user: UserId) -> Option<RoomId> {
        self.user_rooms.get(&user).map(|r| *r)
    }

    pub(crate) fn set_user_room(&self, user: UserId, room_id: RoomId) {
        self.user_rooms.insert(user, room_id);
    }

    /// Clears the user's entry only if it still points at `room_id`.
    ///
    /// A user who already moved on to another room keeps that mapping.
    pub(crate) fn clear_user_room(&self, user: UserId, room_id: RoomId) -> bool {
        self.user_rooms
            .remove_if(&user, |_, current| *current == room_id)
            .is_some()
    }
}
