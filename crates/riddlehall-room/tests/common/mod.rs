//! Shared fixtures for the room integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use riddlehall_protocol::{
    Member, PuzzleRef, ReadyState, RoomId, ServerEvent, Topic, UserId,
};
use riddlehall_room::{
    ChannelNotifier, MemoryStats, Outbound, Puzzle, PuzzleShelf, RoomConfig, RoomManager,
    RoomServices, RoomSettings,
};
use tokio::sync::mpsc;

pub const CABIN: &str = "cabin";
pub const LIGHTHOUSE: &str = "lighthouse";

pub struct Hall {
    pub manager: Arc<RoomManager<Arc<PuzzleShelf>>>,
    pub events: mpsc::UnboundedReceiver<Outbound>,
    pub stats: Arc<MemoryStats>,
}

pub fn uid(id: u64) -> UserId {
    UserId(id)
}

pub fn member(id: u64) -> Member {
    Member::new(UserId(id), format!("player-{id}"))
}

pub fn puzzle_ref(reference: &str) -> PuzzleRef {
    PuzzleRef::new(reference)
}

pub fn settings(capacity: usize, minutes: u32) -> RoomSettings {
    RoomSettings::new(capacity, minutes).unwrap()
}

fn shelf() -> PuzzleShelf {
    let shelf = PuzzleShelf::new();
    shelf.insert(Puzzle {
        reference: puzzle_ref(CABIN),
        title: "The cabin".into(),
        content: "Two people are found dead in a cabin on a mountain.".into(),
        answer: "The cabin is the wreck of a small plane.".into(),
        creator: UserId(900),
    });
    shelf.insert(Puzzle {
        reference: puzzle_ref(LIGHTHOUSE),
        title: "The lighthouse".into(),
        content: "A man turns off a light and dozens of people die.".into(),
        answer: "He was a lighthouse keeper.".into(),
        creator: UserId(901),
    });
    shelf
}

pub fn hall() -> Hall {
    hall_with(RoomConfig::default())
}

pub fn hall_with(config: RoomConfig) -> Hall {
    let (notifier, events) = ChannelNotifier::new();
    let stats = Arc::new(MemoryStats::new());
    let services = RoomServices::new(Arc::new(notifier), stats.clone());
    let manager = RoomManager::new(config, Arc::new(shelf()), services);
    Hall {
        manager: Arc::new(manager),
        events,
        stats,
    }
}

impl Hall {
    /// Creates a room hosted by user 1 with users `2..=players` joined.
    pub async fn room(&self, players: u64, minutes: u32) -> RoomId {
        let room = self
            .manager
            .create_room(member(1), settings(6, minutes), &puzzle_ref(CABIN))
            .await
            .unwrap()
            .room_id;
        for id in 2..=players {
            self.manager.join_room(member(id), room).await.unwrap();
        }
        room
    }

    /// Like [`Hall::room`], with everybody ready.
    pub async fn ready_room(&self, players: u64, minutes: u32) -> RoomId {
        let room = self.room(players, minutes).await;
        for id in 2..=players {
            self.manager
                .change_ready(uid(id), ReadyState::Ready)
                .await
                .unwrap();
        }
        room
    }

    /// Everything delivered since the last drain.
    pub fn drain(&mut self) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(outbound) = self.events.try_recv() {
            out.push(outbound);
        }
        out
    }

    /// Events delivered since the last drain, without addressing.
    pub fn drain_events(&mut self) -> Vec<ServerEvent> {
        self.drain().into_iter().map(|o| o.event().clone()).collect()
    }
}

pub fn sent_to(outbound: &[Outbound], user: UserId) -> Vec<ServerEvent> {
    outbound
        .iter()
        .filter_map(|o| match o {
            Outbound::User {
                user: to, event, ..
            } if *to == user => Some(event.clone()),
            _ => None,
        })
        .collect()
}

pub fn on_topic(outbound: &[Outbound], topic: Topic) -> Vec<ServerEvent> {
    outbound
        .iter()
        .filter_map(|o| match o {
            Outbound::Broadcast { topic: t, event } if *t == topic => Some(event.clone()),
            _ => None,
        })
        .collect()
}
