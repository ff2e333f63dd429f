//! Timer-driven flows on a paused clock: match time limit, host
//! escalation and the pre-game countdown.

mod common;

use std::time::Duration;

use common::*;
use riddlehall_protocol::{
    AnswerStatus, EndReason, ReadyState, RemovalReason, RoomState, ServerEvent, Topic,
};
use riddlehall_room::LeaveOutcome;
use tokio::time::sleep;

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn ended_with(events: &[ServerEvent], reason: EndReason) -> bool {
    events.iter().any(|e| matches!(
        e,
        ServerEvent::MatchEnded { result, .. } if result.reason == reason
    ))
}

// =========================================================================
// Match time limit
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_match_ends_when_time_runs_out() {
    let mut hall = hall();
    let room = hall.ready_room(3, 1).await;
    hall.manager.start_match(uid(1)).await.unwrap();

    sleep(secs(59)).await;
    let snapshot = hall.manager.room_snapshot(room, None).await.unwrap();
    assert_eq!(snapshot.state, RoomState::Playing);

    sleep(secs(2)).await;
    let snapshot = hall.manager.room_snapshot(room, None).await.unwrap();
    assert_eq!(snapshot.state, RoomState::Waiting);

    let events = on_topic(&hall.drain(), Topic::Match(room));
    assert!(ended_with(&events, EndReason::Timeout));
    let end = events.iter().find_map(|e| match e {
        ServerEvent::MatchEnded { result, .. } => Some(result.clone()),
        _ => None,
    });
    assert_eq!(end.unwrap().play_time_secs, 60);
    assert_eq!(hall.stats.outcomes()[0].reason, EndReason::Timeout);
}

#[tokio::test(start_paused = true)]
async fn test_old_match_clock_never_ends_the_next_match() {
    let hall = hall();
    let room = hall.ready_room(2, 1).await;
    hall.manager.start_match(uid(1)).await.unwrap();
    let p1 = hall.manager.match_view(room).await.unwrap().turn_order[0];

    sleep(secs(10)).await;
    let attempt = hall.manager.submit_guess(p1, "A plane crash").await.unwrap();
    hall.manager
        .judge_guess(uid(1), attempt, AnswerStatus::Correct)
        .await
        .unwrap();

    sleep(secs(10)).await;
    hall.manager.change_ready(p1, ReadyState::Ready).await.unwrap();
    let second = hall.manager.start_match(uid(1)).await.unwrap();

    // The first match's clock would have run out at 60s.
    sleep(secs(45)).await;
    let view = hall.manager.match_view(room).await.unwrap();
    assert_eq!(view.match_id, second.match_id);

    sleep(secs(20)).await;
    let snapshot = hall.manager.room_snapshot(room, None).await.unwrap();
    assert_eq!(snapshot.state, RoomState::Waiting);
    assert_eq!(hall.stats.outcomes().len(), 2);
}

// =========================================================================
// Host escalation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_silent_host_is_warned_then_removed() {
    let mut hall = hall();
    let room = hall.ready_room(3, 10).await;
    hall.manager.start_match(uid(1)).await.unwrap();
    let p1 = hall.manager.match_view(room).await.unwrap().turn_order[0];
    hall.manager.ask_question(p1, "Was it cold?").await.unwrap();
    hall.drain();

    sleep(secs(61)).await;
    let sent = hall.drain();
    assert!(sent_to(&sent, uid(1)).contains(&ServerEvent::HostWarning {
        room_id: room,
        warnings: 1,
        grace_secs: 30,
    }));
    assert_eq!(
        hall.manager.room_snapshot(room, None).await.unwrap().state,
        RoomState::Playing
    );

    sleep(secs(30)).await;
    let sent = hall.drain();
    assert!(sent_to(&sent, uid(1)).contains(&ServerEvent::ForcedOut {
        room_id: room,
        reason: RemovalReason::HostTimeout,
    }));
    assert!(ended_with(&on_topic(&sent, Topic::Match(room)), EndReason::LeaveHost));

    let snapshot = hall.manager.room_snapshot(room, None).await.unwrap();
    assert_eq!(snapshot.state, RoomState::Waiting);
    assert_eq!(snapshot.host, Some(uid(2)));
    assert_eq!(hall.manager.user_room(uid(1)), None);
}

#[tokio::test(start_paused = true)]
async fn test_timely_host_response_cancels_escalation() {
    let mut hall = hall();
    let room = hall.ready_room(3, 10).await;
    hall.manager.start_match(uid(1)).await.unwrap();
    let p1 = hall.manager.match_view(room).await.unwrap().turn_order[0];

    hall.manager.ask_question(p1, "Was it cold?").await.unwrap();
    sleep(secs(50)).await;
    hall.manager
        .respond_question(uid(1), AnswerStatus::No)
        .await
        .unwrap();
    hall.drain();

    sleep(secs(120)).await;
    let events = hall.drain_events();
    assert!(!events.iter().any(|e| matches!(e, ServerEvent::HostWarning { .. })));
    assert_eq!(
        hall.manager.room_snapshot(room, None).await.unwrap().state,
        RoomState::Playing
    );
}

#[tokio::test(start_paused = true)]
async fn test_host_warnings_reset_after_response() {
    let mut hall = hall();
    let room = hall.ready_room(3, 10).await;
    hall.manager.start_match(uid(1)).await.unwrap();
    let order = hall.manager.match_view(room).await.unwrap().turn_order;

    hall.manager.ask_question(order[0], "Was it cold?").await.unwrap();
    sleep(secs(61)).await;
    hall.manager
        .respond_question(uid(1), AnswerStatus::No)
        .await
        .unwrap();

    // A fresh prompt gets the full response time again.
    hall.manager.ask_question(order[1], "Was it dark?").await.unwrap();
    hall.drain();
    sleep(secs(45)).await;
    assert!(hall.drain_events().is_empty());
    sleep(secs(20)).await;
    assert!(hall.drain_events().contains(&ServerEvent::HostWarning {
        room_id: room,
        warnings: 1,
        grace_secs: 30,
    }));
}

// =========================================================================
// Pre-game countdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_idle_host_is_warned_then_removed() {
    let mut hall = hall();
    let room = hall.ready_room(3, 10).await;
    hall.drain();

    sleep(secs(151)).await;
    let sent = hall.drain();
    assert!(sent_to(&sent, uid(1)).iter().any(|e| matches!(
        e,
        ServerEvent::StartCountdownWarning { remaining_secs: 30, .. }
    )));

    sleep(secs(30)).await;
    let sent = hall.drain();
    assert!(sent_to(&sent, uid(1)).contains(&ServerEvent::ForcedOut {
        room_id: room,
        reason: RemovalReason::StartTimeout,
    }));
    assert!(on_topic(&sent, Topic::Room(room)).contains(&ServerEvent::HostChanged {
        room_id: room,
        previous: Some(uid(1)),
        host: uid(2),
    }));
    assert_eq!(hall.manager.user_room(uid(1)), None);

    let snapshot = hall.manager.room_snapshot(room, None).await.unwrap();
    assert_eq!(snapshot.host, Some(uid(2)));
    assert_eq!(snapshot.players.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_cancelled_when_room_cannot_start() {
    let hall = hall();
    let room = hall.ready_room(3, 10).await;

    sleep(secs(100)).await;
    hall.manager.change_ready(uid(3), ReadyState::Waiting).await.unwrap();
    sleep(secs(200)).await;

    let snapshot = hall.manager.room_snapshot(room, None).await.unwrap();
    assert_eq!(snapshot.host, Some(uid(1)));
    assert_eq!(snapshot.players.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_cancelled_by_start() {
    let hall = hall();
    let room = hall.ready_room(2, 10).await;
    sleep(secs(170)).await;
    hall.manager.start_match(uid(1)).await.unwrap();

    sleep(secs(30)).await;
    let snapshot = hall.manager.room_snapshot(room, None).await.unwrap();
    assert_eq!(snapshot.state, RoomState::Playing);
    assert_eq!(snapshot.host, Some(uid(1)));
}

#[tokio::test(start_paused = true)]
async fn test_countdown_restarts_for_new_host() {
    let hall = hall();
    let room = hall.ready_room(3, 10).await;

    sleep(secs(170)).await;
    let outcome = hall.manager.leave_room(uid(1)).await.unwrap();
    assert_eq!(outcome, LeaveOutcome::HostChanged { new_host: uid(2) });

    // The new host gets the full countdown, not the old one's remainder.
    sleep(secs(20)).await;
    let snapshot = hall.manager.room_snapshot(room, None).await.unwrap();
    assert_eq!(snapshot.host, Some(uid(2)));

    sleep(secs(170)).await;
    let snapshot = hall.manager.room_snapshot(room, None).await.unwrap();
    assert_eq!(snapshot.host, Some(uid(3)));
    assert_eq!(snapshot.players.len(), 1);
}
