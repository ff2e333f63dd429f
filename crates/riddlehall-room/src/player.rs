//! Lobby identity of a player.

use riddlehall_protocol::{Member, PlayerRole, PlayerView, ReadyState, UserId};

/// A player as the room roster knows them.
///
/// Only lobby-level fields live here. Everything that changes during a
/// match (questioner role, guess attempts, strikes) lives in the match's
/// own participant records, so nothing a match does leaks into the
/// roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub user: UserId,
    pub nickname: String,
    pub role: PlayerRole,
    pub ready: ReadyState,
}

impl Player {
    /// A new host: role `HOST`, already ready.
    pub fn host(member: Member) -> Self {
        Self {
            user: member.id,
            nickname: member.nickname,
            role: PlayerRole::Host,
            ready: ReadyState::Ready,
        }
    }

    /// A new joiner: role `PARTICIPANT`, not ready yet.
    pub fn joiner(member: Member) -> Self {
        Self {
            user: member.id,
            nickname: member.nickname,
            role: PlayerRole::Participant,
            ready: ReadyState::Waiting,
        }
    }

    pub fn is_host(&self) -> bool {
        self.role == PlayerRole::Host
    }

    /// Makes this player the host.
    pub fn promote(&mut self) {
        self.role = PlayerRole::Host;
        self.ready = ReadyState::Ready;
    }

    /// Makes this player an ordinary lobby participant.
    pub fn demote(&mut self) {
        self.role = PlayerRole::Participant;
        self.ready = ReadyState::Waiting;
    }

    pub fn member(&self) -> Member {
        Member::new(self.user, self.nickname.clone())
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            user: self.user,
            nickname: self.nickname.clone(),
            role: self.role,
            ready: self.ready,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_starts_ready() {
        let p = Player::host(Member::new(UserId(1), "ann"));
        assert!(p.is_host());
        assert_eq!(p.ready, ReadyState::Ready);
    }

    #[test]
    fn test_joiner_starts_waiting() {
        let p = Player::joiner(Member::new(UserId(2), "bo"));
        assert_eq!(p.role, PlayerRole::Participant);
        assert_eq!(p.ready, ReadyState::Waiting);
    }

    #[test]
    fn test_promote_and_demote() {
        let mut p = Player::joiner(Member::new(UserId(2), "bo"));
        p.promote();
        assert!(p.is_host());
        assert!(p.ready.is_ready());
        p.demote();
        assert_eq!(p.role, PlayerRole::Participant);
        assert_eq!(p.ready, ReadyState::Waiting);
    }
}
