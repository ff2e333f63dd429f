//! Match state: turn order, budgets, the guess queue and the log.
//!
//! A [`Match`] is created when a room starts a game and dropped when the
//! game ends. It keeps its own [`Participant`] record per player, keyed by
//! user id, so match-only state never touches the room roster.
//!
//! Everything here is plain synchronous state. The room actor that owns
//! the match is the only code that ever touches it, which is what makes
//! the budget counters and the queue safe without locks or atomics.
//!
//! Every method that can fail checks first and mutates after, so an
//! `Err` always means the match is unchanged.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use riddlehall_protocol::{
    AnswerAttempt, AnswerStatus, EntryKind, MatchId, MatchView, PlayerRole, QnaEntry,
    UserId,
};
use tokio::time::Instant;

use crate::{MatchRules, RoomError};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Per-match state of one non-host player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub user: UserId,
    /// `Questioner` while it is this player's turn, else `Participant`.
    pub role: PlayerRole,
    /// Personal guess attempts left.
    pub attempts_left: u32,
    /// Consecutive turns this player let time out.
    pub strikes: u32,
}

/// A question asked but not yet answered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuestion {
    pub asker: UserId,
    pub text: String,
}

/// What removing a participant changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Personal attempts deducted from the shared guess budget.
    pub forfeited: u32,
    /// Whether the removed player held the turn.
    pub was_questioner: bool,
    /// Whether their unanswered question was discarded.
    pub dropped_question: bool,
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// One game played inside a room.
#[derive(Debug)]
pub struct Match {
    id: MatchId,
    host: UserId,
    rules: MatchRules,
    /// Everyone who started the match, in turn order. Reported to stats.
    started_with: Vec<UserId>,
    participants: HashMap<UserId, Participant>,
    turn_order: Vec<UserId>,
    turn_index: usize,
    questioner: Option<UserId>,
    remaining_questions: u32,
    remaining_guesses: u32,
    pending_question: Option<PendingQuestion>,
    guess_queue: VecDeque<AnswerAttempt>,
    log: Vec<QnaEntry>,
    host_warnings: u32,
    started_at: Instant,
}

impl Match {
    /// Builds a match for `roster` with `host` holding the puzzle.
    ///
    /// The host is filtered out of `roster`; the rest are shuffled into
    /// the turn order. Fails if nobody but the host is left or if the
    /// rules leave a budget empty.
    pub fn new<R: Rng + ?Sized>(
        id: MatchId,
        host: UserId,
        roster: &[UserId],
        rules: MatchRules,
        rng: &mut R,
    ) -> Result<Self, RoomError> {
        let mut turn_order: Vec<UserId> =
            roster.iter().copied().filter(|u| *u != host).collect();
        turn_order.dedup();
        if turn_order.is_empty() {
            return Err(RoomError::MatchSetup("no participants besides the host".into()));
        }
        if rules.question_budget == 0 || rules.guesses_per_player == 0 {
            return Err(RoomError::MatchSetup("match rules leave an empty budget".into()));
        }
        turn_order.shuffle(rng);

        let participants = turn_order
            .iter()
            .map(|&user| {
                (
                    user,
                    Participant {
                        user,
                        role: PlayerRole::Participant,
                        attempts_left: rules.guesses_per_player,
                        strikes: 0,
                    },
                )
            })
            .collect();
        let remaining_guesses = rules
            .guesses_per_player
            .saturating_mul(turn_order.len() as u32);

        let mut game = Self {
            id,
            host,
            rules,
            started_with: turn_order.clone(),
            participants,
            turn_order,
            turn_index: 0,
            questioner: None,
            remaining_questions: rules.question_budget,
            remaining_guesses,
            pending_question: None,
            guess_queue: VecDeque::new(),
            log: Vec::new(),
            host_warnings: 0,
            started_at: Instant::now(),
        };
        game.sync_questioner();
        Ok(game)
    }

    // -- Accessors ----------------------------------------------------------

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn host(&self) -> UserId {
        self.host
    }

    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    pub fn questioner(&self) -> Option<UserId> {
        self.questioner
    }

    pub fn turn_order(&self) -> &[UserId] {
        &self.turn_order
    }

    pub fn remaining_questions(&self) -> u32 {
        self.remaining_questions
    }

    pub fn remaining_guesses(&self) -> u32 {
        self.remaining_guesses
    }

    pub fn participant(&self, user: UserId) -> Option<&Participant> {
        self.participants.get(&user)
    }

    pub fn is_participant(&self, user: UserId) -> bool {
        self.participants.contains_key(&user)
    }

    /// Everyone who started the match, host first.
    pub fn players(&self) -> Vec<UserId> {
        std::iter::once(self.host)
            .chain(self.started_with.iter().copied())
            .collect()
    }

    pub fn pending_question(&self) -> Option<&PendingQuestion> {
        self.pending_question.as_ref()
    }

    /// The guess the host must judge next.
    pub fn next_guess(&self) -> Option<&AnswerAttempt> {
        self.guess_queue.front()
    }

    pub fn queued_guesses(&self) -> usize {
        self.guess_queue.len()
    }

    /// The judged log, oldest first.
    pub fn log(&self) -> &[QnaEntry] {
        &self.log
    }

    /// A copy of the log that outlives the match.
    pub fn history(&self) -> Vec<QnaEntry> {
        self.log.clone()
    }

    pub fn host_warnings(&self) -> u32 {
        self.host_warnings
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Whether a questioner is assigned and questions remain.
    pub fn validate_turn(&self) -> bool {
        self.questioner.is_some() && self.remaining_questions > 0
    }

    /// Whether the host currently owes an answer or a judgment.
    pub fn owes_host(&self) -> bool {
        self.pending_question.is_some() || !self.guess_queue.is_empty()
    }

    pub fn view(&self) -> MatchView {
        MatchView {
            match_id: self.id,
            host: self.host,
            questioner: self.questioner,
            turn_order: self.turn_order.clone(),
            remaining_questions: self.remaining_questions,
            remaining_guesses: self.remaining_guesses,
            pending_guesses: self.guess_queue.len(),
            history: self.history(),
        }
    }

    // -- Budgets ------------------------------------------------------------

    /// Takes one question from the shared budget.
    pub fn debit_question(&mut self) -> Result<u32, RoomError> {
        if self.remaining_questions == 0 {
            return Err(RoomError::NoQuestionsLeft);
        }
        self.remaining_questions -= 1;
        Ok(self.remaining_questions)
    }

    /// Takes one guess from the shared budget.
    pub fn debit_guess(&mut self) -> Result<u32, RoomError> {
        if self.remaining_guesses == 0 {
            return Err(RoomError::NoGuessesLeft);
        }
        self.remaining_guesses -= 1;
        Ok(self.remaining_guesses)
    }

    // -- Questions ----------------------------------------------------------

    /// Records a question from the current questioner.
    ///
    /// Asking clears the asker's strikes.
    pub fn ask(&mut self, user: UserId, text: &str) -> Result<(), RoomError> {
        if !self.participants.contains_key(&user) {
            return Err(RoomError::NotParticipant(user));
        }
        if self.questioner != Some(user) {
            return Err(RoomError::NotYourTurn(user));
        }
        if self.remaining_questions == 0 {
            return Err(RoomError::NoQuestionsLeft);
        }
        if self.pending_question.is_some() {
            return Err(RoomError::QuestionPending);
        }

        self.pending_question = Some(PendingQuestion {
            asker: user,
            text: text.to_string(),
        });
        if let Some(p) = self.participants.get_mut(&user) {
            p.strikes = 0;
        }
        Ok(())
    }

    /// Applies the host's answer to the pending question.
    pub fn answer_question(&mut self, status: AnswerStatus) -> Result<QnaEntry, RoomError> {
        if !status.answers_question() {
            return Err(RoomError::InvalidStatus(status));
        }
        if self.pending_question.is_none() {
            return Err(RoomError::NoPendingQuestion);
        }
        self.debit_question()?;

        let Some(question) = self.pending_question.take() else {
            return Err(RoomError::NoPendingQuestion);
        };
        let entry = QnaEntry {
            kind: EntryKind::Question,
            asker: question.asker,
            text: question.text,
            status,
        };
        self.log.push(entry.clone());
        Ok(entry)
    }

    /// Drops the pending question if `user` asked it.
    pub fn discard_question_from(&mut self, user: UserId) -> bool {
        if self.pending_question.as_ref().is_some_and(|q| q.asker == user) {
            self.pending_question = None;
            true
        } else {
            false
        }
    }

    // -- Guesses ------------------------------------------------------------

    /// Queues a guess, spending one of the player's personal attempts.
    pub fn enqueue_guess(&mut self, user: UserId, text: &str) -> Result<AnswerAttempt, RoomError> {
        let participant = self
            .participants
            .get_mut(&user)
            .ok_or(RoomError::NotParticipant(user))?;
        if participant.attempts_left == 0 {
            return Err(RoomError::AttemptsExhausted(user));
        }
        participant.attempts_left -= 1;

        let attempt = AnswerAttempt::new(user, text);
        self.guess_queue.push_back(attempt.clone());
        Ok(attempt)
    }

    /// Judges the head of the queue.
    ///
    /// `attempt` must equal the head exactly. Anything else is a judgment
    /// that raced a newer submission and is rejected.
    pub fn judge_guess(
        &mut self,
        attempt: &AnswerAttempt,
        status: AnswerStatus,
    ) -> Result<QnaEntry, RoomError> {
        if !status.judges_guess() {
            return Err(RoomError::InvalidStatus(status));
        }
        if self.guess_queue.front() != Some(attempt) {
            return Err(RoomError::StaleOrInvalidGuess);
        }
        self.debit_guess()?;

        let Some(judged) = self.guess_queue.pop_front() else {
            return Err(RoomError::StaleOrInvalidGuess);
        };
        let entry = QnaEntry {
            kind: EntryKind::Guess,
            asker: judged.user,
            text: judged.text,
            status,
        };
        self.log.push(entry.clone());
        Ok(entry)
    }

    // -- Turns --------------------------------------------------------------

    /// Moves the turn to the next player in round-robin order.
    pub fn advance_turn(&mut self) -> Option<UserId> {
        if self.turn_order.is_empty() {
            self.turn_index = 0;
        } else {
            self.turn_index = (self.turn_index + 1) % self.turn_order.len();
        }
        self.sync_questioner();
        self.questioner
    }

    /// Adds a strike to `user` and returns their new count.
    pub fn strike(&mut self, user: UserId) -> Result<u32, RoomError> {
        let participant = self
            .participants
            .get_mut(&user)
            .ok_or(RoomError::NotParticipant(user))?;
        participant.strikes += 1;
        Ok(participant.strikes)
    }

    /// Takes a participant out of the match.
    ///
    /// Their unused personal attempts are deducted from the shared guess
    /// budget. Guesses they already queued stay in the queue. The turn
    /// pointer keeps pointing at the same surviving player, or at the
    /// player after the removed one if the removed one held the turn.
    pub fn remove_participant(&mut self, user: UserId) -> Result<Removal, RoomError> {
        let participant = self
            .participants
            .remove(&user)
            .ok_or(RoomError::NotParticipant(user))?;

        let forfeited = participant.attempts_left;
        self.remaining_guesses = self.remaining_guesses.saturating_sub(forfeited);
        let was_questioner = self.questioner == Some(user);

        if let Some(pos) = self.turn_order.iter().position(|u| *u == user) {
            self.turn_order.remove(pos);
            if self.turn_order.is_empty() {
                self.turn_index = 0;
            } else if pos < self.turn_index {
                self.turn_index -= 1;
            } else if pos == self.turn_index && self.turn_index >= self.turn_order.len() {
                self.turn_index = 0;
            }
        }
        self.sync_questioner();

        let dropped_question = self.discard_question_from(user);
        Ok(Removal {
            forfeited,
            was_questioner,
            dropped_question,
        })
    }

    // -- Host escalation ----------------------------------------------------

    /// Counts a missed host deadline and returns the new total.
    pub fn warn_host(&mut self) -> u32 {
        self.host_warnings += 1;
        self.host_warnings
    }

    pub fn reset_host_warnings(&mut self) {
        self.host_warnings = 0;
    }

    /// Points `questioner` at `turn_order[turn_index]` and fixes roles.
    fn sync_questioner(&mut self) {
        let next = self.turn_order.get(self.turn_index).copied();
        if next == self.questioner {
            return;
        }
        if let Some(previous) = self.questioner.and_then(|u| self.participants.get_mut(&u)) {
            previous.role = PlayerRole::Participant;
        }
        if let Some(current) = next.and_then(|u| self.participants.get_mut(&u)) {
            current.role = PlayerRole::Questioner;
        }
        self.questioner = next;
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    const HOST: UserId = UserId(1);

    fn uid(id: u64) -> UserId {
        UserId(id)
    }

    /// A match with `n` participants (ids 2..) in a known order.
    fn game_with(n: u64) -> Match {
        let roster: Vec<UserId> = (1..=n + 1).map(uid).collect();
        let mut game = Match::new(
            MatchId(1),
            HOST,
            &roster,
            MatchRules::default(),
            &mut StdRng::seed_from_u64(7),
        )
        .unwrap();
        game.turn_order = (2..=n + 1).map(uid).collect();
        game.turn_index = 0;
        game.questioner = None;
        for p in game.participants.values_mut() {
            p.role = PlayerRole::Participant;
        }
        game.sync_questioner();
        game
    }

    fn assert_questioner_is_live(game: &Match) {
        match game.questioner() {
            Some(q) => {
                assert!(game.turn_order().contains(&q));
                assert_eq!(game.participant(q).unwrap().role, PlayerRole::Questioner);
            }
            None => assert!(game.turn_order().is_empty()),
        }
    }

    // -- Construction -------------------------------------------------------

    #[test]
    fn test_new_match_seeds_budgets() {
        let roster = [HOST, uid(2), uid(3)];
        let game = Match::new(
            MatchId(1),
            HOST,
            &roster,
            MatchRules::default(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();
        assert_eq!(game.turn_order().len(), 2);
        assert!(!game.turn_order().contains(&HOST));
        assert_eq!(game.remaining_questions(), 30);
        assert_eq!(game.remaining_guesses(), 6);
        assert_eq!(game.questioner(), Some(game.turn_order()[0]));
        assert_eq!(game.players()[0], HOST);
        assert_questioner_is_live(&game);
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let roster: Vec<UserId> = (1..=6).map(uid).collect();
        for seed in 0..20 {
            let game = Match::new(
                MatchId(1),
                HOST,
                &roster,
                MatchRules::default(),
                &mut StdRng::seed_from_u64(seed),
            )
            .unwrap();
            let mut order = game.turn_order().to_vec();
            order.sort();
            assert_eq!(order, (2..=6).map(uid).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_new_match_without_participants_fails() {
        let result = Match::new(
            MatchId(1),
            HOST,
            &[HOST],
            MatchRules::default(),
            &mut StdRng::seed_from_u64(1),
        );
        assert!(matches!(result, Err(RoomError::MatchSetup(_))));
    }

    // -- Turns --------------------------------------------------------------

    #[test]
    fn test_advance_turn_is_round_robin() {
        let mut game = game_with(3);
        assert_eq!(game.questioner(), Some(uid(2)));
        assert_eq!(game.advance_turn(), Some(uid(3)));
        assert_eq!(game.advance_turn(), Some(uid(4)));
        assert_eq!(game.advance_turn(), Some(uid(2)));
        assert_eq!(game.participant(uid(4)).unwrap().role, PlayerRole::Participant);
        assert_questioner_is_live(&game);
    }

    #[test]
    fn test_remove_before_pointer_keeps_questioner() {
        let mut game = game_with(3);
        game.advance_turn(); // questioner = 3
        game.remove_participant(uid(2)).unwrap();
        assert_eq!(game.questioner(), Some(uid(3)));
        assert_eq!(game.turn_order(), &[uid(3), uid(4)]);
    }

    #[test]
    fn test_remove_at_pointer_moves_to_next() {
        let mut game = game_with(3);
        game.advance_turn(); // questioner = 3
        let removal = game.remove_participant(uid(3)).unwrap();
        assert!(removal.was_questioner);
        assert_eq!(game.questioner(), Some(uid(4)));
    }

    #[test]
    fn test_remove_last_slot_at_pointer_wraps() {
        let mut game = game_with(3);
        game.advance_turn();
        game.advance_turn(); // questioner = 4, last slot
        game.remove_participant(uid(4)).unwrap();
        assert_eq!(game.questioner(), Some(uid(2)));
    }

    #[test]
    fn test_remove_after_pointer_keeps_questioner() {
        let mut game = game_with(3);
        game.remove_participant(uid(4)).unwrap();
        assert_eq!(game.questioner(), Some(uid(2)));
    }

    #[test]
    fn test_questioner_stays_live_for_every_removal() {
        for n in 1..=5u64 {
            for pointer in 0..n {
                for victim in 0..n {
                    let mut game = game_with(n);
                    for _ in 0..pointer {
                        game.advance_turn();
                    }
                    game.remove_participant(uid(victim + 2)).unwrap();
                    assert_questioner_is_live(&game);
                }
            }
        }
    }

    #[test]
    fn test_removing_everyone_clears_questioner() {
        let mut game = game_with(2);
        game.remove_participant(uid(2)).unwrap();
        game.remove_participant(uid(3)).unwrap();
        assert_eq!(game.questioner(), None);
        assert!(!game.validate_turn());
        assert_eq!(game.advance_turn(), None);
    }

    #[test]
    fn test_removal_forfeits_personal_attempts_only() {
        let mut game = game_with(2);
        game.enqueue_guess(uid(2), "a ghost").unwrap();
        let removal = game.remove_participant(uid(2)).unwrap();
        assert_eq!(removal.forfeited, 2);
        assert_eq!(game.remaining_guesses(), 4);
        // The queued guess survives its author.
        assert_eq!(game.queued_guesses(), 1);
        assert!(matches!(
            game.remove_participant(uid(2)),
            Err(RoomError::NotParticipant(_))
        ));
    }

    #[test]
    fn test_removing_asker_drops_pending_question() {
        let mut game = game_with(2);
        game.ask(uid(2), "Is it night?").unwrap();
        let removal = game.remove_participant(uid(2)).unwrap();
        assert!(removal.dropped_question);
        assert!(game.pending_question().is_none());
    }

    // -- Questions ----------------------------------------------------------

    #[test]
    fn test_ask_validations() {
        let mut game = game_with(2);
        assert!(matches!(game.ask(HOST, "?"), Err(RoomError::NotParticipant(_))));
        assert!(matches!(game.ask(uid(3), "?"), Err(RoomError::NotYourTurn(_))));
        game.ask(uid(2), "Is it night?").unwrap();
        assert!(matches!(game.ask(uid(2), "again?"), Err(RoomError::QuestionPending)));
    }

    #[test]
    fn test_answer_debits_question_budget() {
        let mut game = game_with(2);
        game.ask(uid(2), "Is it night?").unwrap();
        let entry = game.answer_question(AnswerStatus::Yes).unwrap();
        assert_eq!(entry.kind, EntryKind::Question);
        assert_eq!(entry.asker, uid(2));
        assert_eq!(game.remaining_questions(), 29);
        assert_eq!(game.log().len(), 1);
        assert!(matches!(
            game.answer_question(AnswerStatus::No),
            Err(RoomError::NoPendingQuestion)
        ));
    }

    #[test]
    fn test_answer_rejects_guess_statuses() {
        let mut game = game_with(2);
        game.ask(uid(2), "Is it night?").unwrap();
        assert!(matches!(
            game.answer_question(AnswerStatus::Correct),
            Err(RoomError::InvalidStatus(AnswerStatus::Correct))
        ));
        assert_eq!(game.remaining_questions(), 30);
        assert!(game.pending_question().is_some());
    }

    #[test]
    fn test_question_budget_never_underflows() {
        let mut game = game_with(1);
        game.remaining_questions = 1;
        assert_eq!(game.debit_question().unwrap(), 0);
        assert!(matches!(game.debit_question(), Err(RoomError::NoQuestionsLeft)));
        assert_eq!(game.remaining_questions(), 0);
        assert!(matches!(game.ask(uid(2), "?"), Err(RoomError::NoQuestionsLeft)));
        assert!(!game.validate_turn());
    }

    #[test]
    fn test_ask_resets_strikes() {
        let mut game = game_with(2);
        game.strike(uid(2)).unwrap();
        game.ask(uid(2), "Is it night?").unwrap();
        assert_eq!(game.participant(uid(2)).unwrap().strikes, 0);
    }

    // -- Guesses ------------------------------------------------------------

    #[test]
    fn test_guesses_are_judged_fifo() {
        let mut game = game_with(3);
        let a = game.enqueue_guess(uid(3), "a plane").unwrap();
        let b = game.enqueue_guess(uid(2), "a boat").unwrap();
        let c = game.enqueue_guess(uid(4), "a train").unwrap();

        assert_eq!(game.next_guess(), Some(&a));
        assert!(matches!(
            game.judge_guess(&b, AnswerStatus::Incorrect),
            Err(RoomError::StaleOrInvalidGuess)
        ));
        game.judge_guess(&a, AnswerStatus::Incorrect).unwrap();
        assert_eq!(game.next_guess(), Some(&b));
        game.judge_guess(&b, AnswerStatus::Incorrect).unwrap();
        let last = game.judge_guess(&c, AnswerStatus::Correct).unwrap();
        assert_eq!(last.asker, uid(4));
        assert_eq!(game.remaining_guesses(), 6);
        assert_eq!(game.queued_guesses(), 0);
    }

    #[test]
    fn test_judge_requires_exact_text() {
        let mut game = game_with(2);
        game.enqueue_guess(uid(2), "a plane").unwrap();
        let wrong = AnswerAttempt::new(uid(2), "a plane!");
        assert!(matches!(
            game.judge_guess(&wrong, AnswerStatus::Correct),
            Err(RoomError::StaleOrInvalidGuess)
        ));
        assert_eq!(game.remaining_guesses(), 6);
    }

    #[test]
    fn test_personal_attempts_run_out() {
        let mut game = game_with(2);
        for _ in 0..3 {
            game.enqueue_guess(uid(2), "guess").unwrap();
        }
        assert!(matches!(
            game.enqueue_guess(uid(2), "guess"),
            Err(RoomError::AttemptsExhausted(_))
        ));
        assert_eq!(game.participant(uid(2)).unwrap().attempts_left, 0);
        assert_eq!(game.queued_guesses(), 3);
    }

    #[test]
    fn test_guess_budget_never_underflows() {
        let mut game = game_with(1);
        game.remaining_guesses = 0;
        assert!(matches!(game.debit_guess(), Err(RoomError::NoGuessesLeft)));
        assert_eq!(game.remaining_guesses(), 0);
    }

    #[test]
    fn test_owes_host_tracks_prompts() {
        let mut game = game_with(2);
        assert!(!game.owes_host());
        game.ask(uid(2), "?").unwrap();
        assert!(game.owes_host());
        game.answer_question(AnswerStatus::No).unwrap();
        assert!(!game.owes_host());
        let attempt = game.enqueue_guess(uid(3), "x").unwrap();
        assert!(game.owes_host());
        game.judge_guess(&attempt, AnswerStatus::Incorrect).unwrap();
        assert!(!game.owes_host());
    }

    #[test]
    fn test_host_warnings_count_and_reset() {
        let mut game = game_with(1);
        assert_eq!(game.warn_host(), 1);
        assert_eq!(game.warn_host(), 2);
        game.reset_host_warnings();
        assert_eq!(game.host_warnings(), 0);
    }
}
