//! Match commands: start, questions, guesses, turns and teardown.

use riddlehall_protocol::{
    AnswerAttempt, AnswerStatus, EndReason, MatchEnd, MatchView, PassReason, RemovalReason,
    RoomState, ServerEvent, UserChannel, UserId,
};

use super::{Followup, HostEscalation, MatchTimer, RoomActor};
use crate::game::Match;
use crate::hooks::MatchOutcome;
use crate::RoomError;

impl RoomActor {
    // -- Start --------------------------------------------------------------

    /// Starts a match. Only one start can ever win: the state moves to
    /// `Starting` before the match is built and to `Playing` after.
    pub(super) fn handle_start(&mut self, user: UserId) -> Result<MatchView, RoomError> {
        match self.room.state {
            RoomState::Starting => return Err(RoomError::AlreadyStarting),
            RoomState::Playing => return Err(RoomError::AlreadyPlaying),
            RoomState::Waiting => {}
        }
        if !self.room.contains(user) {
            return Err(RoomError::NotInRoom(user, self.room.id));
        }
        if !self.room.is_host(user) {
            return Err(RoomError::NotHost(user));
        }
        if self.room.puzzle.is_none() {
            return Err(RoomError::NoPuzzleSelected);
        }
        if self.room.len() < 2 {
            return Err(RoomError::NotEnoughPlayers(self.room.len()));
        }
        if !self.room.all_ready() {
            return Err(RoomError::PlayersNotReady);
        }

        self.room.state = RoomState::Starting;
        let match_id = self.room.next_match_id();
        let roster = self.room.members().to_vec();
        let game = match Match::new(match_id, user, &roster, self.config.rules, &mut rand::rng()) {
            Ok(game) => game,
            Err(err) => {
                self.room.state = RoomState::Waiting;
                tracing::warn!(room_id = %self.room.id, error = %err, "match setup failed");
                return Err(err);
            }
        };

        self.cancel_countdown();
        self.room.pending_transfer = None;
        let view = game.view();
        self.room.active = Some(game);
        self.room.state = RoomState::Playing;
        self.arm_match_timer(
            MatchTimer::Duration(match_id),
            self.room.settings.match_duration(),
        );

        tracing::info!(
            room_id = %self.room.id,
            match_id = %match_id,
            players = roster.len(),
            questioner = ?view.questioner,
            "match started"
        );
        self.to_room(ServerEvent::MatchStarted {
            room_id: self.room.id,
            game: view.clone(),
        });
        self.room_updated();
        Ok(view)
    }

    // -- Questions ----------------------------------------------------------

    pub(super) fn handle_ask(&mut self, user: UserId, text: &str) -> Result<(), RoomError> {
        let room_id = self.room.id;
        let game = self
            .room
            .active
            .as_mut()
            .ok_or(RoomError::NoActiveMatch(room_id))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(RoomError::EmptyText);
        }
        game.ask(user, text)?;
        let host = game.host();

        tracing::debug!(room_id = %room_id, user_id = %user, "question asked");
        let event = ServerEvent::QuestionAsked {
            room_id,
            asker: user,
            text: text.to_string(),
        };
        self.notify(host, UserChannel::Match, event.clone());
        self.to_match(event);
        self.refresh_host_timer();
        Ok(())
    }

    pub(super) fn handle_respond_question(
        &mut self,
        user: UserId,
        status: AnswerStatus,
    ) -> Result<Followup, RoomError> {
        let room_id = self.room.id;
        let game = self
            .room
            .active
            .as_mut()
            .ok_or(RoomError::NoActiveMatch(room_id))?;
        if game.host() != user {
            return Err(RoomError::NotHost(user));
        }
        let entry = game.answer_question(status)?;
        let remaining_questions = game.remaining_questions();

        tracing::debug!(room_id = %room_id, ?status, remaining_questions, "question answered");
        self.to_match(ServerEvent::QuestionAnswered {
            room_id,
            entry,
            remaining_questions,
        });
        self.host_responded();
        Ok(self.continue_turn())
    }

    // -- Guesses ------------------------------------------------------------

    /// Queues a guess. The host is prompted as soon as it reaches the head.
    pub(super) fn handle_submit_guess(
        &mut self,
        user: UserId,
        text: &str,
    ) -> Result<AnswerAttempt, RoomError> {
        let room_id = self.room.id;
        let game = self
            .room
            .active
            .as_mut()
            .ok_or(RoomError::NoActiveMatch(room_id))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(RoomError::EmptyText);
        }
        let attempt = game.enqueue_guess(user, text)?;
        let queued = game.queued_guesses();
        let host = game.host();

        tracing::debug!(room_id = %room_id, user_id = %user, queued, "guess queued");
        self.to_match(ServerEvent::GuessSubmitted {
            room_id,
            user,
            queued,
        });
        if queued == 1 {
            self.notify(
                host,
                UserChannel::Match,
                ServerEvent::GuessToJudge {
                    room_id,
                    attempt: attempt.clone(),
                },
            );
        }
        self.refresh_host_timer();
        Ok(attempt)
    }

    /// Judges the head of the guess queue.
    ///
    /// A correct guess wins. An empty shared budget ends the match.
    /// Otherwise the next queued guess is up, or the turn moves on.
    pub(super) fn handle_judge_guess(
        &mut self,
        user: UserId,
        attempt: AnswerAttempt,
        status: AnswerStatus,
    ) -> Result<Followup, RoomError> {
        let room_id = self.room.id;
        let game = self
            .room
            .active
            .as_mut()
            .ok_or(RoomError::NoActiveMatch(room_id))?;
        if game.host() != user {
            return Err(RoomError::NotHost(user));
        }
        let entry = game.judge_guess(&attempt, status)?;
        let remaining_guesses = game.remaining_guesses();

        tracing::debug!(
            room_id = %room_id,
            guesser = %attempt.user,
            ?status,
            remaining_guesses,
            "guess judged"
        );
        self.to_match(ServerEvent::GuessJudged {
            room_id,
            entry,
            remaining_guesses,
        });
        self.host_responded();

        if status == AnswerStatus::Correct {
            return Ok(self.end_match(EndReason::CorrectAnswer, Some(attempt.user), None));
        }
        if remaining_guesses == 0 {
            return Ok(self.end_match(EndReason::ExhaustedAttempts, None, None));
        }
        Ok(self.continue_turn())
    }

    // -- Turns --------------------------------------------------------------

    /// Ends the current questioner's turn.
    ///
    /// A timed-out turn is a strike; too many strikes in a row and the
    /// questioner is taken out of the match.
    pub(super) fn handle_pass_turn(
        &mut self,
        user: UserId,
        reason: PassReason,
    ) -> Result<Followup, RoomError> {
        let room_id = self.room.id;
        let game = self
            .room
            .active
            .as_mut()
            .ok_or(RoomError::NoActiveMatch(room_id))?;
        if !game.is_participant(user) {
            return Err(RoomError::NotParticipant(user));
        }
        if game.questioner() != Some(user) {
            return Err(RoomError::NotYourTurn(user));
        }

        if reason == PassReason::Timeout {
            let strikes = game.strike(user)?;
            let limit = game.rules().questioner_strikes;
            tracing::debug!(room_id = %room_id, user_id = %user, strikes, limit, "turn timed out");
            if strikes >= limit {
                tracing::info!(room_id = %room_id, user_id = %user, "questioner removed after repeated timeouts");
                self.notify(
                    user,
                    UserChannel::Match,
                    ServerEvent::ForcedOut {
                        room_id,
                        reason: RemovalReason::QuestionerTimeout,
                    },
                );
                return Ok(self.drop_participant(user, true));
            }
        }

        game.discard_question_from(user);
        let questioner = game.advance_turn();
        self.to_match(ServerEvent::TurnChanged {
            room_id,
            questioner,
        });
        self.refresh_host_timer();
        Ok(Followup::NextQuestioner(questioner))
    }

    /// After a host response: prompt the next queued guess, or move the
    /// turn on. While the questioner's question is unanswered the turn
    /// stays with them; answering it is what moves the turn.
    fn continue_turn(&mut self) -> Followup {
        let room_id = self.room.id;
        let Some(game) = self.room.active.as_mut() else {
            return Followup::NextQuestioner(None);
        };

        if let Some(next) = game.next_guess().cloned() {
            let host = game.host();
            self.notify(
                host,
                UserChannel::Match,
                ServerEvent::GuessToJudge {
                    room_id,
                    attempt: next.clone(),
                },
            );
            self.refresh_host_timer();
            return Followup::JudgeNext(next);
        }
        if game.pending_question().is_some() {
            let questioner = game.questioner();
            self.refresh_host_timer();
            return Followup::NextQuestioner(questioner);
        }

        let questioner = game.advance_turn();
        self.to_match(ServerEvent::TurnChanged {
            room_id,
            questioner,
        });
        self.refresh_host_timer();
        Followup::NextQuestioner(questioner)
    }

    // -- Removal ------------------------------------------------------------

    /// Takes a participant out of the match. Ends it if only the host is
    /// left. The player stays on the room roster. `forced` marks a removal
    /// the player did not ask for.
    pub(super) fn drop_participant(&mut self, user: UserId, forced: bool) -> Followup {
        let room_id = self.room.id;
        let Some(game) = self.room.active.as_mut() else {
            return Followup::NextQuestioner(None);
        };
        let removal = match game.remove_participant(user) {
            Ok(removal) => removal,
            Err(_) => return Followup::NextQuestioner(game.questioner()),
        };
        let turn_order = game.turn_order().to_vec();
        let remaining_guesses = game.remaining_guesses();
        let questioner = game.questioner();

        tracing::info!(
            room_id = %room_id,
            user_id = %user,
            forfeited = removal.forfeited,
            left = turn_order.len(),
            "participant removed from match"
        );
        let only_host = turn_order.is_empty();
        self.to_match(ServerEvent::RosterChanged {
            room_id,
            removed: user,
            turn_order,
            remaining_guesses,
        });

        if only_host {
            return self.end_match(EndReason::OnlyHost, None, forced.then_some(user));
        }
        if removal.was_questioner {
            self.to_match(ServerEvent::TurnChanged {
                room_id,
                questioner,
            });
        }
        self.refresh_host_timer();
        Followup::NextQuestioner(questioner)
    }

    /// Removes the host from the room and ends the match.
    pub(super) fn remove_host(&mut self, host: UserId, reason: RemovalReason) -> Option<MatchEnd> {
        let room_id = self.room.id;
        self.room.remove_player(host);
        self.store.clear_user_room(host, room_id);

        tracing::warn!(room_id = %room_id, user_id = %host, ?reason, "host removed");
        self.notify(
            host,
            UserChannel::Match,
            ServerEvent::ForcedOut { room_id, reason },
        );
        self.to_room(ServerEvent::PlayerLeft {
            room_id,
            user: host,
        });
        self.finish_match(EndReason::LeaveHost, None, Some(host))
    }

    /// Only the host may report its own missed deadline.
    pub(super) fn handle_report_host_timeout(
        &mut self,
        user: UserId,
    ) -> Result<HostEscalation, RoomError> {
        let room_id = self.room.id;
        let game = self
            .room
            .active
            .as_ref()
            .ok_or(RoomError::NoActiveMatch(room_id))?;
        if game.host() != user {
            return Err(RoomError::NotHost(user));
        }
        if !game.owes_host() {
            return Err(RoomError::HostNotAwaited);
        }
        Ok(self.escalate_host())
    }

    // -- Teardown -----------------------------------------------------------

    fn end_match(
        &mut self,
        reason: EndReason,
        winner: Option<UserId>,
        forced_out: Option<UserId>,
    ) -> Followup {
        match self.finish_match(reason, winner, forced_out) {
            Some(end) => Followup::Ended(end),
            None => Followup::NextQuestioner(None),
        }
    }

    /// Ends the active match and turns the room back into a lobby.
    ///
    /// Timers go first so nothing from this match can fire into the next
    /// one. Stats are best-effort.
    pub(super) fn finish_match(
        &mut self,
        reason: EndReason,
        winner: Option<UserId>,
        forced_out: Option<UserId>,
    ) -> Option<MatchEnd> {
        self.match_timers.cancel_all();
        let game = self.room.active.take()?;
        let room_id = self.room.id;
        let match_id = game.id();

        let outcome = MatchOutcome {
            room_id,
            match_id,
            reason,
            participants: game.players(),
            winner,
        };
        if let Err(err) = self.services.stats.record_match_outcome(&outcome) {
            tracing::warn!(room_id = %room_id, match_id = %match_id, error = %err, "failed to record match outcome");
        }

        let end = MatchEnd {
            match_id,
            reason,
            winner,
            forced_out,
            answer: self.room.puzzle.as_ref().map(|p| p.answer.clone()),
            play_time_secs: game.elapsed().as_secs(),
            history: game.history(),
        };
        tracing::info!(
            room_id = %room_id,
            match_id = %match_id,
            %reason,
            winner = ?winner,
            play_time_secs = end.play_time_secs,
            "match ended"
        );

        self.room.state = RoomState::Waiting;
        self.ensure_host(Some(game.host()));
        self.room.reset_for_lobby();

        self.to_match(ServerEvent::MatchEnded {
            room_id,
            result: end.clone(),
        });
        self.to_room(ServerEvent::ReturnedToLobby {
            room: self.room.snapshot(true),
        });
        Some(end)
    }
}
