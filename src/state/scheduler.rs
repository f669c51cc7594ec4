//! Timed room progression: bot turns, post-word pauses, bot votes, tiebreaks
//! and round changes.
//!
//! Every task holds a weak reference to its room plus the room epoch seen when
//! it was scheduled. On wake-up it re-checks that the room is still registered
//! and that nothing moved on in the meantime; otherwise it does nothing.

use super::registry::RoomHandle;
use super::AppState;
use crate::game::{AfterDeparture, GameRoom, TallyOutcome, TurnStep, WordSwap};
use crate::protocol::ServerMessage;
use crate::types::*;
use rand::Rng;
use std::future::Future;
use std::ops::Range;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::time::Duration;

type RoomTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

fn roll(room: &mut GameRoom, range: &Range<Duration>) -> Duration {
    let (lo, hi) = (range.start.as_millis() as u64, range.end.as_millis() as u64);
    if lo >= hi {
        return range.start;
    }
    Duration::from_millis(room.rng().random_range(lo..hi))
}

impl AppState {
    fn spawn_for(&self, handle: &Arc<RoomHandle>, task: RoomTask) {
        let join = tokio::spawn(task);
        handle.track(join.abort_handle());
    }

    /// Upgrade a task's room reference if that room is still registered
    async fn live_handle(&self, weak: &Weak<RoomHandle>) -> Option<Arc<RoomHandle>> {
        let handle = weak.upgrade()?;
        if self.registry.is_live(&handle).await {
            Some(handle)
        } else {
            tracing::debug!(room = %handle.code, "Timer fired for a removed room");
            None
        }
    }

    pub(crate) fn publish_snapshot(&self, handle: &RoomHandle, room: &GameRoom) {
        handle.notify_room(ServerMessage::RoomUpdated {
            room: room.snapshot(),
        });
    }

    /// Every human has seen their role
    pub(crate) fn begin_playing(&self, handle: &Arc<RoomHandle>, room: &mut GameRoom) {
        let current = room.start_playing_phase();
        handle.notify_room(ServerMessage::PlayingPhaseStarted {
            current_player: current,
            player_order: room.player_order.clone(),
            round_number: room.round_number,
        });
        self.writer_bots_act(handle, room);
        self.on_turn(handle, room);
    }

    /// If a bot holds the turn, let it think and then speak
    fn on_turn(&self, handle: &Arc<RoomHandle>, room: &mut GameRoom) {
        let Some(current) = room.current_player().cloned() else {
            return;
        };
        if !room.is_bot(&current) {
            return;
        }

        handle.notify_room(ServerMessage::BotThinking {
            bot_id: current.clone(),
        });

        let think = roll(room, &self.timings.bot_think) + self.timings.bot_decision;
        let delay = self.timings.scaled(think);
        let epoch = room.epoch;
        let weak = Arc::downgrade(handle);
        let state = self.clone();

        self.spawn_for(
            handle,
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                let Some(handle) = state.live_handle(&weak).await else {
                    return;
                };
                let mut room = handle.room.lock().await;
                if room.epoch != epoch {
                    tracing::debug!(room = %handle.code, bot = %current, "Stale bot turn");
                    return;
                }
                let Some(word) = room.bot_word(&current) else {
                    return;
                };
                match room.submit_word(&current, &word) {
                    Ok(record) => state.word_accepted(&handle, &mut room, record),
                    Err(e) => tracing::warn!(room = %handle.code, bot = %current, "Bot word rejected: {}", e),
                }
            }),
        );
    }

    /// Announce a word and schedule the end of the turn
    pub(crate) fn word_accepted(
        &self,
        handle: &Arc<RoomHandle>,
        room: &mut GameRoom,
        record: WordRecord,
    ) {
        handle.notify_room(ServerMessage::WordSubmitted {
            player_id: record.player_id.clone(),
            player_name: record.player_name.clone(),
            word: record.word.clone(),
        });

        // Detective bots follow their word with a question
        if let Some(target) = room.bot_interrogation_target(&record.player_id) {
            if let Err(e) = room.interrogate(&record.player_id, &target) {
                tracing::warn!(room = %handle.code, "Bot interrogation failed: {}", e);
            }
        }

        let delay = self.timings.scaled(room.config.word_delay());
        let epoch = room.epoch;
        let weak = Arc::downgrade(handle);
        let state = self.clone();

        self.spawn_for(
            handle,
            Box::pin(async move {
                tokio::time::sleep(delay).await;
                let Some(handle) = state.live_handle(&weak).await else {
                    return;
                };
                let mut room = handle.room.lock().await;
                if room.epoch != epoch {
                    tracing::debug!(room = %handle.code, "Stale turn end");
                    return;
                }
                match room.conclude_turn() {
                    TurnStep::Next(current_player) => {
                        handle.notify_room(ServerMessage::NextPlayer { current_player });
                        state.on_turn(&handle, &mut room);
                    }
                    TurnStep::VotingOpened => state.begin_voting(&handle, &mut room),
                }
            }),
        );
    }

    /// Voting is open: announce it and line up the bots' votes
    pub(crate) fn begin_voting(&self, handle: &Arc<RoomHandle>, room: &mut GameRoom) {
        handle.notify_room(ServerMessage::VotingStarted {
            players: room.alive_ids(),
        });
        let (voted, total) = room.vote_progress();
        handle.notify_room(ServerMessage::VoteProgress { voted, total });

        let bots = room.alive_bot_ids();
        if bots.is_empty() {
            return;
        }
        let pauses: Vec<Duration> = bots
            .iter()
            .map(|_| {
                let pause = roll(room, &self.timings.bot_vote) + self.timings.bot_decision;
                self.timings.scaled(pause)
            })
            .collect();

        let epoch = room.epoch;
        let weak = Arc::downgrade(handle);
        let state = self.clone();

        self.spawn_for(
            handle,
            Box::pin(async move {
                for (bot_id, pause) in bots.into_iter().zip(pauses) {
                    tokio::time::sleep(pause).await;
                    let Some(handle) = state.live_handle(&weak).await else {
                        return;
                    };
                    let mut room = handle.room.lock().await;
                    if room.epoch != epoch {
                        tracing::debug!(room = %handle.code, "Stale bot votes");
                        return;
                    }
                    if room.has_voted(&bot_id) || !room.is_alive(&bot_id) {
                        continue;
                    }

                    if let Some(target) = room.bot_medic_target(&bot_id) {
                        if room.remove_vote(&bot_id, &target).is_ok() {
                            state.vote_removed(&handle, &room, &target);
                        }
                    }

                    let Some(target) = room.bot_vote(&bot_id) else {
                        continue;
                    };
                    match room.submit_vote(&bot_id, &target) {
                        Ok(()) => {
                            tracing::debug!(room = %handle.code, bot = %bot_id, target = %target, "Bot voted");
                            state.vote_accepted(&handle, &mut room);
                        }
                        Err(e) => tracing::warn!(room = %handle.code, bot = %bot_id, "Bot vote rejected: {}", e),
                    }
                }
            }),
        );
    }

    /// Broadcast progress; tally once every alive player has voted
    pub(crate) fn vote_accepted(&self, handle: &Arc<RoomHandle>, room: &mut GameRoom) {
        let (voted, total) = room.vote_progress();
        handle.notify_room(ServerMessage::VoteProgress { voted, total });
        handle.notify_room(ServerMessage::VoteCountsUpdated {
            counts: room.vote_counts(),
        });
        if room.all_votes_in() {
            self.run_tally(handle, room);
        }
    }

    pub(crate) fn vote_removed(&self, handle: &RoomHandle, room: &GameRoom, target: &str) {
        handle.notify_room(ServerMessage::VoteCountsUpdated {
            counts: room.vote_counts(),
        });
        handle.notify_room(ServerMessage::RoleNotification {
            kind: "medic".to_string(),
            message: format!("The medic withdrew a vote against {}", room.display_name(target)),
        });
    }

    pub(crate) fn run_tally(&self, handle: &Arc<RoomHandle>, room: &mut GameRoom) {
        let outcome = match room.eliminate_player() {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(room = %handle.code, "Tally skipped: {}", e);
                return;
            }
        };

        let epoch = room.epoch;
        let weak = Arc::downgrade(handle);
        let state = self.clone();

        match outcome {
            TallyOutcome::Tied(tied) => {
                handle.notify_room(ServerMessage::VoteTied {
                    tied_players: tied.clone(),
                });
                let delay = self.timings.scaled(self.timings.tiebreak_delay);
                self.spawn_for(
                    handle,
                    Box::pin(async move {
                        tokio::time::sleep(delay).await;
                        let Some(handle) = state.live_handle(&weak).await else {
                            return;
                        };
                        let mut room = handle.room.lock().await;
                        if room.epoch != epoch {
                            return;
                        }
                        let current_player = room.reset_for_tiebreaker(&tied);
                        handle.notify_room(ServerMessage::TiebreakerStarted {
                            players: room.player_order.clone(),
                            current_player,
                        });
                        state.on_turn(&handle, &mut room);
                    }),
                );
            }
            TallyOutcome::Eliminated {
                player_id,
                role,
                votes,
            } => {
                handle.notify_room(ServerMessage::PlayerEliminated {
                    player_id,
                    role,
                    votes,
                });
                self.publish_snapshot(handle, room);

                let delay = self.timings.scaled(room.config.vote_delay());
                self.spawn_for(
                    handle,
                    Box::pin(async move {
                        tokio::time::sleep(delay).await;
                        let Some(handle) = state.live_handle(&weak).await else {
                            return;
                        };
                        let mut room = handle.room.lock().await;
                        if room.epoch != epoch {
                            return;
                        }
                        match room.check_win_condition() {
                            Some(winner) => state.finish_game(&handle, &mut room, winner),
                            None => state.begin_round(&handle, &mut room),
                        }
                    }),
                );
            }
        }
    }

    fn begin_round(&self, handle: &Arc<RoomHandle>, room: &mut GameRoom) {
        let current_player = room.start_new_round();
        handle.notify_room(ServerMessage::NewRound {
            round_number: room.round_number,
            current_player,
        });
        self.writer_bots_act(handle, room);
        self.on_turn(handle, room);
    }

    pub(crate) fn finish_game(&self, handle: &Arc<RoomHandle>, room: &mut GameRoom, winner: Winner) {
        room.finish(winner);
        handle.notify_room(ServerMessage::GameFinished {
            winner,
            word: room.current_word.clone(),
            players: room.player_views(true),
        });
        self.publish_snapshot(handle, room);
    }

    /// Writer bots get their swap in as the first action of a round
    fn writer_bots_act(&self, handle: &RoomHandle, room: &mut GameRoom) {
        for bot_id in room.bots_with(SpecialRole::Writer) {
            let Some((target, word)) = room.bot_writer_plan(&bot_id) else {
                continue;
            };
            match room.use_writer_ability(&bot_id, &target, &word) {
                Ok(swap) => self.word_swap_landed(handle, room, &swap),
                Err(e) => tracing::warn!(room = %handle.code, bot = %bot_id, "Bot swap rejected: {}", e),
            }
        }
    }

    /// Tell a human victim about their new word; bots were already told by the room
    pub(crate) fn word_swap_landed(&self, handle: &RoomHandle, room: &GameRoom, swap: &WordSwap) {
        if swap.success && !room.is_bot(&swap.target) {
            handle.notify_player(
                &swap.target,
                ServerMessage::WordSwapped {
                    new_word: swap.word.clone(),
                },
            );
        }
    }

    /// Carry on after a human left a game in progress
    pub(crate) fn after_departure(
        &self,
        handle: &Arc<RoomHandle>,
        room: &mut GameRoom,
        next: AfterDeparture,
    ) {
        match next {
            AfterDeparture::Nothing | AfterDeparture::Abandoned => {}
            AfterDeparture::GameOver(winner) => {
                self.finish_game(handle, room, winner);
                return;
            }
            AfterDeparture::RevealComplete => self.begin_playing(handle, room),
            AfterDeparture::TurnPassed(current_player) => {
                handle.notify_room(ServerMessage::NextPlayer { current_player });
                self.on_turn(handle, room);
            }
            AfterDeparture::VotingReady => {
                room.start_voting();
                self.begin_voting(handle, room);
            }
            AfterDeparture::TallyReady => self.run_tally(handle, room),
        }
        self.publish_snapshot(handle, room);
    }
}
