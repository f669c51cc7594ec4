//! Phase machine: waiting → revealing → playing ⇄ voting → finished

use super::ability::RoleAbility;
use super::room::GameRoom;
use crate::error::{GameError, GameResult};
use crate::types::*;
use crate::words;
use rand::seq::{IndexedRandom, SliceRandom};

pub const MIN_PLAYERS: usize = 3;
pub const MAX_WORD_LEN: usize = 30;
/// How many recent secret words are kept out of the draw
pub const USED_WORDS_MEMORY: usize = 2;

/// Outcome of closing a turn once the post-word delay has elapsed
#[derive(Debug, Clone, PartialEq)]
pub enum TurnStep {
    Next(PlayerId),
    VotingOpened,
}

impl GameRoom {
    /// Start a game from the lobby: draw the word, deal roles, brief the bots
    pub fn start_game(&mut self) -> GameResult<()> {
        if self.phase != GamePhase::Waiting {
            return Err(GameError::state("Game already in progress"));
        }
        if self.total_players() < MIN_PLAYERS {
            return Err(GameError::state(format!(
                "At least {} players are needed to start",
                MIN_PLAYERS
            )));
        }

        self.reset_game_state();

        let word = self.draw_word();
        self.impostor_clue = Some(words::clue_for(&word).to_string());
        self.current_word = Some(word);

        let mut ids: Vec<PlayerId> = self.participants().map(|p| p.id.clone()).collect();
        ids.shuffle(&mut self.rng);

        let impostor_count = self.config.num_impostors.min(ids.len() / 2);
        let (impostors, civilians) = ids.split_at(impostor_count);
        let (impostors, civilians) = (impostors.to_vec(), civilians.to_vec());

        for player in self.participants_mut() {
            player.role = Some(if impostors.contains(&player.id) {
                Role::Impostor
            } else {
                Role::Civil
            });
        }

        if self.config.roles_enabled() {
            self.deal_special_roles(&civilians, &impostors);
        }

        self.brief_bots();

        self.phase = GamePhase::Revealing;
        self.bump_epoch();

        tracing::info!(
            room = %self.code,
            players = self.total_players(),
            impostors = impostor_count,
            "Game started"
        );
        Ok(())
    }

    fn reset_game_state(&mut self) {
        self.eliminated.clear();
        self.votes.clear();
        self.vote_seq = 0;
        self.player_words.clear();
        self.word_history.clear();
        self.abilities.clear();
        self.swapped_words.clear();
        self.players_revealed.clear();
        self.player_order.clear();
        self.current_player_index = 0;
        self.round_number = 1;
        self.winner = None;
        self.locked = false;

        for player in self.participants_mut() {
            player.role = None;
            player.special_role = None;
            player.revealed = player.is_bot;
        }
    }

    /// Pick a secret word that was not used in the last two games, if possible
    fn draw_word(&mut self) -> String {
        let fresh: Vec<&str> = words::WORD_POOL
            .iter()
            .copied()
            .filter(|w| !self.used_words.iter().any(|u| u.eq_ignore_ascii_case(w)))
            .collect();
        let pool = if fresh.is_empty() {
            words::WORD_POOL
        } else {
            &fresh[..]
        };

        let word = pool.choose(&mut self.rng).copied().unwrap_or("Dog").to_string();

        self.used_words.push_back(word.clone());
        while self.used_words.len() > USED_WORDS_MEMORY {
            self.used_words.pop_front();
        }
        word
    }

    /// Detectives, then medics, from the civilians; writers from the impostors
    fn deal_special_roles(&mut self, civilians: &[PlayerId], impostors: &[PlayerId]) {
        let mut civilians = civilians.iter();
        let mut dealt: Vec<(PlayerId, SpecialRole)> = Vec::new();

        dealt.extend(
            civilians
                .by_ref()
                .take(self.config.num_detectives)
                .map(|id| (id.clone(), SpecialRole::Detective)),
        );
        dealt.extend(
            civilians
                .take(self.config.num_medics)
                .map(|id| (id.clone(), SpecialRole::Medic)),
        );
        dealt.extend(
            impostors
                .iter()
                .take(self.config.num_writers)
                .map(|id| (id.clone(), SpecialRole::Writer)),
        );

        for (id, special) in dealt {
            if let Some(player) = self.participants_mut().find(|p| p.id == id) {
                player.special_role = Some(special);
            }
            self.abilities.insert(id, RoleAbility::for_role(special));
        }
    }

    fn brief_bots(&mut self) {
        let roster = self.roster();
        let word = self.current_word.clone();
        let clue = if self.config.impostor_has_clue {
            self.impostor_clue.clone()
        } else {
            None
        };

        for bot in &mut self.bots {
            let Some(role) = bot.player.role else {
                continue;
            };
            let (bot_word, bot_clue) = match role {
                Role::Civil => (word.clone(), None),
                Role::Impostor => (None, clue.clone()),
            };
            bot.brain.initialize(role, bot_word, bot_clue, roster.clone());
        }
    }

    pub fn role_of(&self, id: &str) -> Option<Role> {
        self.participant(id).and_then(|p| p.role)
    }

    /// Secret word as this player sees it (none for impostors)
    pub fn word_for(&self, id: &str) -> Option<String> {
        match self.role_of(id)? {
            Role::Civil => self
                .swapped_words
                .get(id)
                .cloned()
                .or_else(|| self.current_word.clone()),
            Role::Impostor => None,
        }
    }

    /// Clue as this player sees it (only impostors, and only if enabled)
    pub fn clue_for(&self, id: &str) -> Option<String> {
        match self.role_of(id)? {
            Role::Impostor if self.config.impostor_has_clue => self.impostor_clue.clone(),
            _ => None,
        }
    }

    /// A human confirms they have seen their role
    pub fn acknowledge_reveal(&mut self, player_id: &str) -> GameResult<(usize, usize)> {
        if self.phase != GamePhase::Revealing {
            return Err(GameError::state("Nothing to reveal right now"));
        }
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or_else(|| GameError::not_found("Player"))?;
        player.revealed = true;
        self.players_revealed.insert(player_id.to_string());
        Ok(self.reveal_progress())
    }

    pub fn reveal_progress(&self) -> (usize, usize) {
        let revealed = self
            .players
            .iter()
            .filter(|p| self.players_revealed.contains(&p.id))
            .count();
        (revealed, self.players.len())
    }

    pub fn reveal_complete(&self) -> bool {
        let (revealed, total) = self.reveal_progress();
        revealed == total
    }

    fn shuffled_alive(&mut self) -> Vec<PlayerId> {
        let mut order = self.alive_ids();
        order.shuffle(&mut self.rng);
        order
    }

    /// Everyone has seen their role; shuffle the speaking order for round one
    pub fn start_playing_phase(&mut self) -> Option<PlayerId> {
        self.player_order = self.shuffled_alive();
        self.current_player_index = 0;
        self.player_words.clear();
        self.phase = GamePhase::Playing;
        self.locked = false;
        self.bump_epoch();
        self.current_player().cloned()
    }

    pub fn current_player(&self) -> Option<&PlayerId> {
        if self.phase != GamePhase::Playing {
            return None;
        }
        self.player_order.get(self.current_player_index)
    }

    /// Words said so far in the current round
    pub fn submitted_words(&self) -> Vec<String> {
        self.player_words.values().cloned().collect()
    }

    pub fn submit_word(&mut self, player_id: &str, word: &str) -> GameResult<WordRecord> {
        if self.phase != GamePhase::Playing {
            return Err(GameError::state("Words can only be submitted while playing"));
        }
        if self.locked {
            return Err(GameError::state("Wait for the next turn"));
        }
        if self.current_player().map(String::as_str) != Some(player_id) {
            return Err(GameError::state("Not your turn"));
        }

        let word = word.trim();
        if word.is_empty() {
            return Err(GameError::InvalidInput("Word cannot be empty".to_string()));
        }
        if word.chars().count() > MAX_WORD_LEN {
            return Err(GameError::InvalidInput(format!(
                "Word cannot exceed {} characters",
                MAX_WORD_LEN
            )));
        }

        let record = WordRecord {
            round: self.round_number,
            player_id: player_id.to_string(),
            player_name: self.display_name(player_id),
            word: word.to_string(),
        };

        self.player_words
            .insert(player_id.to_string(), record.word.clone());
        self.word_history.push(record.clone());
        let eliminated = &self.eliminated;
        for bot in self
            .bots
            .iter_mut()
            .filter(|b| !eliminated.contains(&b.player.id))
        {
            bot.brain
                .observe_word(&record.player_id, &record.word, &record.player_name);
        }

        self.current_player_index += 1;
        self.locked = true;
        self.bump_epoch();

        tracing::debug!(room = %self.code, player = %player_id, word, "Word submitted");
        Ok(record)
    }

    /// Called once the post-word delay is over
    pub fn conclude_turn(&mut self) -> TurnStep {
        self.locked = false;
        match self.current_player().cloned() {
            Some(next) => {
                self.bump_epoch();
                TurnStep::Next(next)
            }
            None => {
                self.start_voting();
                TurnStep::VotingOpened
            }
        }
    }

    pub fn start_voting(&mut self) {
        self.votes.clear();
        self.phase = GamePhase::Voting;
        self.locked = false;
        self.bump_epoch();
        tracing::debug!(room = %self.code, round = self.round_number, "Voting opened");
    }

    /// Civilians win with no impostor alive; impostors win once they match the civilians
    pub fn check_win_condition(&self) -> Option<Winner> {
        let (mut civils, mut impostors) = (0, 0);
        for player in self.participants() {
            if self.eliminated.contains(&player.id) {
                continue;
            }
            match player.role {
                Some(Role::Civil) => civils += 1,
                Some(Role::Impostor) => impostors += 1,
                None => {}
            }
        }

        if impostors == 0 {
            Some(Winner::Civils)
        } else if civils <= impostors {
            Some(Winner::Impostors)
        } else {
            None
        }
    }

    pub fn finish(&mut self, winner: Winner) {
        self.phase = GamePhase::Finished;
        self.winner = Some(winner);
        self.locked = false;
        self.bump_epoch();
        tracing::info!(room = %self.code, winner = ?winner, rounds = self.round_number, "Game finished");
    }

    /// Replay the speaking phase among the tied players only
    pub fn reset_for_tiebreaker(&mut self, tied: &[PlayerId]) -> Option<PlayerId> {
        let mut order: Vec<PlayerId> = tied
            .iter()
            .filter(|id| self.is_alive(id))
            .cloned()
            .collect();
        if order.is_empty() {
            order = self.alive_ids();
        }
        order.shuffle(&mut self.rng);

        self.player_order = order;
        self.current_player_index = 0;
        self.player_words.clear();
        self.votes.clear();
        self.phase = GamePhase::Playing;
        self.locked = false;
        self.bump_epoch();

        tracing::info!(room = %self.code, tied = ?tied, "Tiebreaker started");
        self.current_player().cloned()
    }

    /// Next elimination round: fresh order, fresh words, writer abilities recharge
    pub fn start_new_round(&mut self) -> Option<PlayerId> {
        self.round_number += 1;
        self.player_order = self.shuffled_alive();
        self.current_player_index = 0;
        self.player_words.clear();
        self.votes.clear();

        for ability in self.abilities.values_mut() {
            ability.reset_round();
        }
        self.swapped_words.clear();
        for bot in &mut self.bots {
            bot.brain.set_swapped_word(None);
        }

        self.phase = GamePhase::Playing;
        self.locked = false;
        self.bump_epoch();

        tracing::info!(room = %self.code, round = self.round_number, "New round");
        self.current_player().cloned()
    }

    /// Back to the lobby after a finished game
    pub fn return_to_lobby(&mut self) -> GameResult<()> {
        if self.phase != GamePhase::Finished {
            return Err(GameError::state("The game is not finished"));
        }
        self.phase = GamePhase::Waiting;
        self.locked = false;
        self.bump_epoch();
        Ok(())
    }

    /// Word for the bot whose turn it is
    pub fn bot_word(&mut self, bot_id: &str) -> Option<String> {
        if self.locked || self.current_player().map(String::as_str) != Some(bot_id) {
            return None;
        }
        let submitted = self.submitted_words();
        let bot = self.bots.iter().find(|b| b.player.id == bot_id)?;
        Some(bot.brain.generate_word(&submitted, &mut self.rng))
    }
}

#[cfg(test)]
mod tests {
    use super::super::room::tests::room_with;
    use super::*;
    use crate::config::{ConfigUpdate, GameMode};
    use std::collections::HashSet;

    fn set_roles(room: &mut GameRoom, impostors: &[&str]) {
        for player in room.participants_mut() {
            player.role = Some(if impostors.contains(&player.id.as_str()) {
                Role::Impostor
            } else {
                Role::Civil
            });
        }
    }

    fn revealed_and_playing(room: &mut GameRoom) {
        room.start_game().unwrap();
        let humans: Vec<PlayerId> = room.players.iter().map(|p| p.id.clone()).collect();
        for id in humans {
            room.acknowledge_reveal(&id).unwrap();
        }
        assert!(room.reveal_complete());
        room.start_playing_phase();
    }

    #[test]
    fn test_start_requires_three_players() {
        let mut room = room_with(1, 1, 1);
        assert!(matches!(room.start_game(), Err(GameError::InvalidState(_))));
        room.add_bot().unwrap();
        room.start_game().unwrap();
        assert_eq!(room.phase, GamePhase::Revealing);
    }

    #[test]
    fn test_impostor_count_capped_at_half() {
        let mut room = room_with(2, 2, 3);
        room.update_config(&ConfigUpdate {
            num_impostors: Some(3),
            ..Default::default()
        })
        .unwrap();
        room.start_game().unwrap();
        let impostors = room
            .participants()
            .filter(|p| p.role == Some(Role::Impostor))
            .count();
        assert_eq!(impostors, 2);
        assert!(room.participants().all(|p| p.role.is_some()));
    }

    #[test]
    fn test_word_and_clue_depend_on_role() {
        let mut room = room_with(4, 0, 5);
        room.start_game().unwrap();
        for player in room.players.clone() {
            match player.role.unwrap() {
                Role::Civil => {
                    assert_eq!(room.word_for(&player.id), room.current_word);
                    assert_eq!(room.clue_for(&player.id), None);
                }
                Role::Impostor => {
                    assert_eq!(room.word_for(&player.id), None);
                    assert_eq!(room.clue_for(&player.id), room.impostor_clue);
                }
            }
        }

        room.finish(Winner::Civils);
        room.return_to_lobby().unwrap();
        room.update_config(&ConfigUpdate {
            impostor_has_clue: Some(false),
            ..Default::default()
        })
        .unwrap();
        room.start_game().unwrap();
        assert!(room.players.iter().all(|p| room.clue_for(&p.id).is_none()));
    }

    #[test]
    fn test_bots_are_briefed_and_auto_revealed() {
        let mut room = room_with(1, 3, 7);
        room.start_game().unwrap();
        for bot in &room.bots {
            assert!(bot.player.revealed);
            assert_eq!(bot.brain.role(), bot.player.role);
            assert_eq!(bot.brain.suspicion_of(&bot.player.id), None);
            assert_eq!(bot.brain.suspicion_of("h1"), Some(50));
        }
        assert_eq!(room.reveal_progress(), (0, 1));
        room.acknowledge_reveal("h1").unwrap();
        assert!(room.reveal_complete());
    }

    #[test]
    fn test_special_roles_follow_alignment() {
        let mut room = room_with(6, 0, 11);
        room.update_config(&ConfigUpdate {
            game_mode: Some(GameMode::Roles),
            ..Default::default()
        })
        .unwrap();
        room.start_game().unwrap();

        let with_role = |special| {
            room.participants()
                .filter(|p| p.special_role == Some(special))
                .collect::<Vec<_>>()
        };
        let detectives = with_role(SpecialRole::Detective);
        let medics = with_role(SpecialRole::Medic);
        let writers = with_role(SpecialRole::Writer);

        assert_eq!(detectives.len(), 1);
        assert_eq!(medics.len(), 1);
        assert_eq!(writers.len(), 1);
        assert_eq!(detectives[0].role, Some(Role::Civil));
        assert_eq!(medics[0].role, Some(Role::Civil));
        assert_ne!(detectives[0].id, medics[0].id);
        assert_eq!(writers[0].role, Some(Role::Impostor));
        assert_eq!(room.abilities.len(), 3);
    }

    #[test]
    fn test_classic_mode_has_no_special_roles() {
        let mut room = room_with(6, 0, 11);
        room.start_game().unwrap();
        assert!(room.participants().all(|p| p.special_role.is_none()));
        assert!(room.abilities.is_empty());
    }

    #[test]
    fn test_turn_order_covers_each_alive_player_once() {
        let mut room = room_with(3, 3, 13);
        revealed_and_playing(&mut room);

        let order: HashSet<&PlayerId> = room.player_order.iter().collect();
        assert_eq!(order.len(), room.player_order.len());
        assert_eq!(order.len(), 6);
        assert_eq!(room.current_player_index, 0);
    }

    #[test]
    fn test_out_of_turn_word_rejected() {
        let mut room = room_with(4, 0, 17);
        revealed_and_playing(&mut room);

        let current = room.current_player().cloned().unwrap();
        let other = room
            .player_order
            .iter()
            .find(|id| **id != current)
            .cloned()
            .unwrap();

        assert!(matches!(
            room.submit_word(&other, "Pet"),
            Err(GameError::InvalidState(_))
        ));
        assert!(matches!(
            room.submit_word(&current, "   "),
            Err(GameError::InvalidInput(_))
        ));

        room.submit_word(&current, "Pet").unwrap();
        // A second word during the pause is refused, even by the next speaker
        let next = room.player_order[1].clone();
        assert!(room.submit_word(&next, "Tail").is_err());
        assert_eq!(room.conclude_turn(), TurnStep::Next(next.clone()));
        room.submit_word(&next, "Tail").unwrap();
    }

    #[test]
    fn test_full_turn_loop_opens_voting() {
        let mut room = room_with(3, 0, 19);
        revealed_and_playing(&mut room);

        for _ in 0..3 {
            let current = room.current_player().cloned().unwrap();
            room.submit_word(&current, "Word").unwrap();
            room.conclude_turn();
        }
        assert_eq!(room.phase, GamePhase::Voting);
        assert_eq!(room.word_history.len(), 3);
        assert!(room.word_history.iter().all(|r| r.round == 1));
    }

    #[test]
    fn test_bots_observe_submitted_words() {
        let mut room = room_with(3, 1, 23);
        revealed_and_playing(&mut room);

        let speaker = room
            .player_order
            .iter()
            .find(|id| !room.is_bot(id))
            .cloned()
            .unwrap();
        while room.current_player() != Some(&speaker) {
            let current = room.current_player().cloned().unwrap();
            let word = if room.is_bot(&current) {
                room.bot_word(&current).unwrap()
            } else {
                "Word".to_string()
            };
            room.submit_word(&current, &word).unwrap();
            room.conclude_turn();
        }
        room.submit_word(&speaker, "Whiskers").unwrap();
        let observed = room.bots[0].brain.observed(&speaker).unwrap();
        assert_eq!(observed.word, "Whiskers");
    }

    #[test]
    fn test_bot_word_only_on_bot_turn() {
        let mut room = room_with(3, 1, 29);
        revealed_and_playing(&mut room);
        let bot_id = room.bots[0].player.id.clone();

        // Seat the bot second so a human speaks first
        room.player_order.retain(|id| *id != bot_id);
        room.player_order.insert(1, bot_id.clone());
        let first = room.player_order[0].clone();
        assert!(room.bot_word(&bot_id).is_none());

        room.submit_word(&first, "Word").unwrap();
        // Its turn, but the post-word pause is still running
        assert_eq!(room.current_player(), Some(&bot_id));
        assert!(room.bot_word(&bot_id).is_none());

        room.conclude_turn();
        let word = room.bot_word(&bot_id).unwrap();
        assert!(!word.trim().is_empty());
        room.submit_word(&bot_id, &word).unwrap();
        room.conclude_turn();
        assert!(room.bot_word(&bot_id).is_none());
    }

    #[test]
    fn test_win_conditions() {
        let mut room = room_with(5, 0, 31);

        // one impostor, eliminated
        set_roles(&mut room, &["h1"]);
        room.eliminated.insert("h1".to_string());
        assert_eq!(room.check_win_condition(), Some(Winner::Civils));

        // four alive: two impostors, two civilians
        room.eliminated.clear();
        set_roles(&mut room, &["h1", "h2"]);
        room.eliminated.insert("h5".to_string());
        assert_eq!(room.check_win_condition(), Some(Winner::Impostors));

        // five alive, one impostor
        room.eliminated.clear();
        set_roles(&mut room, &["h1"]);
        assert_eq!(room.check_win_condition(), None);
    }

    #[test]
    fn test_used_words_stay_bounded_and_fresh() {
        let mut room = room_with(3, 0, 37);
        for _ in 0..10 {
            let recent: Vec<String> = room.used_words.iter().cloned().collect();
            room.start_game().unwrap();
            let word = room.current_word.clone().unwrap();
            assert!(!recent.contains(&word));
            assert!(room.used_words.len() <= USED_WORDS_MEMORY);
            room.finish(Winner::Civils);
            room.return_to_lobby().unwrap();
        }
    }

    #[test]
    fn test_rematch_resets_game_state() {
        let mut room = room_with(3, 0, 41);
        revealed_and_playing(&mut room);
        let current = room.current_player().cloned().unwrap();
        room.submit_word(&current, "Word").unwrap();
        room.eliminated.insert("h2".to_string());
        room.finish(Winner::Impostors);

        assert!(room.start_game().is_err());
        room.return_to_lobby().unwrap();
        room.start_game().unwrap();
        assert!(room.eliminated.is_empty());
        assert!(room.word_history.is_empty());
        assert_eq!(room.round_number, 1);
        assert_eq!(room.winner, None);
        assert_eq!(room.reveal_progress(), (0, 3));
    }

    #[test]
    fn test_departure_of_turn_holder_passes_turn() {
        let mut room = room_with(4, 0, 43);
        revealed_and_playing(&mut room);
        // Losing the only impostor would end the game instead
        while room.role_of(room.current_player().unwrap()) == Some(Role::Impostor) {
            let current = room.current_player().cloned().unwrap();
            room.submit_word(&current, "Word").unwrap();
            room.conclude_turn();
        }
        let holder = room.current_player().cloned().unwrap();
        let after = room.player_order[room.current_player_index + 1].clone();

        let next = room.remove_player(&holder).unwrap();
        assert_eq!(
            next,
            super::super::room::AfterDeparture::TurnPassed(after.clone())
        );
        assert_eq!(room.current_player(), Some(&after));
    }

    #[test]
    fn test_departure_during_reveal_completes_it() {
        let mut room = room_with(3, 1, 47);
        room.start_game().unwrap();
        set_roles(&mut room, &["h1"]);
        room.acknowledge_reveal("h1").unwrap();
        room.acknowledge_reveal("h2").unwrap();

        let next = room.remove_player("h3").unwrap();
        assert_eq!(next, super::super::room::AfterDeparture::RevealComplete);
    }
}
