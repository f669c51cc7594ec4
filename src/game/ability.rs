//! Special roles: detective interrogation, medic vote removal, writer word swap

use super::room::GameRoom;
use crate::error::{GameError, GameResult};
use crate::types::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Per-player ability state, one variant per special role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoleAbility {
    Detective { interrogated: HashSet<PlayerId> },
    /// Single use per game
    Medic { used: bool },
    /// Single use per round
    Writer { used_this_round: bool },
}

impl RoleAbility {
    pub fn for_role(role: SpecialRole) -> Self {
        match role {
            SpecialRole::Detective => RoleAbility::Detective {
                interrogated: HashSet::new(),
            },
            SpecialRole::Medic => RoleAbility::Medic { used: false },
            SpecialRole::Writer => RoleAbility::Writer {
                used_this_round: false,
            },
        }
    }

    pub fn reset_round(&mut self) {
        if let RoleAbility::Writer { used_this_round } = self {
            *used_this_round = false;
        }
    }
}

/// Lower bound (inclusive) and upper bound (exclusive) of detective accuracy, in percent
pub const DETECTIVE_ACCURACY: std::ops::Range<u32> = 25..70;
pub const WRITER_SUCCESS_RATE: f64 = 0.5;

/// A detective's verdict. `truth` is kept for auditing and never sent to the detective.
#[derive(Debug, Clone, PartialEq)]
pub struct Interrogation {
    pub target: PlayerId,
    pub verdict: Role,
    pub truth: Role,
    pub accuracy: u32,
}

impl Interrogation {
    pub fn is_correct(&self) -> bool {
        self.verdict == self.truth
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordSwap {
    pub target: PlayerId,
    pub word: String,
    pub success: bool,
}

impl GameRoom {
    pub fn ability_of(&self, player_id: &str) -> Option<&RoleAbility> {
        self.abilities.get(player_id)
    }

    fn ensure_active(&self, actor: &str) -> GameResult<()> {
        if !matches!(self.phase, GamePhase::Playing | GamePhase::Voting) {
            return Err(GameError::state("Abilities can only be used during the game"));
        }
        if !self.is_alive(actor) {
            return Err(GameError::state("Eliminated players cannot use abilities"));
        }
        Ok(())
    }

    /// Ask about a player's alignment; the answer is right with a random
    /// probability drawn from 25–70 %.
    pub fn interrogate(&mut self, actor: &str, target: &str) -> GameResult<Interrogation> {
        self.ensure_active(actor)?;
        let Some(RoleAbility::Detective { interrogated }) = self.abilities.get(actor) else {
            return Err(GameError::unauthorized("only a detective can interrogate"));
        };
        if actor == target {
            return Err(GameError::InvalidInput(
                "You cannot interrogate yourself".to_string(),
            ));
        }
        if interrogated.contains(target) {
            return Err(GameError::AbilityUsed(
                "this player was already interrogated".to_string(),
            ));
        }
        let truth = self
            .role_of(target)
            .ok_or_else(|| GameError::not_found("Target"))?;

        let accuracy = self.rng.random_range(DETECTIVE_ACCURACY);
        let correct = self.rng.random_range(0..100) < accuracy;
        let verdict = if correct { truth } else { truth.opposite() };

        if let Some(RoleAbility::Detective { interrogated }) = self.abilities.get_mut(actor) {
            interrogated.insert(target.to_string());
        }
        if let Some(bot) = self.bot_mut(actor) {
            bot.brain.record_interrogation(target, verdict);
        }

        tracing::debug!(
            room = %self.code,
            detective = %actor,
            target,
            accuracy,
            correct,
            "Interrogation"
        );
        Ok(Interrogation {
            target: target.to_string(),
            verdict,
            truth,
            accuracy,
        })
    }

    /// Withdraw one vote cast against `target`. Returns the voter whose vote was voided.
    pub fn remove_vote(&mut self, actor: &str, target: &str) -> GameResult<PlayerId> {
        if self.phase != GamePhase::Voting || self.locked {
            return Err(GameError::state("Votes can only be removed during voting"));
        }
        self.ensure_active(actor)?;
        match self.abilities.get(actor) {
            Some(RoleAbility::Medic { used: false }) => {}
            Some(RoleAbility::Medic { used: true }) => {
                return Err(GameError::AbilityUsed(
                    "the medic can only act once per game".to_string(),
                ))
            }
            _ => return Err(GameError::unauthorized("only a medic can remove votes")),
        }

        let voter = self
            .void_vote_for(target)
            .ok_or_else(|| GameError::state("That player has no votes"))?;

        if let Some(RoleAbility::Medic { used }) = self.abilities.get_mut(actor) {
            *used = true;
        }
        tracing::debug!(room = %self.code, medic = %actor, target, voter = %voter, "Vote removed");
        Ok(voter)
    }

    /// Try to replace the word `target` sees for the rest of the round.
    /// Succeeds half of the time; the attempt is spent either way.
    pub fn use_writer_ability(
        &mut self,
        actor: &str,
        target: &str,
        fake_word: &str,
    ) -> GameResult<WordSwap> {
        if self.phase != GamePhase::Playing {
            return Err(GameError::state("Words can only be swapped while playing"));
        }
        self.ensure_active(actor)?;
        match self.abilities.get(actor) {
            Some(RoleAbility::Writer {
                used_this_round: false,
            }) => {}
            Some(RoleAbility::Writer {
                used_this_round: true,
            }) => {
                return Err(GameError::AbilityUsed(
                    "the writer can only act once per round".to_string(),
                ))
            }
            _ => return Err(GameError::unauthorized("only a writer can swap words")),
        }
        if actor == target {
            return Err(GameError::InvalidInput(
                "You cannot swap your own word".to_string(),
            ));
        }
        if !self.is_alive(target) {
            return Err(GameError::not_found("Target"));
        }
        let word = fake_word.trim();
        if word.is_empty() {
            return Err(GameError::InvalidInput("Word cannot be empty".to_string()));
        }

        if let Some(RoleAbility::Writer { used_this_round }) = self.abilities.get_mut(actor) {
            *used_this_round = true;
        }

        let success = self.rng.random_bool(WRITER_SUCCESS_RATE);
        if success {
            self.swapped_words
                .insert(target.to_string(), word.to_string());
            if let Some(bot) = self.bot_mut(target) {
                bot.brain.set_swapped_word(Some(word.to_string()));
            }
        }

        tracing::debug!(room = %self.code, writer = %actor, target, success, "Word swap attempted");
        Ok(WordSwap {
            target: target.to_string(),
            word: word.to_string(),
            success,
        })
    }

    fn bot_has(&self, bot_id: &str, special: SpecialRole) -> bool {
        self.is_alive(bot_id)
            && self
                .bot(bot_id)
                .is_some_and(|b| b.player.special_role == Some(special))
    }

    /// Detective bot: someone to question after its word, if it feels like it
    pub fn bot_interrogation_target(&mut self, bot_id: &str) -> Option<PlayerId> {
        if !self.bot_has(bot_id, SpecialRole::Detective) {
            return None;
        }
        let Some(RoleAbility::Detective { interrogated }) = self.abilities.get(bot_id) else {
            return None;
        };
        let candidates: Vec<PlayerId> = self
            .alive_ids()
            .into_iter()
            .filter(|id| id != bot_id && !interrogated.contains(id))
            .collect();
        let bot = self.bots.iter().find(|b| b.player.id == bot_id)?;
        bot.brain.should_interrogate(&candidates, &mut self.rng)
    }

    /// Medic bot: a player to shield from the current tally
    pub fn bot_medic_target(&mut self, bot_id: &str) -> Option<PlayerId> {
        if !self.bot_has(bot_id, SpecialRole::Medic)
            || self.ability_of(bot_id) != Some(&RoleAbility::Medic { used: false })
        {
            return None;
        }
        let counts: HashMap<PlayerId, u32> = self.vote_counts();
        let bot = self.bots.iter().find(|b| b.player.id == bot_id)?;
        bot.brain.should_use_medic_ability(&counts, &mut self.rng)
    }

    /// Writer bot: target and fake word for a swap at the start of a round
    pub fn bot_writer_plan(&mut self, bot_id: &str) -> Option<(PlayerId, String)> {
        if !self.bot_has(bot_id, SpecialRole::Writer)
            || self.ability_of(bot_id)
                != Some(&RoleAbility::Writer {
                    used_this_round: false,
                })
        {
            return None;
        }
        let candidates: Vec<PlayerId> = self
            .alive_ids()
            .into_iter()
            .filter(|id| id != bot_id)
            .collect();
        let bot = self.bots.iter().find(|b| b.player.id == bot_id)?;
        bot.brain.should_use_writer_ability(&candidates, &mut self.rng)
    }

    /// Alive bots holding `special`
    pub fn bots_with(&self, special: SpecialRole) -> Vec<PlayerId> {
        self.alive_bot_ids()
            .into_iter()
            .filter(|id| self.bot_has(id, special))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::room::tests::room_with;
    use super::*;
    use crate::config::{ConfigUpdate, GameMode};

    fn roles_room(humans: usize, bots: usize, seed: u64) -> GameRoom {
        let mut room = room_with(humans, bots, seed);
        room.update_config(&ConfigUpdate {
            game_mode: Some(GameMode::Roles),
            ..Default::default()
        })
        .unwrap();
        room.start_game().unwrap();
        room.start_playing_phase();
        room
    }

    fn holder(room: &GameRoom, special: SpecialRole) -> PlayerId {
        room.participants()
            .find(|p| p.special_role == Some(special))
            .map(|p| p.id.clone())
            .unwrap()
    }

    #[test]
    fn test_ability_serialization() {
        let json = serde_json::to_value(RoleAbility::Medic { used: false }).unwrap();
        assert_eq!(json["type"], "medic");
        assert_eq!(json["used"], false);
    }

    #[test]
    fn test_detective_accuracy_is_within_bounds() {
        let mut room = roles_room(6, 0, 100);
        let detective = holder(&room, SpecialRole::Detective);
        let target = room
            .alive_ids()
            .into_iter()
            .find(|id| *id != detective)
            .unwrap();

        let trials = 2000;
        let mut correct = 0;
        for _ in 0..trials {
            room.abilities.insert(
                detective.clone(),
                RoleAbility::for_role(SpecialRole::Detective),
            );
            let result = room.interrogate(&detective, &target).unwrap();
            assert!(DETECTIVE_ACCURACY.contains(&result.accuracy));
            assert_eq!(Some(result.truth), room.role_of(&target));
            if result.is_correct() {
                correct += 1;
            }
        }
        let ratio = correct as f64 / trials as f64;
        assert!((0.25..0.70).contains(&ratio), "ratio was {}", ratio);
    }

    #[test]
    fn test_detective_cannot_repeat_target() {
        let mut room = roles_room(6, 0, 101);
        let detective = holder(&room, SpecialRole::Detective);
        let target = room
            .alive_ids()
            .into_iter()
            .find(|id| *id != detective)
            .unwrap();

        room.interrogate(&detective, &target).unwrap();
        assert!(matches!(
            room.interrogate(&detective, &target),
            Err(GameError::AbilityUsed(_))
        ));
        assert!(matches!(
            room.interrogate(&detective, &detective),
            Err(GameError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_only_detectives_interrogate() {
        let mut room = roles_room(6, 0, 102);
        let medic = holder(&room, SpecialRole::Medic);
        assert!(matches!(
            room.interrogate(&medic, "h1"),
            Err(GameError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_medic_removes_exactly_one_vote_once_per_game() {
        let mut room = roles_room(6, 0, 103);
        let medic = holder(&room, SpecialRole::Medic);
        let target = room
            .alive_ids()
            .into_iter()
            .find(|id| *id != medic)
            .unwrap();
        room.start_voting();

        assert!(matches!(
            room.remove_vote(&medic, &target),
            Err(GameError::InvalidState(_))
        ));

        let voters: Vec<PlayerId> = room
            .alive_ids()
            .into_iter()
            .filter(|id| *id != target)
            .take(3)
            .collect();
        for voter in &voters {
            room.submit_vote(voter, &target).unwrap();
        }
        assert_eq!(room.vote_counts().get(&target), Some(&3));

        let voided = room.remove_vote(&medic, &target).unwrap();
        assert_eq!(voided, voters[0]);
        assert_eq!(room.vote_counts().get(&target), Some(&2));
        assert_eq!(
            room.ability_of(&medic),
            Some(&RoleAbility::Medic { used: true })
        );

        assert!(matches!(
            room.remove_vote(&medic, &target),
            Err(GameError::AbilityUsed(_))
        ));

        // Still spent in later rounds
        room.start_new_round();
        room.start_voting();
        room.submit_vote(&voters[0], &target).unwrap();
        assert!(matches!(
            room.remove_vote(&medic, &target),
            Err(GameError::AbilityUsed(_))
        ));
    }

    #[test]
    fn test_medic_only_during_voting() {
        let mut room = roles_room(6, 0, 104);
        let medic = holder(&room, SpecialRole::Medic);
        assert!(matches!(
            room.remove_vote(&medic, "h1"),
            Err(GameError::InvalidState(_))
        ));
    }

    #[test]
    fn test_writer_success_rate() {
        let mut room = roles_room(6, 0, 105);
        let writer = holder(&room, SpecialRole::Writer);
        let target = room
            .alive_ids()
            .into_iter()
            .find(|id| *id != writer)
            .unwrap();

        let trials = 2000;
        let mut successes = 0;
        for _ in 0..trials {
            room.abilities
                .insert(writer.clone(), RoleAbility::for_role(SpecialRole::Writer));
            if room.use_writer_ability(&writer, &target, "Fake").unwrap().success {
                successes += 1;
            }
        }
        let ratio = successes as f64 / trials as f64;
        assert!((0.45..0.55).contains(&ratio), "ratio was {}", ratio);
    }

    #[test]
    fn test_writer_once_per_round() {
        let mut room = roles_room(6, 0, 106);
        let writer = holder(&room, SpecialRole::Writer);
        let target = room
            .alive_ids()
            .into_iter()
            .find(|id| *id != writer)
            .unwrap();

        assert!(matches!(
            room.use_writer_ability(&writer, &writer, "Fake"),
            Err(GameError::InvalidInput(_))
        ));

        let first = room.use_writer_ability(&writer, &target, "Fake").unwrap();
        assert!(matches!(
            room.use_writer_ability(&writer, &target, "Other"),
            Err(GameError::AbilityUsed(_))
        ));
        if first.success {
            assert_eq!(room.swapped_words.get(&target), Some(&"Fake".to_string()));
        }

        room.start_new_round();
        assert!(room.swapped_words.is_empty());
        room.use_writer_ability(&writer, &target, "Again").unwrap();
    }

    #[test]
    fn test_swapped_word_shown_to_civilian() {
        let mut room = roles_room(6, 0, 107);
        let writer = holder(&room, SpecialRole::Writer);
        let civilian = room
            .players
            .iter()
            .find(|p| p.role == Some(Role::Civil))
            .map(|p| p.id.clone())
            .unwrap();

        room.swapped_words
            .insert(civilian.clone(), "Fake".to_string());
        assert_eq!(room.word_for(&civilian), Some("Fake".to_string()));
        assert_ne!(room.word_for(&writer), Some("Fake".to_string()));
    }

    #[test]
    fn test_detective_bot_learns_from_verdict() {
        let mut room = room_with(1, 5, 108);
        room.update_config(&ConfigUpdate {
            game_mode: Some(GameMode::Roles),
            ..Default::default()
        })
        .unwrap();
        room.start_game().unwrap();
        room.start_playing_phase();

        let Some(detective) = room.bots_with(SpecialRole::Detective).into_iter().next() else {
            // host drew the detective role
            return;
        };
        let result = room.interrogate(&detective, "h1").unwrap();
        let expected = match result.verdict {
            Role::Impostor => 65,
            Role::Civil => 40,
        };
        let brain = &room.bot(&detective).unwrap().brain;
        assert_eq!(brain.suspicion_of("h1"), Some(expected));
    }
}
