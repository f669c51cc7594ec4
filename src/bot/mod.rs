//! Decision engine for synthetic players.
//!
//! Each bot owns one `BotBrain`. The brain only sees what a human in the same
//! seat would see (its role, its word or clue, and the words said at the table)
//! and turns that into a suspicion table it uses for words, votes and abilities.
//! Randomness is always injected by the caller.

pub mod similarity;

use crate::types::{PlayerId, Role, RosterEntry};
use crate::words;
use rand::seq::IndexedRandom;
use rand::Rng;
use similarity::{clue_similarity, is_vague, word_pattern, word_similarity, WordPattern};
use std::collections::HashMap;

/// Suspicion every other participant starts with
pub const NEUTRAL_SUSPICION: i32 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct ObservedWord {
    pub word: String,
    pub player_name: String,
}

#[derive(Debug, Clone)]
pub struct BotBrain {
    bot_id: PlayerId,
    role: Option<Role>,
    word: Option<String>,
    /// Word a writer forced on this bot for the current round
    swapped_word: Option<String>,
    clue: Option<String>,
    roster: Vec<RosterEntry>,
    observed_words: HashMap<PlayerId, ObservedWord>,
    suspicion: HashMap<PlayerId, i32>,
}

fn is_unused(candidate: &str, submitted: &[String]) -> bool {
    !submitted.iter().any(|w| w.eq_ignore_ascii_case(candidate))
}

fn pick<R: Rng + ?Sized>(list: &[&str], rng: &mut R, fallback: &str) -> String {
    list.choose(rng).copied().unwrap_or(fallback).to_string()
}

impl BotBrain {
    pub fn new(bot_id: PlayerId) -> Self {
        Self {
            bot_id,
            role: None,
            word: None,
            swapped_word: None,
            clue: None,
            roster: Vec::new(),
            observed_words: HashMap::new(),
            suspicion: HashMap::new(),
        }
    }

    /// Prepare for a new game; forgets everything from earlier games
    pub fn initialize(
        &mut self,
        role: Role,
        word: Option<String>,
        clue: Option<String>,
        roster: Vec<RosterEntry>,
    ) {
        self.role = Some(role);
        self.word = word;
        self.clue = clue;
        self.swapped_word = None;
        self.observed_words.clear();
        self.suspicion = roster
            .iter()
            .filter(|p| p.id != self.bot_id)
            .map(|p| (p.id.clone(), NEUTRAL_SUSPICION))
            .collect();
        self.roster = roster;
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn suspicion_of(&self, player_id: &str) -> Option<i32> {
        self.suspicion.get(player_id).copied()
    }

    pub fn observed(&self, player_id: &str) -> Option<&ObservedWord> {
        self.observed_words.get(player_id)
    }

    pub fn set_swapped_word(&mut self, word: Option<String>) {
        self.swapped_word = word;
    }

    fn adjust(&mut self, player_id: &str, delta: i32) {
        if let Some(score) = self.suspicion.get_mut(player_id) {
            *score = (*score + delta).clamp(0, 100);
        }
    }

    /// React to a word said at the table
    pub fn observe_word(&mut self, player_id: &str, word: &str, player_name: &str) {
        if player_id == self.bot_id {
            return;
        }

        self.observed_words.insert(
            player_id.to_string(),
            ObservedWord {
                word: word.to_string(),
                player_name: player_name.to_string(),
            },
        );

        let delta = match self.role {
            Some(Role::Civil) => self.civil_suspicion_delta(player_id, word),
            Some(Role::Impostor) => self.impostor_suspicion_delta(player_id, word),
            None => 0,
        };

        let current = self
            .suspicion
            .get(player_id)
            .copied()
            .unwrap_or(NEUTRAL_SUSPICION);
        self.suspicion
            .insert(player_id.to_string(), (current + delta).clamp(0, 100));

        tracing::debug!(
            bot = %self.bot_id,
            player = %player_id,
            word,
            delta,
            "Bot updated suspicion"
        );
    }

    fn civil_suspicion_delta(&self, player_id: &str, word: &str) -> i32 {
        let secret = self.word.as_deref().unwrap_or_default();
        let mut delta = 0;

        let similarity = word_similarity(word, secret);
        if similarity < 0.3 {
            delta += 20;
        } else if similarity > 0.7 {
            delta -= 15;
        }

        if is_vague(word) {
            delta += 10;
        }

        // Compare against players this bot already believes are civilians
        let trusted: Vec<&str> = self
            .observed_words
            .iter()
            .filter(|(id, _)| id.as_str() != player_id)
            .filter(|(id, _)| {
                self.suspicion
                    .get(id.as_str())
                    .is_some_and(|s| *s < NEUTRAL_SUSPICION)
            })
            .map(|(_, observed)| observed.word.as_str())
            .collect();

        if !trusted.is_empty() {
            let avg = trusted
                .iter()
                .map(|w| word_similarity(word, w))
                .sum::<f64>()
                / trusted.len() as f64;
            if avg < 0.3 {
                delta += 15;
            }
        }

        delta
    }

    fn impostor_suspicion_delta(&self, player_id: &str, word: &str) -> i32 {
        let mut delta = 0;

        let similarity = clue_similarity(word, self.clue.as_deref());
        if similarity < 0.3 && is_vague(word) {
            // Sounds like a fellow impostor improvising
            delta += 25;
        } else if similarity > 0.6 {
            delta -= 20;
        }

        let others = self
            .observed_words
            .iter()
            .filter(|(id, _)| id.as_str() != player_id)
            .map(|(_, observed)| observed.word.as_str());
        if word_pattern(word, others) == WordPattern::Outlier {
            delta += 15;
        }

        delta
    }

    /// Come up with a word for this bot's turn.
    ///
    /// `submitted` holds the words already said this round; they are avoided
    /// when possible.
    pub fn generate_word<R: Rng + ?Sized>(&self, submitted: &[String], rng: &mut R) -> String {
        match self.role {
            Some(Role::Impostor) => self.impostor_word(submitted, rng),
            _ => self.civil_word(submitted, rng),
        }
    }

    fn civil_word<R: Rng + ?Sized>(&self, submitted: &[String], rng: &mut R) -> String {
        let secret = self
            .swapped_word
            .as_deref()
            .or(self.word.as_deref())
            .unwrap_or_default();
        let candidates = words::related_words(secret);

        let available: Vec<&str> = candidates
            .iter()
            .copied()
            .filter(|w| is_unused(w, submitted))
            .collect();

        if available.is_empty() {
            pick(candidates, rng, "Related")
        } else {
            pick(&available, rng, "Related")
        }
    }

    fn impostor_word<R: Rng + ?Sized>(&self, submitted: &[String], rng: &mut R) -> String {
        match self.clue.as_deref() {
            Some(clue) => Self::word_from_clue(clue, submitted, rng),
            None => self.word_from_observations(rng),
        }
    }

    fn word_from_clue<R: Rng + ?Sized>(clue: &str, submitted: &[String], rng: &mut R) -> String {
        let clue = clue.to_lowercase();

        for (category, bluffs) in words::CLUE_BLUFFS {
            if !clue.contains(category) {
                continue;
            }
            let available: Vec<&str> = bluffs
                .iter()
                .copied()
                .filter(|w| is_unused(w, submitted))
                .collect();
            if !available.is_empty() {
                return pick(&available, rng, "Thing");
            }
        }

        pick(words::GENERIC_FILLERS, rng, "Thing")
    }

    fn word_from_observations<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        if self.observed_words.is_empty() {
            return "Something".to_string();
        }

        match self.dominant_theme() {
            Some(theme) => {
                let list = words::THEME_WORDS
                    .iter()
                    .find(|(t, _)| *t == theme)
                    .map(|(_, list)| *list)
                    .unwrap_or(words::VERY_GENERIC);
                pick(list, rng, "Something")
            }
            None => pick(words::VERY_GENERIC, rng, "Something"),
        }
    }

    /// Theme with the strictly highest keyword count across observed words
    fn dominant_theme(&self) -> Option<&'static str> {
        let counts: Vec<(&'static str, usize)> = words::THEME_KEYWORDS
            .iter()
            .map(|(theme, keywords)| {
                let count = self
                    .observed_words
                    .values()
                    .filter(|o| {
                        let w = o.word.to_lowercase();
                        keywords.iter().any(|k| w.contains(k))
                    })
                    .count();
                (*theme, count)
            })
            .collect();

        let max = counts.iter().map(|(_, c)| *c).max().unwrap_or(0);
        let leaders: Vec<&'static str> = counts
            .iter()
            .filter(|(_, c)| *c == max)
            .map(|(t, _)| *t)
            .collect();

        (max > 0 && leaders.len() == 1).then(|| leaders[0])
    }

    /// Tracked players ordered by descending suspicion (roster order breaks ties)
    pub fn ranked_suspects(&self, eligible: &[PlayerId]) -> Vec<(PlayerId, i32)> {
        let mut ranked: Vec<(PlayerId, i32)> = self
            .roster
            .iter()
            .filter(|p| p.id != self.bot_id && eligible.contains(&p.id))
            .filter_map(|p| self.suspicion.get(&p.id).map(|s| (p.id.clone(), *s)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// Pick a vote target among `eligible`: usually the top suspect, sometimes
    /// the second or third.
    pub fn vote<R: Rng + ?Sized>(&self, eligible: &[PlayerId], rng: &mut R) -> Option<PlayerId> {
        let ranked = self.ranked_suspects(eligible);
        let top = ranked.first()?;

        if rng.random_bool(0.7) {
            return Some(top.0.clone());
        }
        if let Some(second) = ranked.get(1) {
            if rng.random_bool(0.66) {
                return Some(second.0.clone());
            }
        }
        if let Some(third) = ranked.get(2) {
            return Some(third.0.clone());
        }
        Some(top.0.clone())
    }

    /// Detective bots: maybe question the most suspicious player not yet questioned
    pub fn should_interrogate<R: Rng + ?Sized>(
        &self,
        candidates: &[PlayerId],
        rng: &mut R,
    ) -> Option<PlayerId> {
        let ranked = self.ranked_suspects(candidates);
        let target = ranked.first()?;
        rng.random_bool(0.6).then(|| target.0.clone())
    }

    /// Fold a detective verdict back into the suspicion table
    pub fn record_interrogation(&mut self, target: &str, verdict: Role) {
        match verdict {
            Role::Impostor => self.adjust(target, 15),
            Role::Civil => self.adjust(target, -10),
        }
    }

    /// Medic bots: shield themselves or a trusted player who leads the tally
    pub fn should_use_medic_ability<R: Rng + ?Sized>(
        &self,
        tallies: &HashMap<PlayerId, u32>,
        rng: &mut R,
    ) -> Option<PlayerId> {
        let max = tallies.values().copied().max().unwrap_or(0);
        if max < 2 {
            return None;
        }

        let mut leaders: Vec<&PlayerId> = tallies
            .iter()
            .filter(|(_, count)| **count == max)
            .map(|(id, _)| id)
            .collect();
        leaders.sort();

        let protected = leaders.into_iter().find(|id| {
            **id == self.bot_id || self.suspicion.get(id.as_str()).is_some_and(|s| *s < 40)
        })?;

        rng.random_bool(0.7).then(|| protected.clone())
    }

    /// Writer bots: maybe feed a fake word to the player most likely to be a civilian
    pub fn should_use_writer_ability<R: Rng + ?Sized>(
        &self,
        candidates: &[PlayerId],
        rng: &mut R,
    ) -> Option<(PlayerId, String)> {
        let ranked = self.ranked_suspects(candidates);
        let target = ranked.last()?.0.clone();

        if !rng.random_bool(0.5) {
            return None;
        }

        let fake = words::WORD_POOL
            .choose(rng)
            .copied()
            .unwrap_or("Thing")
            .to_string();
        Some((target, fake))
    }
}
