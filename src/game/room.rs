//! The room aggregate and its lobby operations.
//!
//! A `GameRoom` is plain data plus synchronous methods; callers serialize
//! access (see `state::registry`). Phase transitions live in `phase.rs`,
//! voting in `vote.rs`, special roles in `ability.rs`.

use super::ability::RoleAbility;
use super::vote::Vote;
use crate::bot::BotBrain;
use crate::config::{ConfigUpdate, RoomConfig};
use crate::error::{GameError, GameResult};
use crate::protocol::{PlayerView, RoomSnapshot, RoomSummary};
use crate::types::*;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use std::collections::{HashMap, HashSet, VecDeque};

pub const MAX_NAME_LEN: usize = 20;

/// A synthetic participant and the brain that drives it
#[derive(Debug, Clone)]
pub struct Bot {
    pub player: Player,
    pub brain: BotBrain,
}

/// What the room needs to do after a human left mid-game
#[derive(Debug, Clone, PartialEq)]
pub enum AfterDeparture {
    Nothing,
    /// Only bots (or nobody) remain; the room should be destroyed
    Abandoned,
    GameOver(Winner),
    /// The last pending reveal acknowledgement was the one that left
    RevealComplete,
    /// The departed player held the turn; this is the new turn holder
    TurnPassed(PlayerId),
    /// The departed player was the last one due to speak
    VotingReady,
    /// Every remaining voter has already voted
    TallyReady,
}

#[derive(Debug)]
pub struct GameRoom {
    pub code: RoomCode,
    pub name: String,
    pub host_id: PlayerId,
    /// Humans in join order
    pub players: Vec<Player>,
    pub bots: Vec<Bot>,
    pub config: RoomConfig,
    pub phase: GamePhase,
    pub current_word: Option<String>,
    pub impostor_clue: Option<String>,
    pub players_revealed: HashSet<PlayerId>,
    pub player_order: Vec<PlayerId>,
    pub current_player_index: usize,
    pub player_words: HashMap<PlayerId, String>,
    pub votes: HashMap<PlayerId, Vote>,
    pub(crate) vote_seq: u64,
    pub eliminated: HashSet<PlayerId>,
    pub round_number: u32,
    pub used_words: VecDeque<String>,
    pub word_history: Vec<WordRecord>,
    pub abilities: HashMap<PlayerId, RoleAbility>,
    /// Words forced on players by a writer, cleared every round
    pub swapped_words: HashMap<PlayerId, String>,
    pub winner: Option<Winner>,
    /// Set while a timed transition is pending; words, votes and abilities are refused
    pub locked: bool,
    /// Bumped on every transition so stale timers can tell they are stale
    pub epoch: u64,
    pub created_at: DateTime<Utc>,
    pub(crate) rng: StdRng,
    humans_joined: usize,
    bots_added: usize,
}

pub(crate) fn clean_name(name: &str) -> GameResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::InvalidInput("Name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(GameError::InvalidInput(format!(
            "Name cannot exceed {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

impl GameRoom {
    pub fn new(
        code: RoomCode,
        name: String,
        host_id: PlayerId,
        host_name: Option<String>,
        rng: StdRng,
    ) -> GameResult<Self> {
        let mut room = Self {
            code,
            name,
            host_id: host_id.clone(),
            players: Vec::new(),
            bots: Vec::new(),
            config: RoomConfig::default(),
            phase: GamePhase::Waiting,
            current_word: None,
            impostor_clue: None,
            players_revealed: HashSet::new(),
            player_order: Vec::new(),
            current_player_index: 0,
            player_words: HashMap::new(),
            votes: HashMap::new(),
            vote_seq: 0,
            eliminated: HashSet::new(),
            round_number: 1,
            used_words: VecDeque::new(),
            word_history: Vec::new(),
            abilities: HashMap::new(),
            swapped_words: HashMap::new(),
            winner: None,
            locked: false,
            epoch: 0,
            created_at: Utc::now(),
            rng,
            humans_joined: 0,
            bots_added: 0,
        };
        room.add_player(host_id, host_name)?;
        Ok(room)
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub(crate) fn bump_epoch(&mut self) {
        self.epoch += 1;
    }

    pub fn is_host(&self, player_id: &str) -> bool {
        self.host_id == player_id
    }

    pub fn ensure_host(&self, player_id: &str, action: &str) -> GameResult<()> {
        if !self.is_host(player_id) {
            return Err(GameError::unauthorized(format!("only the host can {}", action)));
        }
        Ok(())
    }

    pub fn ensure_member(&self, player_id: &str) -> GameResult<()> {
        if !self.players.iter().any(|p| p.id == player_id) {
            return Err(GameError::unauthorized("not a member of this room"));
        }
        Ok(())
    }

    fn ensure_waiting(&self, action: &str) -> GameResult<()> {
        if self.phase != GamePhase::Waiting {
            return Err(GameError::state(format!(
                "Cannot {} once the game has started",
                action
            )));
        }
        Ok(())
    }

    pub fn human_count(&self) -> usize {
        self.players.len()
    }

    pub fn total_players(&self) -> usize {
        self.players.len() + self.bots.len()
    }

    /// Humans first (join order), then bots
    pub fn participants(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().chain(self.bots.iter().map(|b| &b.player))
    }

    pub(crate) fn participants_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players
            .iter_mut()
            .chain(self.bots.iter_mut().map(|b| &mut b.player))
    }

    pub fn participant(&self, id: &str) -> Option<&Player> {
        self.participants().find(|p| p.id == id)
    }

    pub fn bot(&self, id: &str) -> Option<&Bot> {
        self.bots.iter().find(|b| b.player.id == id)
    }

    pub(crate) fn bot_mut(&mut self, id: &str) -> Option<&mut Bot> {
        self.bots.iter_mut().find(|b| b.player.id == id)
    }

    pub fn is_bot(&self, id: &str) -> bool {
        self.bot(id).is_some()
    }

    pub fn is_alive(&self, id: &str) -> bool {
        self.participant(id).is_some() && !self.eliminated.contains(id)
    }

    pub fn alive_ids(&self) -> Vec<PlayerId> {
        self.participants()
            .filter(|p| !self.eliminated.contains(&p.id))
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn alive_bot_ids(&self) -> Vec<PlayerId> {
        self.bots
            .iter()
            .filter(|b| !self.eliminated.contains(&b.player.id))
            .map(|b| b.player.id.clone())
            .collect()
    }

    pub fn roster(&self) -> Vec<RosterEntry> {
        self.participants()
            .map(|p| RosterEntry {
                id: p.id.clone(),
                name: p.name.clone(),
                is_bot: p.is_bot,
            })
            .collect()
    }

    pub fn display_name(&self, id: &str) -> String {
        self.participant(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Add a human. A missing or blank name becomes `Player{n}`.
    pub fn add_player(&mut self, id: PlayerId, name: Option<String>) -> GameResult<&Player> {
        self.ensure_waiting("join")?;
        if self.participant(&id).is_some() {
            return Err(GameError::state("Already in this room"));
        }

        self.humans_joined += 1;
        let name = match name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => clean_name(n)?,
            _ => format!("Player{}", self.humans_joined),
        };

        tracing::info!(room = %self.code, player = %id, name = %name, "Player joined");
        self.players.push(Player::human(id, name));
        let idx = self.players.len() - 1;
        Ok(&self.players[idx])
    }

    pub fn add_bot(&mut self) -> GameResult<&Player> {
        self.ensure_waiting("add bots")?;
        if self.bots.len() >= self.config.max_bots {
            return Err(GameError::LimitReached(format!(
                "a room holds at most {} bots",
                self.config.max_bots
            )));
        }

        self.bots_added += 1;
        let id = format!("bot_{}", ulid::Ulid::new());
        let name = format!("Bot{}", self.bots_added);
        tracing::info!(room = %self.code, bot = %id, name = %name, "Bot added");

        self.bots.push(Bot {
            player: Player::bot(id.clone(), name),
            brain: BotBrain::new(id),
        });
        let idx = self.bots.len() - 1;
        Ok(&self.bots[idx].player)
    }

    pub fn remove_bot(&mut self, bot_id: &str) -> GameResult<()> {
        self.ensure_waiting("remove bots")?;
        let before = self.bots.len();
        self.bots.retain(|b| b.player.id != bot_id);
        if self.bots.len() == before {
            return Err(GameError::not_found("Bot"));
        }
        tracing::info!(room = %self.code, bot = %bot_id, "Bot removed");
        Ok(())
    }

    pub fn rename_player(&mut self, player_id: &str, name: &str) -> GameResult<()> {
        let name = clean_name(name)?;
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or_else(|| GameError::not_found("Player"))?;
        player.name = name;
        Ok(())
    }

    pub fn rename_bot(&mut self, bot_id: &str, name: &str) -> GameResult<()> {
        let name = clean_name(name)?;
        let bot = self
            .bot_mut(bot_id)
            .ok_or_else(|| GameError::not_found("Bot"))?;
        bot.player.name = name;
        Ok(())
    }

    pub fn update_config(&mut self, update: &ConfigUpdate) -> GameResult<&RoomConfig> {
        self.ensure_waiting("change settings")?;
        self.config = update.merge(&self.config, self.bots.len())?;
        tracing::info!(room = %self.code, config = ?self.config, "Room config updated");
        Ok(&self.config)
    }

    /// Remove a human (leave or disconnect) and work out what the game must do next
    pub fn remove_player(&mut self, player_id: &str) -> GameResult<AfterDeparture> {
        let before = self.players.len();
        self.players.retain(|p| p.id != player_id);
        if self.players.len() == before {
            return Err(GameError::not_found("Player"));
        }
        tracing::info!(room = %self.code, player = %player_id, "Player left");

        if self.players.is_empty() {
            return Ok(AfterDeparture::Abandoned);
        }

        if self.host_id == player_id {
            self.host_id = self.players[0].id.clone();
            tracing::info!(room = %self.code, host = %self.host_id, "Host re-elected");
        }

        self.players_revealed.remove(player_id);
        self.votes.remove(player_id);
        self.player_words.remove(player_id);
        self.abilities.remove(player_id);
        self.swapped_words.remove(player_id);

        let turn_changed = self.drop_from_turn_order(player_id);

        if !matches!(
            self.phase,
            GamePhase::Revealing | GamePhase::Playing | GamePhase::Voting
        ) {
            return Ok(AfterDeparture::Nothing);
        }

        if let Some(winner) = self.check_win_condition() {
            return Ok(AfterDeparture::GameOver(winner));
        }

        let next = match self.phase {
            GamePhase::Revealing if self.reveal_complete() => AfterDeparture::RevealComplete,
            GamePhase::Playing if turn_changed && !self.locked => match self.current_player() {
                Some(id) => AfterDeparture::TurnPassed(id.clone()),
                None => AfterDeparture::VotingReady,
            },
            GamePhase::Voting if !self.locked && self.all_votes_in() => AfterDeparture::TallyReady,
            _ => AfterDeparture::Nothing,
        };
        Ok(next)
    }

    /// Returns true when the departed player held the current turn
    fn drop_from_turn_order(&mut self, player_id: &str) -> bool {
        let Some(pos) = self.player_order.iter().position(|id| id == player_id) else {
            return false;
        };
        self.player_order.remove(pos);

        if pos < self.current_player_index {
            self.current_player_index -= 1;
            false
        } else if pos == self.current_player_index
            && self.phase == GamePhase::Playing
            && !self.locked
        {
            self.bump_epoch();
            true
        } else {
            false
        }
    }

    fn view(&self, player: &Player, reveal_roles: bool) -> PlayerView {
        PlayerView {
            id: player.id.clone(),
            name: player.name.clone(),
            is_bot: player.is_bot,
            is_host: self.host_id == player.id,
            revealed: player.revealed,
            eliminated: self.eliminated.contains(&player.id),
            role: if reveal_roles { player.role } else { None },
            special_role: if reveal_roles {
                player.special_role
            } else {
                None
            },
        }
    }

    pub fn player_views(&self, reveal_roles: bool) -> Vec<PlayerView> {
        self.participants()
            .map(|p| self.view(p, reveal_roles))
            .collect()
    }

    /// Public state; roles stay hidden until the game is finished
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            code: self.code.clone(),
            name: self.name.clone(),
            host_id: self.host_id.clone(),
            phase: self.phase,
            players: self.player_views(self.phase == GamePhase::Finished),
            config: self.config.clone(),
            round_number: self.round_number,
            current_player: match self.phase {
                GamePhase::Playing => self.current_player().cloned(),
                _ => None,
            },
        }
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            code: self.code.clone(),
            name: self.name.clone(),
            host_name: self.display_name(&self.host_id),
            player_count: self.players.len(),
            bot_count: self.bots.len(),
            max_bots: self.config.max_bots,
            created_at: self.created_at.to_rfc3339(),
        }
    }
}
