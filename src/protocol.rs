use crate::config::{ConfigUpdate, RoomConfig};
use crate::game::ability::RoleAbility;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom {
        #[serde(default)]
        room_name: Option<String>,
        #[serde(default)]
        player_name: Option<String>,
    },
    ListRooms {
        #[serde(default)]
        query: Option<String>,
    },
    JoinRoom {
        code: RoomCode,
        #[serde(default)]
        player_name: Option<String>,
    },
    LeaveRoom,
    UpdatePlayerName {
        name: String,
    },
    // Host-only lobby management
    AddBot,
    RemoveBot {
        bot_id: PlayerId,
    },
    UpdateBotName {
        bot_id: PlayerId,
        name: String,
    },
    UpdateConfig {
        config: ConfigUpdate,
    },
    StartGame,
    ReturnToLobby,
    // In-game
    PlayerRevealed,
    SubmitWord {
        word: String,
    },
    SubmitVote {
        target_id: PlayerId,
    },
    // Special roles
    InterrogatePlayer {
        target_id: PlayerId,
    },
    RemoveVote {
        target_id: PlayerId,
    },
    UseWriterAbility {
        target_id: PlayerId,
        fake_word: String,
    },
}

/// Public view of a participant. Roles are only filled in once the game is over.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub is_bot: bool,
    pub is_host: bool,
    pub revealed: bool,
    pub eliminated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_role: Option<SpecialRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomSnapshot {
    pub code: RoomCode,
    pub name: String,
    pub host_id: PlayerId,
    pub phase: GamePhase,
    pub players: Vec<PlayerView>,
    pub config: RoomConfig,
    pub round_number: u32,
    pub current_player: Option<PlayerId>,
}

/// Entry in the lobby browser
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomSummary {
    pub code: RoomCode,
    pub name: String,
    pub host_name: String,
    pub player_count: usize,
    pub bot_count: usize,
    pub max_bots: usize,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        player_id: PlayerId,
        server_now: String,
    },
    RoomCreated {
        code: RoomCode,
        room: RoomSnapshot,
    },
    RoomJoined {
        code: RoomCode,
        room: RoomSnapshot,
    },
    RoomList {
        rooms: Vec<RoomSummary>,
    },
    RoomLeft,
    RoomUpdated {
        room: RoomSnapshot,
    },
    /// Sent privately to each human at game start; word and clue depend on the role
    GameStarted {
        role: Role,
        special_role: Option<SpecialRole>,
        word: Option<String>,
        clue: Option<String>,
        word_history: Vec<WordRecord>,
        ability: Option<RoleAbility>,
    },
    RevealProgress {
        revealed: usize,
        total: usize,
    },
    PlayingPhaseStarted {
        current_player: Option<PlayerId>,
        player_order: Vec<PlayerId>,
        round_number: u32,
    },
    NextPlayer {
        current_player: PlayerId,
    },
    BotThinking {
        bot_id: PlayerId,
    },
    WordSubmitted {
        player_id: PlayerId,
        player_name: String,
        word: String,
    },
    VotingStarted {
        players: Vec<PlayerId>,
    },
    VoteProgress {
        voted: usize,
        total: usize,
    },
    VoteCountsUpdated {
        counts: HashMap<PlayerId, u32>,
    },
    VoteTied {
        tied_players: Vec<PlayerId>,
    },
    TiebreakerStarted {
        players: Vec<PlayerId>,
        current_player: Option<PlayerId>,
    },
    PlayerEliminated {
        player_id: PlayerId,
        role: Role,
        votes: u32,
    },
    GameFinished {
        winner: Winner,
        word: Option<String>,
        players: Vec<PlayerView>,
    },
    NewRound {
        round_number: u32,
        current_player: Option<PlayerId>,
    },
    /// Flavour text for special roles; carries no game state
    RoleNotification {
        #[serde(rename = "type")]
        kind: String,
        message: String,
    },
    /// Private: a writer changed the word this player sees
    WordSwapped {
        new_word: String,
    },
    InterrogationResult {
        target_id: PlayerId,
        role: Role,
    },
    VoteRemoved {
        target_id: PlayerId,
    },
    WriterResult {
        target_id: PlayerId,
        success: bool,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl From<crate::error::GameError> for ServerMessage {
    fn from(err: crate::error::GameError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            msg: err.to_string(),
        }
    }
}

/// Who a room notification is meant for
#[derive(Debug, Clone, PartialEq)]
pub enum Recipient {
    Room,
    Player(PlayerId),
}

/// Message travelling on a room's notification channel
#[derive(Debug, Clone)]
pub struct Outbound {
    pub recipient: Recipient,
    pub message: ServerMessage,
}

impl Outbound {
    pub fn is_for(&self, player_id: &str) -> bool {
        match &self.recipient {
            Recipient::Room => true,
            Recipient::Player(id) => id == player_id,
        }
    }
}
