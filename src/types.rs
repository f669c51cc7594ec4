use serde::{Deserialize, Serialize};

/// Opaque ID types for readability
pub type PlayerId = String;
pub type RoomCode = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Waiting,
    Revealing,
    Playing,
    Voting,
    Finished,
}

/// Hidden alignment of a player
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Civil,
    Impostor,
}

impl Role {
    pub fn opposite(self) -> Self {
        match self {
            Role::Civil => Role::Impostor,
            Role::Impostor => Role::Civil,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SpecialRole {
    Detective,
    Medic,
    Writer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Civils,
    Impostors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub role: Option<Role>,
    pub special_role: Option<SpecialRole>,
    pub is_bot: bool,
    pub revealed: bool,
}

impl Player {
    pub fn human(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            role: None,
            special_role: None,
            is_bot: false,
            revealed: false,
        }
    }

    pub fn bot(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            role: None,
            special_role: None,
            is_bot: true,
            // Bots never need to acknowledge the reveal
            revealed: true,
        }
    }
}

/// One entry in the per-game word log (detectives use it to recall earlier rounds)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WordRecord {
    pub round: u32,
    pub player_id: PlayerId,
    pub player_name: String,
    pub word: String,
}

/// Public roster entry handed to bot brains
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub name: String,
    pub is_bot: bool,
}
