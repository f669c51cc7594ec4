//! Error taxonomy for room commands.
//!
//! Every rejected command surfaces as a `GameError`; transports turn it into a
//! `ServerMessage::Error` with a stable code and the human-readable message.

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Action restricted to the host or to a specific role
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// Action not valid for the current phase or turn
    #[error("{0}")]
    InvalidState(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Limit reached: {0}")]
    LimitReached(String),

    /// One-shot abilities used again
    #[error("Ability already used: {0}")]
    AbilityUsed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl GameError {
    /// Stable wire code for the error category
    pub fn code(&self) -> &'static str {
        match self {
            GameError::Unauthorized(_) => "UNAUTHORIZED",
            GameError::InvalidState(_) => "INVALID_STATE",
            GameError::NotFound(_) => "NOT_FOUND",
            GameError::LimitReached(_) => "LIMIT_REACHED",
            GameError::AbilityUsed(_) => "ABILITY_USED",
            GameError::InvalidInput(_) => "INVALID_INPUT",
        }
    }

    pub fn state(msg: impl Into<String>) -> Self {
        GameError::InvalidState(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        GameError::NotFound(what.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        GameError::Unauthorized(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(GameError::unauthorized("x").code(), "UNAUTHORIZED");
        assert_eq!(GameError::not_found("Room").code(), "NOT_FOUND");
        assert_eq!(
            GameError::AbilityUsed("medic".to_string()).code(),
            "ABILITY_USED"
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(GameError::not_found("Room").to_string(), "Room not found");
        assert_eq!(
            GameError::state("Not your turn").to_string(),
            "Not your turn"
        );
    }
}
