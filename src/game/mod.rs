//! Room state machine, voting and special abilities

pub mod ability;
pub mod phase;
pub mod room;
pub mod vote;

pub use ability::{Interrogation, RoleAbility, WordSwap};
pub use phase::TurnStep;
pub use room::{AfterDeparture, Bot, GameRoom};
pub use vote::{TallyOutcome, Vote};
