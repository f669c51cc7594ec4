//! Room settings and process-level timing configuration

use crate::error::{GameError, GameResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::time::Duration;

/// Hard cap on bots per room, regardless of room configuration
pub const MAX_BOTS: usize = 15;
/// Upper bound for any per-room delay, in seconds
pub const MAX_DELAY_SECS: f64 = 300.0;
const MAX_ROLE_COUNT: usize = 10;
const MAX_TIMING_SCALE: f64 = 100.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Classic,
    Roles,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomConfig {
    /// Whether impostors get to see the clue
    pub impostor_has_clue: bool,
    pub num_impostors: usize,
    pub max_bots: usize,
    /// Pause after each submitted word, in seconds
    pub word_delay: f64,
    /// Pause between an elimination and the next round, in seconds
    pub vote_delay: f64,
    pub game_mode: GameMode,
    pub num_detectives: usize,
    pub num_medics: usize,
    pub num_writers: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            impostor_has_clue: true,
            num_impostors: 1,
            max_bots: MAX_BOTS,
            word_delay: 15.0,
            vote_delay: 10.0,
            game_mode: GameMode::Classic,
            num_detectives: 1,
            num_medics: 1,
            num_writers: 1,
        }
    }
}

impl RoomConfig {
    pub fn word_delay(&self) -> Duration {
        Duration::from_secs_f64(self.word_delay)
    }

    pub fn vote_delay(&self) -> Duration {
        Duration::from_secs_f64(self.vote_delay)
    }

    pub fn roles_enabled(&self) -> bool {
        self.game_mode == GameMode::Roles
    }
}

/// Partial configuration update sent by the host
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfigUpdate {
    pub impostor_has_clue: Option<bool>,
    pub num_impostors: Option<usize>,
    pub max_bots: Option<usize>,
    pub word_delay: Option<f64>,
    pub vote_delay: Option<f64>,
    pub game_mode: Option<GameMode>,
    pub num_detectives: Option<usize>,
    pub num_medics: Option<usize>,
    pub num_writers: Option<usize>,
}

fn validate_delay(name: &str, value: f64) -> GameResult<f64> {
    if !value.is_finite() || !(0.0..=MAX_DELAY_SECS).contains(&value) {
        return Err(GameError::InvalidInput(format!(
            "{} must be between 0 and {} seconds",
            name, MAX_DELAY_SECS
        )));
    }
    Ok(value)
}

fn validate_role_count(name: &str, value: usize) -> GameResult<usize> {
    if value > MAX_ROLE_COUNT {
        return Err(GameError::InvalidInput(format!(
            "{} cannot exceed {}",
            name, MAX_ROLE_COUNT
        )));
    }
    Ok(value)
}

impl ConfigUpdate {
    /// Validate every present field and produce the merged configuration.
    ///
    /// `current_bots` is the number of bots already in the room; `max_bots`
    /// may not drop below it.
    pub fn merge(&self, base: &RoomConfig, current_bots: usize) -> GameResult<RoomConfig> {
        let mut next = base.clone();

        if let Some(v) = self.impostor_has_clue {
            next.impostor_has_clue = v;
        }
        if let Some(v) = self.num_impostors {
            if v == 0 || v > MAX_ROLE_COUNT {
                return Err(GameError::InvalidInput(format!(
                    "num_impostors must be between 1 and {}",
                    MAX_ROLE_COUNT
                )));
            }
            next.num_impostors = v;
        }
        if let Some(v) = self.max_bots {
            if v > MAX_BOTS {
                return Err(GameError::InvalidInput(format!(
                    "max_bots cannot exceed {}",
                    MAX_BOTS
                )));
            }
            if v < current_bots {
                return Err(GameError::InvalidInput(format!(
                    "max_bots cannot be lower than the {} bots already in the room",
                    current_bots
                )));
            }
            next.max_bots = v;
        }
        if let Some(v) = self.word_delay {
            next.word_delay = validate_delay("word_delay", v)?;
        }
        if let Some(v) = self.vote_delay {
            next.vote_delay = validate_delay("vote_delay", v)?;
        }
        if let Some(v) = self.game_mode {
            next.game_mode = v;
        }
        if let Some(v) = self.num_detectives {
            next.num_detectives = validate_role_count("num_detectives", v)?;
        }
        if let Some(v) = self.num_medics {
            next.num_medics = validate_role_count("num_medics", v)?;
        }
        if let Some(v) = self.num_writers {
            next.num_writers = validate_role_count("num_writers", v)?;
        }

        Ok(next)
    }
}

/// Fixed pacing of bots and phase transitions that is not part of room config
#[derive(Debug, Clone, PartialEq)]
pub struct Timings {
    /// How long a bot "thinks" before its word (3–5 s by default)
    pub bot_think: Range<Duration>,
    /// Extra computation delay before a bot word or vote
    pub bot_decision: Duration,
    /// Stagger between consecutive bot votes
    pub bot_vote: Range<Duration>,
    /// Pause between a tied vote and the tiebreaker sub-round
    pub tiebreak_delay: Duration,
    /// Multiplier applied to every delay, including room word/vote delays
    pub scale: f64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            bot_think: Duration::from_secs(3)..Duration::from_secs(5),
            bot_decision: Duration::from_millis(500),
            bot_vote: Duration::from_secs(2)..Duration::from_secs(5),
            tiebreak_delay: Duration::from_secs(5),
            scale: 1.0,
        }
    }
}

impl Timings {
    /// Zero delays everywhere (tests and local experiments)
    pub fn instant() -> Self {
        Self {
            scale: 0.0,
            ..Self::default()
        }
    }

    /// Out-of-range products saturate instead of panicking
    pub fn scaled(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.scale).unwrap_or(Duration::MAX)
    }
}

/// Process configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub timings: Timings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            timings: Timings::default(),
        }
    }
}

impl ServerConfig {
    /// Load config from environment variables (PORT, TIMING_SCALE)
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(3001);

        let scale = std::env::var("TIMING_SCALE")
            .ok()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.min(MAX_TIMING_SCALE))
            .unwrap_or(1.0);

        tracing::info!(port, timing_scale = scale, "Server config loaded");

        Self {
            port,
            timings: Timings {
                scale,
                ..Timings::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = RoomConfig::default();
        assert!(config.impostor_has_clue);
        assert_eq!(config.num_impostors, 1);
        assert_eq!(config.max_bots, 15);
        assert_eq!(config.game_mode, GameMode::Classic);
        assert_eq!(config.word_delay(), Duration::from_secs(15));
    }

    #[test]
    fn test_merge_applies_present_fields_only() {
        let update = ConfigUpdate {
            num_impostors: Some(2),
            game_mode: Some(GameMode::Roles),
            ..Default::default()
        };
        let merged = update.merge(&RoomConfig::default(), 0).unwrap();
        assert_eq!(merged.num_impostors, 2);
        assert_eq!(merged.game_mode, GameMode::Roles);
        assert!(merged.impostor_has_clue);
        assert_eq!(merged.max_bots, 15);
    }

    #[test]
    fn test_merge_rejects_negative_delay() {
        let update = ConfigUpdate {
            word_delay: Some(-1.0),
            ..Default::default()
        };
        let result = update.merge(&RoomConfig::default(), 0);
        assert!(matches!(result, Err(GameError::InvalidInput(_))));

        let update = ConfigUpdate {
            vote_delay: Some(f64::NAN),
            ..Default::default()
        };
        assert!(update.merge(&RoomConfig::default(), 0).is_err());
    }

    #[test]
    fn test_merge_is_all_or_nothing() {
        let base = RoomConfig::default();
        let update = ConfigUpdate {
            num_impostors: Some(3),
            max_bots: Some(99),
            ..Default::default()
        };
        assert!(update.merge(&base, 0).is_err());
        assert_eq!(base.num_impostors, 1);
    }

    #[test]
    fn test_merge_rejects_zero_impostors_and_low_bot_cap() {
        let update = ConfigUpdate {
            num_impostors: Some(0),
            ..Default::default()
        };
        assert!(update.merge(&RoomConfig::default(), 0).is_err());

        let update = ConfigUpdate {
            max_bots: Some(2),
            ..Default::default()
        };
        assert!(update.merge(&RoomConfig::default(), 3).is_err());
        assert!(update.merge(&RoomConfig::default(), 2).is_ok());
    }

    #[test]
    fn test_partial_update_deserializes() {
        let update: ConfigUpdate =
            serde_json::from_str(r#"{"num_impostors": 2, "game_mode": "roles"}"#).unwrap();
        assert_eq!(update.num_impostors, Some(2));
        assert_eq!(update.game_mode, Some(GameMode::Roles));
        assert_eq!(update.word_delay, None);
    }

    #[test]
    fn test_instant_timings_scale_to_zero() {
        let timings = Timings::instant();
        assert_eq!(timings.scaled(Duration::from_secs(15)), Duration::ZERO);
    }

    #[test]
    #[serial]
    fn test_server_config_from_env() {
        std::env::set_var("PORT", "4000");
        std::env::set_var("TIMING_SCALE", "0.5");
        let config = ServerConfig::from_env();
        assert_eq!(config.port, 4000);
        assert_eq!(
            config.timings.scaled(Duration::from_secs(10)),
            Duration::from_secs(5)
        );
        std::env::remove_var("PORT");
        std::env::remove_var("TIMING_SCALE");
    }

    #[test]
    #[serial]
    fn test_server_config_ignores_garbage() {
        std::env::set_var("TIMING_SCALE", "-3");
        let config = ServerConfig::from_env();
        assert_eq!(config.timings.scale, 1.0);
        assert_eq!(config.port, 3001);
        std::env::remove_var("TIMING_SCALE");
    }

    #[test]
    #[serial]
    fn test_huge_timing_scale_is_clamped() {
        std::env::set_var("TIMING_SCALE", "1e20");
        let config = ServerConfig::from_env();
        assert_eq!(config.timings.scale, MAX_TIMING_SCALE);
        assert_eq!(
            config.timings.scaled(Duration::from_secs(1)),
            Duration::from_secs(100)
        );
        std::env::remove_var("TIMING_SCALE");
    }

    #[test]
    fn test_scaled_saturates_on_overflow() {
        let timings = Timings {
            scale: 1e20,
            ..Timings::default()
        };
        assert_eq!(timings.scaled(Duration::from_secs(15)), Duration::MAX);
    }
}
