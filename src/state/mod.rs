mod commands;
pub mod registry;
mod scheduler;

pub use commands::JoinedRoom;
pub use registry::{RoomHandle, RoomRegistry};

use crate::abuse::RateLimiter;
use crate::config::Timings;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: RoomRegistry,
    /// Pacing of bots and timed transitions
    pub timings: Timings,
    /// Per-player command limiter for socket clients
    pub rate_limiter: Option<RateLimiter>,
}

impl AppState {
    pub fn new(timings: Timings) -> Self {
        Self::with_registry(RoomRegistry::new(), timings)
    }

    pub fn with_registry(registry: RoomRegistry, timings: Timings) -> Self {
        Self {
            registry,
            timings,
            rate_limiter: None,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Option<RateLimiter>) -> Self {
        self.rate_limiter = limiter;
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Timings::default())
    }
}
