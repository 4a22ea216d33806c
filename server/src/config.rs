//! Tunable game rules and phase timings

use shared::{MAX_PLAYERS, MAX_ROUNDS};
use std::time::Duration;

/// How long each timed phase stays open before the orchestrator moves on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimings {
    pub response: Duration,
    pub voting: Duration,
    pub results: Duration,
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self {
            response: Duration::from_secs(60),
            voting: Duration::from_secs(45),
            results: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameConfig {
    pub max_players: usize,
    pub max_rounds: u32,
    pub timings: PhaseTimings,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_players: MAX_PLAYERS,
            max_rounds: MAX_ROUNDS,
            timings: PhaseTimings::default(),
        }
    }
}

impl GameConfig {
    /// Length of one full Responding -> Voting -> results cycle
    pub fn round_duration(&self) -> Duration {
        self.timings.response + self.timings.voting + self.timings.results
    }
}

/// Transport-level settings for the UDP server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// How often phase deadlines are checked
    pub tick_duration: Duration,
    /// Maximum number of connected participants across all sessions
    pub max_clients: usize,
    /// Participants silent for longer than this are dropped
    pub client_timeout: Duration,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_duration: Duration::from_millis(100),
            max_clients: 256,
            client_timeout: Duration::from_secs(10),
            game: GameConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timings() {
        let timings = PhaseTimings::default();
        assert_eq!(timings.response, Duration::from_secs(60));
        assert_eq!(timings.voting, Duration::from_secs(45));
        assert_eq!(timings.results, Duration::from_secs(3));
    }

    #[test]
    fn test_round_duration() {
        let config = GameConfig::default();
        assert_eq!(config.round_duration(), Duration::from_secs(108));
        assert_eq!(config.max_players, 8);
        assert_eq!(config.max_rounds, 3);
    }
}
