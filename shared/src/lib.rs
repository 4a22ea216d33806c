use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub mod catalog;

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_PLAYERS: usize = 8;
pub const MIN_PLAYERS: usize = 2;
pub const MAX_ROUNDS: u32 = 3;
pub const SESSION_CODE_LEN: usize = 6;
pub const ANONYMOUS_NAME: &str = "Anonymous";
/// Longer display names are cut to this many characters
pub const MAX_NAME_LEN: usize = 32;

/// Identifier the server assigns to a connected participant
pub type ParticipantId = u32;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    Heartbeat,
    Disconnect,
    CreateSession {
        player_name: String,
    },
    JoinSession {
        session_id: String,
        player_name: String,
    },
    LeaveSession,
    StartGame,
    SubmitResponse {
        reaction_id: u32,
    },
    SubmitVote {
        target_id: ParticipantId,
    },
    UsePowerUp {
        kind: ModifierKind,
    },
    RequestCatalog,

    Connected {
        client_id: ParticipantId,
    },
    Disconnected {
        reason: String,
    },
    SessionCreated {
        session_id: String,
        state: Snapshot,
    },
    StateUpdated {
        state: Snapshot,
    },
    PhaseChanged {
        phase: Phase,
        prompt: Option<String>,
    },
    RoundResults {
        ranking: Vec<RoundResult>,
    },
    GameEnded {
        standings: Vec<Standing>,
    },
    ActionFailed {
        reason: ActionError,
    },
    CatalogData {
        reactions: Vec<Reaction>,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Lobby,
    Responding,
    Voting,
    RoundResults,
    Ended,
}

impl Phase {
    /// Whether the state machine may move from `self` directly to `next`
    pub fn can_transition_to(self, next: Phase) -> bool {
        matches!(
            (self, next),
            (Phase::Lobby, Phase::Responding)
                | (Phase::Responding, Phase::Voting)
                | (Phase::Voting, Phase::RoundResults)
                | (Phase::RoundResults, Phase::Responding)
                | (Phase::RoundResults, Phase::Ended)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKind {
    DoublePoints,
    AnonymousResponse,
}

impl ModifierKind {
    pub const ALL: [ModifierKind; 2] = [ModifierKind::DoublePoints, ModifierKind::AnonymousResponse];
}

/// A single-use effect assigned to a player for the current round
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Modifier {
    pub kind: ModifierKind,
    pub used: bool,
}

impl Modifier {
    pub fn new(kind: ModifierKind) -> Self {
        Self { kind, used: false }
    }

    /// True once the holder has spent a modifier of the given kind
    pub fn is_active(&self, kind: ModifierKind) -> bool {
        self.kind == kind && self.used
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Gif,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub id: u32,
    pub kind: ReactionKind,
    pub url: String,
    pub caption: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlayerView {
    pub id: ParticipantId,
    pub name: String,
    pub modifier: Option<Modifier>,
}

/// One submitted response as shown to voters
///
/// `player_id` is kept so it can be voted for; an anonymous response only
/// masks `player_name`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VotingEntry {
    pub player_id: ParticipantId,
    pub player_name: String,
    pub reaction: Option<Reaction>,
}

/// Read-only projection of a session sent to every participant
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub id: String,
    pub host_id: ParticipantId,
    pub phase: Phase,
    pub round: u32,
    pub max_rounds: u32,
    pub prompt: Option<String>,
    pub players: Vec<PlayerView>,
    pub scores: HashMap<ParticipantId, u32>,
    pub responded_ids: Vec<ParticipantId>,
    pub voted_ids: Vec<ParticipantId>,
    pub voting_view: Vec<VotingEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RoundResult {
    pub player_id: ParticipantId,
    pub player_name: String,
    pub votes: u32,
    pub total_score: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Standing {
    pub player_id: ParticipantId,
    pub player_name: String,
    pub score: u32,
}

/// Recoverable action failures, reported only to the participant that caused them
#[derive(Debug, Error, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ActionError {
    #[error("session not found")]
    NotFound,
    #[error("not in a session")]
    NotInSession,
    #[error("already in a session")]
    AlreadyInSession,
    #[error("action not allowed in the current phase")]
    InvalidPhase,
    #[error("session is full")]
    SessionFull,
    #[error("at least 2 players are needed to start")]
    NotEnoughPlayers,
    #[error("players cannot vote for themselves")]
    SelfTargetingForbidden,
    #[error("only the host can do that")]
    Unauthorized,
    #[error("unknown player")]
    UnknownPlayer,
    #[error("power-up not available")]
    ModifierUnavailable,
    #[error("internal server error")]
    InternalError,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> Snapshot {
        let mut scores = HashMap::new();
        scores.insert(1, 4);
        scores.insert(2, 1);

        Snapshot {
            id: "ABC123".to_string(),
            host_id: 1,
            phase: Phase::Voting,
            round: 2,
            max_rounds: MAX_ROUNDS,
            prompt: Some(catalog::PROMPTS[0].to_string()),
            players: vec![
                PlayerView {
                    id: 1,
                    name: "Ada".to_string(),
                    modifier: Some(Modifier::new(ModifierKind::DoublePoints)),
                },
                PlayerView {
                    id: 2,
                    name: "Grace".to_string(),
                    modifier: None,
                },
            ],
            scores,
            responded_ids: vec![1, 2],
            voted_ids: vec![2],
            voting_view: vec![VotingEntry {
                player_id: 1,
                player_name: ANONYMOUS_NAME.to_string(),
                reaction: catalog::reaction(3),
            }],
        }
    }

    #[test]
    fn test_phase_transitions_follow_round_path() {
        assert!(Phase::Lobby.can_transition_to(Phase::Responding));
        assert!(Phase::Responding.can_transition_to(Phase::Voting));
        assert!(Phase::Voting.can_transition_to(Phase::RoundResults));
        assert!(Phase::RoundResults.can_transition_to(Phase::Responding));
        assert!(Phase::RoundResults.can_transition_to(Phase::Ended));

        assert!(!Phase::Lobby.can_transition_to(Phase::Voting));
        assert!(!Phase::Voting.can_transition_to(Phase::Responding));
        assert!(!Phase::Responding.can_transition_to(Phase::Ended));
    }

    #[test]
    fn test_ended_is_terminal() {
        for next in [
            Phase::Lobby,
            Phase::Responding,
            Phase::Voting,
            Phase::RoundResults,
            Phase::Ended,
        ] {
            assert!(!Phase::Ended.can_transition_to(next));
        }
    }

    #[test]
    fn test_modifier_activation() {
        let mut modifier = Modifier::new(ModifierKind::AnonymousResponse);
        assert!(!modifier.is_active(ModifierKind::AnonymousResponse));

        modifier.used = true;
        assert!(modifier.is_active(ModifierKind::AnonymousResponse));
        assert!(!modifier.is_active(ModifierKind::DoublePoints));
    }

    #[test]
    fn test_packet_serialization_state_updated() {
        let packet = Packet::StateUpdated {
            state: sample_snapshot(),
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::StateUpdated { state } => {
                assert_eq!(state, sample_snapshot());
                assert_eq!(state.scores.get(&1), Some(&4));
                assert_eq!(state.voting_view[0].player_name, ANONYMOUS_NAME);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_action_failed() {
        let packet = Packet::ActionFailed {
            reason: ActionError::SelfTargetingForbidden,
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::ActionFailed { reason } => {
                assert_eq!(reason, ActionError::SelfTargetingForbidden)
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_action_error_messages() {
        assert_eq!(ActionError::SessionFull.to_string(), "session is full");
        assert_eq!(
            ActionError::NotEnoughPlayers.to_string(),
            "at least 2 players are needed to start"
        );
    }
}
