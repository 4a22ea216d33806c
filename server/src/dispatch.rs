//! Turns participant packets into session actions
//!
//! The dispatcher owns the session registry, the orchestrator and the random
//! source. It never touches sockets: every call returns the packets to send
//! and who should receive them, and the network layer delivers them. State
//! broadcasts are built after the mutation that caused them.

use crate::config::GameConfig;
use crate::orchestrator::{state_updated, Orchestrator};
use crate::registry::{Departure, SessionRegistry};
use crate::session::Session;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{catalog, ActionError, Packet, ParticipantId};
use std::time::Instant;

/// An outbound packet and its audience
#[derive(Debug, Clone)]
pub enum Delivery {
    /// Only the participant whose packet is being handled
    Caller(Packet),
    /// Everyone currently seated in the session
    Session { session_id: String, packet: Packet },
}

pub struct Dispatcher {
    registry: SessionRegistry,
    orchestrator: Orchestrator,
    rng: StdRng,
}

impl Dispatcher {
    pub fn new(config: GameConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: GameConfig, rng: StdRng) -> Self {
        Self {
            registry: SessionRegistry::new(config),
            orchestrator: Orchestrator::new(config.timings),
            rng,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Participants that should receive a session-wide delivery
    pub fn recipients(&self, session_id: &str) -> Vec<ParticipantId> {
        self.registry.participants_of(session_id)
    }

    /// Handles one inbound packet from `client_id`
    ///
    /// Rejected actions produce a single `ActionFailed` for the caller and
    /// leave every session unchanged.
    pub fn handle(&mut self, client_id: ParticipantId, packet: Packet, now: Instant) -> Vec<Delivery> {
        match self.apply(client_id, packet, now) {
            Ok(deliveries) => deliveries,
            Err(reason) => {
                debug!("Client {}: action rejected: {}", client_id, reason);
                vec![Delivery::Caller(Packet::ActionFailed { reason })]
            }
        }
    }

    /// Takes a departed participant out of their session, if any
    pub fn disconnect(&mut self, client_id: ParticipantId) -> Vec<Delivery> {
        self.registry
            .leave_session(client_id)
            .map(|departure| self.after_departure(departure))
            .unwrap_or_default()
    }

    /// Runs due phase steps for every session
    pub fn tick(&mut self, now: Instant) -> Vec<Delivery> {
        self.orchestrator
            .tick(&mut self.registry, now, &mut self.rng)
            .into_iter()
            .flat_map(|(session_id, packets)| to_session(&session_id, packets))
            .collect()
    }

    pub fn shutdown(&mut self) -> Vec<String> {
        self.registry.shutdown()
    }

    fn apply(
        &mut self,
        client_id: ParticipantId,
        packet: Packet,
        now: Instant,
    ) -> Result<Vec<Delivery>, ActionError> {
        match packet {
            Packet::Heartbeat => Ok(Vec::new()),

            Packet::RequestCatalog => Ok(vec![Delivery::Caller(Packet::CatalogData {
                reactions: catalog::reactions(),
            })]),

            Packet::CreateSession { player_name } => {
                let session_id =
                    self.registry
                        .create_session(client_id, player_name, &mut self.rng)?;
                let state = self.seated_session(&session_id)?.snapshot();
                Ok(vec![Delivery::Caller(Packet::SessionCreated {
                    session_id,
                    state,
                })])
            }

            Packet::JoinSession {
                session_id,
                player_name,
            } => {
                let session_id = session_id.trim().to_uppercase();
                self.registry
                    .join_session(&session_id, client_id, player_name)?;
                let state = state_updated(self.seated_session(&session_id)?);
                Ok(to_session(&session_id, vec![state]))
            }

            Packet::LeaveSession => {
                let departure = self
                    .registry
                    .leave_session(client_id)
                    .ok_or(ActionError::NotInSession)?;
                Ok(self.after_departure(departure))
            }

            Packet::StartGame => {
                let session_id = self.seat_of(client_id)?;
                let session = self
                    .registry
                    .session_mut(&session_id)
                    .ok_or(ActionError::NotFound)?;
                let packets =
                    self.orchestrator
                        .start_game(session, client_id, now, &mut self.rng)?;
                Ok(to_session(&session_id, packets))
            }

            Packet::SubmitResponse { reaction_id } => {
                self.mutate(client_id, |s| s.submit_response(client_id, reaction_id))
            }

            Packet::SubmitVote { target_id } => {
                self.mutate(client_id, |s| s.submit_vote(client_id, target_id))
            }

            Packet::UsePowerUp { kind } => self.mutate(client_id, |s| s.use_power_up(client_id, kind)),

            other => {
                warn!("Unexpected packet from client {}: {:?}", client_id, other);
                Ok(Vec::new())
            }
        }
    }

    /// Applies `action` to the caller's session and broadcasts the new state
    fn mutate<F>(&mut self, client_id: ParticipantId, action: F) -> Result<Vec<Delivery>, ActionError>
    where
        F: FnOnce(&mut Session) -> Result<(), ActionError>,
    {
        let session_id = self.seat_of(client_id)?;
        let session = self
            .registry
            .session_mut(&session_id)
            .ok_or(ActionError::NotFound)?;

        action(session)?;
        let state = state_updated(session);
        Ok(to_session(&session_id, vec![state]))
    }

    fn after_departure(&self, departure: Departure) -> Vec<Delivery> {
        if departure.torn_down {
            return Vec::new();
        }

        match self.registry.session(&departure.session_id) {
            Some(session) => to_session(&departure.session_id, vec![state_updated(session)]),
            None => Vec::new(),
        }
    }

    fn seat_of(&self, client_id: ParticipantId) -> Result<String, ActionError> {
        self.registry
            .session_of(client_id)
            .map(str::to_string)
            .ok_or(ActionError::NotInSession)
    }

    fn seated_session(&self, session_id: &str) -> Result<&Session, ActionError> {
        self.registry
            .session(session_id)
            .ok_or(ActionError::NotFound)
    }
}

fn to_session(session_id: &str, packets: Vec<Packet>) -> Vec<Delivery> {
    packets
        .into_iter()
        .map(|packet| Delivery::Session {
            session_id: session_id.to_string(),
            packet,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ModifierKind, Phase, Snapshot};

    fn dispatcher() -> Dispatcher {
        Dispatcher::with_rng(GameConfig::default(), StdRng::seed_from_u64(21))
    }

    fn created_session(deliveries: &[Delivery]) -> String {
        match deliveries {
            [Delivery::Caller(Packet::SessionCreated { session_id, state })] => {
                assert_eq!(state.phase, Phase::Lobby);
                session_id.clone()
            }
            other => panic!("Expected SessionCreated, got {:?}", other),
        }
    }

    fn failure(deliveries: &[Delivery]) -> ActionError {
        match deliveries {
            [Delivery::Caller(Packet::ActionFailed { reason })] => *reason,
            other => panic!("Expected ActionFailed, got {:?}", other),
        }
    }

    fn last_state(deliveries: &[Delivery]) -> Snapshot {
        deliveries
            .iter()
            .rev()
            .find_map(|d| match d {
                Delivery::Session {
                    packet: Packet::StateUpdated { state },
                    ..
                } => Some(state.clone()),
                _ => None,
            })
            .expect("no state broadcast")
    }

    fn two_player_session(dispatcher: &mut Dispatcher) -> String {
        let now = Instant::now();
        let created = dispatcher.handle(
            1,
            Packet::CreateSession {
                player_name: "Ada".to_string(),
            },
            now,
        );
        let session_id = created_session(&created);
        dispatcher.handle(
            2,
            Packet::JoinSession {
                session_id: session_id.clone(),
                player_name: "Grace".to_string(),
            },
            now,
        );
        session_id
    }

    #[test]
    fn test_create_and_join() {
        let mut dispatcher = dispatcher();
        let session_id = two_player_session(&mut dispatcher);

        assert_eq!(dispatcher.recipients(&session_id), vec![1, 2]);
        assert_eq!(dispatcher.registry().len(), 1);
    }

    #[test]
    fn test_join_is_case_insensitive() {
        let mut dispatcher = dispatcher();
        let created = dispatcher.handle(
            1,
            Packet::CreateSession {
                player_name: "Ada".to_string(),
            },
            Instant::now(),
        );
        let session_id = created_session(&created);

        let deliveries = dispatcher.handle(
            2,
            Packet::JoinSession {
                session_id: format!(" {} ", session_id.to_lowercase()),
                player_name: "Grace".to_string(),
            },
            Instant::now(),
        );

        let state = last_state(&deliveries);
        assert_eq!(state.players.len(), 2);
    }

    #[test]
    fn test_join_unknown_session_fails_for_caller_only() {
        let mut dispatcher = dispatcher();
        let deliveries = dispatcher.handle(
            5,
            Packet::JoinSession {
                session_id: "ZZZZZZ".to_string(),
                player_name: "Nobody".to_string(),
            },
            Instant::now(),
        );

        assert_eq!(failure(&deliveries), ActionError::NotFound);
    }

    #[test]
    fn test_actions_outside_session_rejected() {
        let mut dispatcher = dispatcher();
        let now = Instant::now();

        for packet in [
            Packet::StartGame,
            Packet::SubmitResponse { reaction_id: 1 },
            Packet::SubmitVote { target_id: 2 },
            Packet::UsePowerUp {
                kind: ModifierKind::DoublePoints,
            },
            Packet::LeaveSession,
        ] {
            let deliveries = dispatcher.handle(9, packet, now);
            assert_eq!(failure(&deliveries), ActionError::NotInSession);
        }
    }

    #[test]
    fn test_only_host_starts() {
        let mut dispatcher = dispatcher();
        let session_id = two_player_session(&mut dispatcher);

        let deliveries = dispatcher.handle(2, Packet::StartGame, Instant::now());
        assert_eq!(failure(&deliveries), ActionError::Unauthorized);

        let deliveries = dispatcher.handle(1, Packet::StartGame, Instant::now());
        assert_eq!(deliveries.len(), 2);
        assert_eq!(last_state(&deliveries).phase, Phase::Responding);
        assert_eq!(
            dispatcher.registry().session(&session_id).unwrap().round(),
            1
        );
    }

    #[test]
    fn test_submit_response_broadcasts_state() {
        let mut dispatcher = dispatcher();
        two_player_session(&mut dispatcher);
        dispatcher.handle(1, Packet::StartGame, Instant::now());

        let deliveries = dispatcher.handle(2, Packet::SubmitResponse { reaction_id: 7 }, Instant::now());
        let state = last_state(&deliveries);
        assert_eq!(state.responded_ids, vec![2]);
    }

    #[test]
    fn test_self_vote_reported_to_caller() {
        let mut dispatcher = dispatcher();
        two_player_session(&mut dispatcher);
        let start = Instant::now();
        dispatcher.handle(1, Packet::StartGame, start);
        dispatcher.tick(start + GameConfig::default().timings.response);

        let deliveries = dispatcher.handle(1, Packet::SubmitVote { target_id: 1 }, start);
        assert_eq!(failure(&deliveries), ActionError::SelfTargetingForbidden);
    }

    #[test]
    fn test_request_catalog_goes_to_caller() {
        let mut dispatcher = dispatcher();
        let deliveries = dispatcher.handle(3, Packet::RequestCatalog, Instant::now());

        match deliveries.as_slice() {
            [Delivery::Caller(Packet::CatalogData { reactions })] => {
                assert_eq!(reactions.len(), 12)
            }
            other => panic!("Expected CatalogData, got {:?}", other),
        }
    }

    #[test]
    fn test_heartbeat_produces_nothing() {
        let mut dispatcher = dispatcher();
        assert!(dispatcher
            .handle(3, Packet::Heartbeat, Instant::now())
            .is_empty());
    }

    #[test]
    fn test_disconnect_updates_remaining_players() {
        let mut dispatcher = dispatcher();
        let session_id = two_player_session(&mut dispatcher);

        let deliveries = dispatcher.disconnect(1);
        let state = last_state(&deliveries);
        assert_eq!(state.players.len(), 1);
        assert_eq!(state.host_id, 2);

        assert!(dispatcher.disconnect(2).is_empty());
        assert!(dispatcher.registry().session(&session_id).is_none());
        assert!(dispatcher.disconnect(2).is_empty());
    }
}
