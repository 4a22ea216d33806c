//! Lookup and lifecycle bookkeeping for active sessions
//!
//! The registry maps session codes to sessions and each participant to the
//! session they are seated in. It is owned by the server loop and only
//! mutated from there, one action or timer step at a time.

use crate::config::GameConfig;
use crate::session::Session;
use log::{info, warn};
use rand::Rng;
use shared::{ActionError, ParticipantId, MAX_NAME_LEN, SESSION_CODE_LEN};
use std::collections::HashMap;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_CODE_ATTEMPTS: usize = 16;

/// Result of a participant leaving their session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub session_id: String,
    /// True if the session was empty afterwards and has been removed
    pub torn_down: bool,
}

pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
    participants: HashMap<ParticipantId, String>,
    config: GameConfig,
}

impl SessionRegistry {
    pub fn new(config: GameConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            participants: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Opens a new session with `host_id` as its first player
    pub fn create_session<R: Rng + ?Sized>(
        &mut self,
        host_id: ParticipantId,
        host_name: String,
        rng: &mut R,
    ) -> Result<String, ActionError> {
        if self.participants.contains_key(&host_id) {
            return Err(ActionError::AlreadyInSession);
        }

        let session_id = self.generate_code(rng)?;
        let session = Session::new(
            session_id.clone(),
            host_id,
            display_name(&host_name),
            &self.config,
        );

        info!("Session {} created by player {}", session_id, host_id);
        self.sessions.insert(session_id.clone(), session);
        self.participants.insert(host_id, session_id.clone());

        Ok(session_id)
    }

    pub fn join_session(
        &mut self,
        session_id: &str,
        participant: ParticipantId,
        name: String,
    ) -> Result<(), ActionError> {
        if self.participants.contains_key(&participant) {
            return Err(ActionError::AlreadyInSession);
        }

        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or(ActionError::NotFound)?;

        session.add_player(participant, display_name(&name))?;
        self.participants
            .insert(participant, session_id.to_string());
        Ok(())
    }

    /// Removes a participant from their session, tearing it down once empty
    ///
    /// Returns None if the participant was not seated anywhere.
    pub fn leave_session(&mut self, participant: ParticipantId) -> Option<Departure> {
        let session_id = self.participants.remove(&participant)?;

        let Some(session) = self.sessions.get_mut(&session_id) else {
            warn!(
                "Player {} mapped to missing session {}",
                participant, session_id
            );
            return None;
        };

        session.remove_player(participant);

        let torn_down = session.is_empty();
        if torn_down {
            // Dropping the session also drops any pending phase deadline
            self.sessions.remove(&session_id);
            info!("Session {} closed", session_id);
        }

        Some(Departure {
            session_id,
            torn_down,
        })
    }

    pub fn session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn session_mut(&mut self, session_id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(session_id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Session code the participant is seated in
    pub fn session_of(&self, participant: ParticipantId) -> Option<&str> {
        self.participants.get(&participant).map(String::as_str)
    }

    /// Participants seated in a session, in join order
    pub fn participants_of(&self, session_id: &str) -> Vec<ParticipantId> {
        self.sessions
            .get(session_id)
            .map(|s| s.players().iter().map(|p| p.id).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Closes every session, returning the ids that were open
    pub fn shutdown(&mut self) -> Vec<String> {
        let closed: Vec<String> = self.sessions.drain().map(|(id, _)| id).collect();
        self.participants.clear();

        if !closed.is_empty() {
            info!("Closed {} sessions on shutdown", closed.len());
        }
        closed
    }

    fn generate_code<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String, ActionError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = random_code(rng);
            if !self.sessions.contains_key(&code) {
                return Ok(code);
            }
        }

        warn!(
            "Could not find a free session code after {} attempts",
            MAX_CODE_ATTEMPTS
        );
        Err(ActionError::InternalError)
    }
}

/// Trims surrounding whitespace and caps the length so snapshots stay small
fn display_name(name: &str) -> String {
    name.trim().chars().take(MAX_NAME_LEN).collect()
}

fn random_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SESSION_CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}
