//! Authoritative state machine for a single game session
//!
//! A session walks through `Lobby -> Responding -> Voting -> RoundResults`
//! once per round and finishes in `Ended`. Every mutator checks the current
//! phase first and leaves the state untouched when it rejects an action, so
//! callers can report the error to the originating participant and carry on.
//!
//! Per-round data (submissions, votes, modifiers) is kept in join or
//! submission order so that snapshots and vote tallies are deterministic.

use crate::config::GameConfig;
use crate::orchestrator::Schedule;
use log::{debug, info};
use rand::Rng;
use shared::{
    catalog, ActionError, Modifier, ModifierKind, ParticipantId, Phase, PlayerView, RoundResult,
    Snapshot, Standing, VotingEntry, ANONYMOUS_NAME, MIN_PLAYERS,
};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: ParticipantId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    host_id: ParticipantId,
    phase: Phase,
    round: u32,
    max_rounds: u32,
    max_players: usize,
    prompt: Option<String>,
    /// Players in join order
    players: Vec<Player>,
    /// (player, reaction id) in first-submission order
    submissions: Vec<(ParticipantId, u32)>,
    /// (voter, target) in first-vote order
    votes: Vec<(ParticipantId, ParticipantId)>,
    modifiers: HashMap<ParticipantId, Modifier>,
    scores: HashMap<ParticipantId, u32>,
    schedule: Option<Schedule>,
}

impl Session {
    /// Creates a session in the lobby with the host as its first player
    pub fn new(id: String, host_id: ParticipantId, host_name: String, config: &GameConfig) -> Self {
        let mut scores = HashMap::new();
        scores.insert(host_id, 0);

        Self {
            id,
            host_id,
            phase: Phase::Lobby,
            round: 0,
            max_rounds: config.max_rounds,
            max_players: config.max_players,
            prompt: None,
            players: vec![Player {
                id: host_id,
                name: host_name,
            }],
            submissions: Vec::new(),
            votes: Vec::new(),
            modifiers: HashMap::new(),
            scores,
            schedule: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn host_id(&self) -> ParticipantId {
        self.host_id
    }

    pub fn is_host(&self, id: ParticipantId) -> bool {
        self.host_id == id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    pub fn has_player(&self, id: ParticipantId) -> bool {
        self.players.iter().any(|p| p.id == id)
    }

    pub fn score(&self, id: ParticipantId) -> Option<u32> {
        self.scores.get(&id).copied()
    }

    pub fn submission(&self, id: ParticipantId) -> Option<u32> {
        lookup(&self.submissions, id)
    }

    pub fn vote(&self, voter: ParticipantId) -> Option<ParticipantId> {
        lookup(&self.votes, voter)
    }

    pub fn modifier(&self, id: ParticipantId) -> Option<Modifier> {
        self.modifiers.get(&id).copied()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.len()
    }

    pub fn vote_count(&self) -> usize {
        self.votes.len()
    }

    pub fn modifier_count(&self) -> usize {
        self.modifiers.len()
    }

    /// Pending orchestrator step for this session, if any
    pub fn schedule(&self) -> Option<Schedule> {
        self.schedule
    }

    pub(crate) fn set_schedule(&mut self, schedule: Option<Schedule>) {
        self.schedule = schedule;
    }

    /// Adds a player to the lobby
    ///
    /// Names are not required to be unique. Adding an id that is already
    /// seated is accepted and changes nothing.
    pub fn add_player(&mut self, id: ParticipantId, name: String) -> Result<(), ActionError> {
        if self.phase != Phase::Lobby {
            return Err(ActionError::InvalidPhase);
        }
        if self.has_player(id) {
            return Ok(());
        }
        if self.is_full() {
            return Err(ActionError::SessionFull);
        }

        info!("Player {} ({}) joined session {}", id, name, self.id);
        self.players.push(Player { id, name });
        self.scores.insert(id, 0);
        Ok(())
    }

    /// Removes a player and everything recorded for them, in any phase
    ///
    /// Votes cast for the player are discarded along with the player's own
    /// vote. If the host leaves, the earliest-joined remaining player becomes
    /// host. Returns false if the player was not seated.
    pub fn remove_player(&mut self, id: ParticipantId) -> bool {
        let Some(index) = self.players.iter().position(|p| p.id == id) else {
            return false;
        };

        let player = self.players.remove(index);
        self.scores.remove(&id);
        self.modifiers.remove(&id);
        self.submissions.retain(|(owner, _)| *owner != id);
        self.votes
            .retain(|(voter, target)| *voter != id && *target != id);

        info!("Player {} ({}) left session {}", id, player.name, self.id);

        if self.host_id == id {
            if let Some(next) = self.players.first() {
                info!("Session {}: host passed to player {}", self.id, next.id);
                self.host_id = next.id;
            }
        }

        true
    }

    /// Leaves the lobby and opens round 1
    pub fn start_game<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), ActionError> {
        if self.phase != Phase::Lobby {
            return Err(ActionError::InvalidPhase);
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(ActionError::NotEnoughPlayers);
        }

        self.phase = Phase::Responding;
        self.round = 1;
        self.draw_prompt(rng);
        self.assign_modifiers(rng);

        info!(
            "Session {} started with {} players",
            self.id,
            self.players.len()
        );
        Ok(())
    }

    /// Records a player's reaction for this round; the latest choice wins
    pub fn submit_response(
        &mut self,
        player: ParticipantId,
        reaction_id: u32,
    ) -> Result<(), ActionError> {
        if self.phase != Phase::Responding {
            return Err(ActionError::InvalidPhase);
        }
        if !self.has_player(player) {
            return Err(ActionError::UnknownPlayer);
        }

        upsert(&mut self.submissions, player, reaction_id);
        Ok(())
    }

    /// Records a vote; a voter may change their vote until voting closes
    pub fn submit_vote(
        &mut self,
        voter: ParticipantId,
        target: ParticipantId,
    ) -> Result<(), ActionError> {
        if self.phase != Phase::Voting {
            return Err(ActionError::InvalidPhase);
        }
        if voter == target {
            return Err(ActionError::SelfTargetingForbidden);
        }
        if !self.has_player(voter) || !self.has_player(target) {
            return Err(ActionError::UnknownPlayer);
        }

        upsert(&mut self.votes, voter, target);
        Ok(())
    }

    /// Spends the player's modifier for this round
    ///
    /// Only allowed while responding or voting, since that is where either
    /// effect can still change the outcome.
    pub fn use_power_up(
        &mut self,
        player: ParticipantId,
        kind: ModifierKind,
    ) -> Result<(), ActionError> {
        if !matches!(self.phase, Phase::Responding | Phase::Voting) {
            return Err(ActionError::InvalidPhase);
        }

        match self.modifiers.get_mut(&player) {
            Some(modifier) if modifier.kind == kind && !modifier.used => {
                modifier.used = true;
                debug!("Session {}: player {} used {:?}", self.id, player, kind);
                Ok(())
            }
            _ => Err(ActionError::ModifierUnavailable),
        }
    }

    /// Tallies this round's votes into the cumulative scores
    ///
    /// Returns every player who received at least one vote, most votes first.
    /// Ties keep the order in which targets first received a vote. Must be
    /// called once per round, before the session leaves `Voting`.
    pub fn compute_round_results(&mut self) -> Result<Vec<RoundResult>, ActionError> {
        if self.phase != Phase::Voting {
            return Err(ActionError::InvalidPhase);
        }

        let mut tally: Vec<(ParticipantId, u32)> = Vec::new();
        for (_, target) in &self.votes {
            match tally.iter_mut().find(|(id, _)| id == target) {
                Some((_, count)) => *count += 1,
                None => tally.push((*target, 1)),
            }
        }

        for (target, votes) in &tally {
            let doubled = self
                .modifiers
                .get(target)
                .map_or(false, |m| m.is_active(ModifierKind::DoublePoints));
            let points = if doubled { votes * 2 } else { *votes };

            if let Some(score) = self.scores.get_mut(target) {
                *score += points;
            }
        }

        tally.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(tally
            .into_iter()
            .map(|(player_id, votes)| RoundResult {
                player_id,
                player_name: self.player_name(player_id).unwrap_or_default(),
                votes,
                total_score: self.score(player_id).unwrap_or(0),
            })
            .collect())
    }

    /// Closes responses and opens voting
    pub fn open_voting(&mut self) -> Result<(), ActionError> {
        self.transition(Phase::Voting)
    }

    /// Closes voting; scores must already have been computed
    pub fn show_results(&mut self) -> Result<(), ActionError> {
        self.transition(Phase::RoundResults)
    }

    /// Moves to the terminal phase once the last round has been played
    pub fn end_game(&mut self) -> Result<(), ActionError> {
        if self.round < self.max_rounds {
            return Err(ActionError::InvalidPhase);
        }
        self.transition(Phase::Ended)?;
        info!("Session {} ended after {} rounds", self.id, self.round);
        Ok(())
    }

    /// Clears per-round state and opens the next round if one remains
    ///
    /// Returns false once all rounds have been played; the session then stays
    /// in `RoundResults` until `end_game` is called.
    pub fn advance_round<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if matches!(self.phase, Phase::Lobby | Phase::Ended) {
            return false;
        }

        self.submissions.clear();
        self.votes.clear();
        self.modifiers.clear();

        if self.round >= self.max_rounds {
            return false;
        }

        self.round += 1;
        self.phase = Phase::Responding;
        self.draw_prompt(rng);
        self.assign_modifiers(rng);

        debug!("Session {}: round {} of {}", self.id, self.round, self.max_rounds);
        true
    }

    /// All players ranked by cumulative score, join order on ties
    pub fn final_standings(&self) -> Vec<Standing> {
        let mut standings: Vec<Standing> = self
            .players
            .iter()
            .map(|p| Standing {
                player_id: p.id,
                player_name: p.name.clone(),
                score: self.score(p.id).unwrap_or(0),
            })
            .collect();

        standings.sort_by(|a, b| b.score.cmp(&a.score));
        standings
    }

    pub fn snapshot(&self) -> Snapshot {
        let voting_view = if self.phase == Phase::Voting {
            self.submissions
                .iter()
                .map(|(owner, reaction_id)| {
                    let anonymous = self
                        .modifiers
                        .get(owner)
                        .map_or(false, |m| m.is_active(ModifierKind::AnonymousResponse));

                    VotingEntry {
                        player_id: *owner,
                        player_name: if anonymous {
                            ANONYMOUS_NAME.to_string()
                        } else {
                            self.player_name(*owner).unwrap_or_default()
                        },
                        reaction: catalog::reaction(*reaction_id),
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        Snapshot {
            id: self.id.clone(),
            host_id: self.host_id,
            phase: self.phase,
            round: self.round,
            max_rounds: self.max_rounds,
            prompt: self.prompt.clone(),
            players: self
                .players
                .iter()
                .map(|p| PlayerView {
                    id: p.id,
                    name: p.name.clone(),
                    modifier: self.modifier(p.id),
                })
                .collect(),
            scores: self.scores.clone(),
            responded_ids: self.submissions.iter().map(|(id, _)| *id).collect(),
            voted_ids: self.votes.iter().map(|(id, _)| *id).collect(),
            voting_view,
        }
    }

    fn player_name(&self, id: ParticipantId) -> Option<String> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.clone())
    }

    fn transition(&mut self, next: Phase) -> Result<(), ActionError> {
        if !self.phase.can_transition_to(next) {
            return Err(ActionError::InvalidPhase);
        }
        debug!("Session {}: {:?} -> {:?}", self.id, self.phase, next);
        self.phase = next;
        Ok(())
    }

    fn draw_prompt<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let index = rng.gen_range(0..catalog::PROMPTS.len());
        self.prompt = Some(catalog::PROMPTS[index].to_string());
    }

    fn assign_modifiers<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.modifiers.clear();
        for player in &self.players {
            let kind = ModifierKind::ALL[rng.gen_range(0..ModifierKind::ALL.len())];
            self.modifiers.insert(player.id, Modifier::new(kind));
        }
    }
}

fn lookup<V: Copy>(entries: &[(ParticipantId, V)], key: ParticipantId) -> Option<V> {
    entries.iter().find(|(id, _)| *id == key).map(|(_, v)| *v)
}

// Overwrites in place so a changed answer keeps its original position
fn upsert<V>(entries: &mut Vec<(ParticipantId, V)>, key: ParticipantId, value: V) {
    match entries.iter_mut().find(|(id, _)| *id == key) {
        Some(entry) => entry.1 = value,
        None => entries.push((key, value)),
    }
}
