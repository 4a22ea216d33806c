//! Timed phase advancement for running sessions
//!
//! Each session carries at most one pending [`Schedule`]: the deadline of its
//! current phase and the step to run when it passes. The server's tick calls
//! [`Orchestrator::tick`], which runs every due step and re-arms the next one.
//! Because the schedule lives on the session, removing a session from the
//! registry also discards its timer.
//!
//! Phases advance on the clock only. A round always lasts
//! `response + voting + results`, even if every player acted early.

use crate::config::PhaseTimings;
use crate::registry::SessionRegistry;
use crate::session::Session;
use log::{debug, info, warn};
use rand::Rng;
use shared::{ActionError, Packet, ParticipantId, Phase};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStep {
    /// Responding -> Voting
    CloseResponses,
    /// Score the round, Voting -> RoundResults
    CloseVoting,
    /// Next round, or final standings and Ended
    NextRound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub deadline: Instant,
    pub step: PhaseStep,
}

pub struct Orchestrator {
    timings: PhaseTimings,
}

impl Orchestrator {
    pub fn new(timings: PhaseTimings) -> Self {
        Self { timings }
    }

    /// Starts the game on behalf of `requester` and arms the first deadline
    ///
    /// Returns the packets to broadcast to the session.
    pub fn start_game<R: Rng + ?Sized>(
        &self,
        session: &mut Session,
        requester: ParticipantId,
        now: Instant,
        rng: &mut R,
    ) -> Result<Vec<Packet>, ActionError> {
        if !session.is_host(requester) {
            return Err(ActionError::Unauthorized);
        }

        session.start_game(rng)?;
        self.arm(session, PhaseStep::CloseResponses, now);

        Ok(vec![state_updated(session), phase_changed(session)])
    }

    /// Runs one step for a session whose deadline `at` has passed
    ///
    /// The next deadline is measured from `at`, not from when the step was
    /// actually run, so a slow tick does not stretch the round.
    pub fn advance<R: Rng + ?Sized>(
        &self,
        session: &mut Session,
        step: PhaseStep,
        at: Instant,
        rng: &mut R,
    ) -> Result<Vec<Packet>, ActionError> {
        session.set_schedule(None);
        debug!("Session {}: running {:?}", session.id(), step);

        match step {
            PhaseStep::CloseResponses => {
                session.open_voting()?;
                self.arm(session, PhaseStep::CloseVoting, at);
                Ok(vec![state_updated(session), phase_changed(session)])
            }
            PhaseStep::CloseVoting => {
                let ranking = session.compute_round_results()?;
                session.show_results()?;
                self.arm(session, PhaseStep::NextRound, at);
                Ok(vec![
                    Packet::RoundResults { ranking },
                    state_updated(session),
                    phase_changed(session),
                ])
            }
            PhaseStep::NextRound => {
                if session.advance_round(rng) {
                    self.arm(session, PhaseStep::CloseResponses, at);
                    return Ok(vec![state_updated(session), phase_changed(session)]);
                }

                let standings = session.final_standings();
                session.end_game()?;
                if let Some(winner) = standings.first() {
                    info!(
                        "Session {} finished, {} wins with {} points",
                        session.id(),
                        winner.player_name,
                        winner.score
                    );
                }

                Ok(vec![
                    Packet::GameEnded { standings },
                    state_updated(session),
                    phase_changed(session),
                ])
            }
        }
    }

    /// Runs every step whose deadline is at or before `now`
    ///
    /// Returns the packets to broadcast, grouped per session id.
    pub fn tick<R: Rng + ?Sized>(
        &self,
        registry: &mut SessionRegistry,
        now: Instant,
        rng: &mut R,
    ) -> Vec<(String, Vec<Packet>)> {
        let due: Vec<(String, Schedule)> = registry
            .sessions()
            .filter_map(|session| {
                session
                    .schedule()
                    .filter(|schedule| schedule.deadline <= now)
                    .map(|schedule| (session.id().to_string(), schedule))
            })
            .collect();

        let mut broadcasts = Vec::with_capacity(due.len());

        for (session_id, schedule) in due {
            let Some(session) = registry.session_mut(&session_id) else {
                continue;
            };

            match self.advance(session, schedule.step, schedule.deadline, rng) {
                Ok(packets) => broadcasts.push((session_id, packets)),
                Err(e) => warn!(
                    "Session {}: dropped {:?} in phase {:?}: {}",
                    session_id,
                    schedule.step,
                    session.phase(),
                    e
                ),
            }
        }

        broadcasts
    }

    fn arm(&self, session: &mut Session, step: PhaseStep, from: Instant) {
        let window = match step {
            PhaseStep::CloseResponses => self.timings.response,
            PhaseStep::CloseVoting => self.timings.voting,
            PhaseStep::NextRound => self.timings.results,
        };

        session.set_schedule(Some(Schedule {
            deadline: from + window,
            step,
        }));
    }
}

pub fn state_updated(session: &Session) -> Packet {
    Packet::StateUpdated {
        state: session.snapshot(),
    }
}

/// The prompt is only attached when a new round opens
pub fn phase_changed(session: &Session) -> Packet {
    let prompt = match session.phase() {
        Phase::Responding => session.prompt().map(str::to_string),
        _ => None,
    };

    Packet::PhaseChanged {
        phase: session.phase(),
        prompt,
    }
}
