//! # Party Game Server Library
//!
//! This library provides the authoritative server for a round-based party
//! game. Players gather in a session, answer a prompt with a reaction GIF,
//! vote on each other's answers and collect points over a fixed number of
//! rounds.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Sessions
//! Every rule is enforced here. Clients only ever send intents (join, submit,
//! vote, use a power-up) and receive the resulting state. A rejected intent
//! is answered with an `ActionFailed` packet and never changes a session.
//!
//! ### Phase Timing
//! Each round moves through Responding, Voting and RoundResults on fixed
//! deadlines. The server loop checks those deadlines on every tick and
//! broadcasts each phase change to the session.
//!
//! ### Participant Management
//! Handles the lifecycle of connected participants including:
//! - Connection establishment and participant id assignment
//! - Heartbeats and timeout detection
//! - Releasing seats when a participant leaves or goes quiet
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Event Loop
//! All session state is owned by the main loop and changed one packet or one
//! timer step at a time. Network tasks only move bytes in and out through
//! channels, so no session is ever observed half-updated.
//!
//! ### UDP-Based Communication
//! Packets are bincode-encoded `shared::Packet` values sent over UDP. Every
//! state change is followed by a full snapshot, so a lost update is repaired
//! by the next one.
//!
//! ## Module Organization
//!
//! ### Session Module (`session`)
//! The per-session state machine: players, submissions, votes, modifiers,
//! scores and round results.
//!
//! ### Orchestrator Module (`orchestrator`)
//! Starts games and drives the timed phase sequence for each session.
//!
//! ### Registry Module (`registry`)
//! Creates sessions under unique join codes, seats participants and tears
//! sessions down once they are empty.
//!
//! ### Dispatch Module (`dispatch`)
//! Maps inbound packets onto registry, orchestrator and session calls and
//! decides who receives the outcome.
//!
//! ### Client Manager Module (`client_manager`)
//! Tracks connected addresses, assigns participant ids and detects timeouts.
//!
//! ### Network Module (`network`)
//! UDP socket handling and the main server loop.
//!
//! ### Config Module (`config`)
//! Game rules, phase timings and transport settings.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("127.0.0.1:8080", ServerConfig::default()).await?;
//!
//!     // Runs until a Shutdown message arrives:
//!     // - Accepts connections and session actions
//!     // - Fires phase deadlines on every tick
//!     // - Broadcasts state to everyone seated in a session
//!     // - Drops participants that stop sending heartbeats
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! The server uses an event-driven architecture with internal async tasks that handle:
//! - **Network Receiver**: Continuously listens for incoming packets
//! - **Network Sender**: Processes the outgoing packet queue
//! - **Timeout Checker**: Monitors participant health and removes inactive connections
//! - **Main Loop**: Applies actions, fires phase deadlines and queues broadcasts

pub mod client_manager;
pub mod config;
pub mod dispatch;
pub mod network;
pub mod orchestrator;
pub mod registry;
pub mod session;
