//! Scripted participant for exercising a running server
//!
//! Creates or joins a session, then plays every round on its own: it picks a
//! random reaction, spends its power-up, votes for someone else and starts
//! the game when it is the host and enough players are seated.

use bincode::{deserialize, serialize};
use clap::Parser;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use shared::{catalog, Packet, ParticipantId, Phase, Reaction, Snapshot, MIN_PLAYERS, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::interval;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Display name used in the session
    #[arg(short = 'n', long, default_value = "Bot")]
    name: String,

    /// Session code to join; a new session is created when omitted
    #[arg(short = 'j', long)]
    join: Option<String>,
}

struct Bot {
    socket: UdpSocket,
    server_addr: SocketAddr,
    client_id: ParticipantId,
    reactions: Vec<Reaction>,
    state: Option<Snapshot>,
    /// Round and phase the bot last acted in
    acted: Option<(u32, Phase)>,
    start_requested: bool,
    rng: StdRng,
}

impl Bot {
    async fn send(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    /// Returns false once the game is over
    async fn handle(&mut self, packet: Packet) -> Result<bool, Box<dyn std::error::Error>> {
        match packet {
            Packet::SessionCreated { session_id, state } => {
                info!("Created session {} (share this code)", session_id);
                self.on_state(state).await?;
            }
            Packet::StateUpdated { state } => self.on_state(state).await?,
            Packet::PhaseChanged { phase, prompt } => match prompt {
                Some(prompt) => info!("Phase {:?}: {}", phase, prompt),
                None => info!("Phase {:?}", phase),
            },
            Packet::RoundResults { ranking } => {
                for result in ranking {
                    info!(
                        "  {} got {} votes (total {})",
                        result.player_name, result.votes, result.total_score
                    );
                }
            }
            Packet::GameEnded { standings } => {
                info!("Game over");
                for (place, standing) in standings.iter().enumerate() {
                    info!("  #{} {} with {}", place + 1, standing.player_name, standing.score);
                }
                return Ok(false);
            }
            Packet::CatalogData { reactions } => {
                debug!("Received {} reactions", reactions.len());
                self.reactions = reactions;
            }
            Packet::ActionFailed { reason } => warn!("Action failed: {}", reason),
            Packet::Disconnected { reason } => {
                warn!("Disconnected by server: {}", reason);
                return Ok(false);
            }
            other => debug!("Ignoring {:?}", other),
        }
        Ok(true)
    }

    async fn on_state(&mut self, state: Snapshot) -> Result<(), Box<dyn std::error::Error>> {
        let phase = state.phase;
        let round = state.round;
        let is_host = state.host_id == self.client_id;
        let player_count = state.players.len();
        self.state = Some(state);

        if phase == Phase::Lobby {
            if is_host && player_count >= MIN_PLAYERS && !self.start_requested {
                info!("{} players seated, starting the game", player_count);
                self.start_requested = true;
                self.send(&Packet::StartGame).await?;
            }
            return Ok(());
        }

        if self.acted == Some((round, phase)) {
            return Ok(());
        }

        match phase {
            Phase::Responding => {
                self.acted = Some((round, phase));
                self.use_power_up().await?;

                let pool = if self.reactions.is_empty() {
                    catalog::reactions()
                } else {
                    self.reactions.clone()
                };
                if let Some(reaction) = pool.choose(&mut self.rng) {
                    info!("Round {}: answering with \"{}\"", round, reaction.caption);
                    self.send(&Packet::SubmitResponse {
                        reaction_id: reaction.id,
                    })
                    .await?;
                }
            }
            Phase::Voting => {
                self.acted = Some((round, phase));
                let candidates: Vec<ParticipantId> = self
                    .state
                    .iter()
                    .flat_map(|s| s.voting_view.iter())
                    .map(|entry| entry.player_id)
                    .filter(|id| *id != self.client_id)
                    .collect();

                match candidates.choose(&mut self.rng) {
                    Some(target_id) => {
                        info!("Round {}: voting for player {}", round, target_id);
                        self.send(&Packet::SubmitVote {
                            target_id: *target_id,
                        })
                        .await?;
                    }
                    None => debug!("Round {}: nobody to vote for", round),
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn use_power_up(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let own = self
            .state
            .as_ref()
            .and_then(|s| s.players.iter().find(|p| p.id == self.client_id))
            .and_then(|p| p.modifier);

        if let Some(modifier) = own.filter(|m| !m.used) {
            info!("Using power-up {}", catalog::modifier_info(modifier.kind).name);
            self.send(&Packet::UsePowerUp {
                kind: modifier.kind,
            })
            .await?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let server_addr = args.server.parse::<SocketAddr>()?;

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    info!("Bot socket bound to {}", socket.local_addr()?);

    let connect = serialize(&Packet::Connect {
        client_version: PROTOCOL_VERSION,
    })?;
    socket.send_to(&connect, server_addr).await?;

    let mut buffer = [0u8; 8192];
    let client_id = loop {
        let (len, _) = tokio::time::timeout(Duration::from_secs(5), socket.recv_from(&mut buffer)).await??;
        match deserialize::<Packet>(&buffer[0..len]) {
            Ok(Packet::Connected { client_id }) => break client_id,
            Ok(Packet::Disconnected { reason }) => {
                error!("Connection refused: {}", reason);
                return Ok(());
            }
            Ok(other) => debug!("Ignoring {:?} while connecting", other),
            Err(e) => warn!("Failed to deserialize packet: {}", e),
        }
    };
    info!("Connected as participant {}", client_id);

    let mut bot = Bot {
        socket,
        server_addr,
        client_id,
        reactions: Vec::new(),
        state: None,
        acted: None,
        start_requested: false,
        rng: StdRng::from_entropy(),
    };

    bot.send(&Packet::RequestCatalog).await?;
    match &args.join {
        Some(code) => {
            bot.send(&Packet::JoinSession {
                session_id: code.clone(),
                player_name: args.name.clone(),
            })
            .await?
        }
        None => {
            bot.send(&Packet::CreateSession {
                player_name: args.name.clone(),
            })
            .await?
        }
    }

    let mut heartbeat = interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            received = bot.socket.recv_from(&mut buffer) => {
                let (len, _) = received?;
                match deserialize::<Packet>(&buffer[0..len]) {
                    Ok(packet) => {
                        if !bot.handle(packet).await? {
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to deserialize packet: {}", e),
                }
            },
            _ = heartbeat.tick() => {
                bot.send(&Packet::Heartbeat).await?;
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            },
        }
    }

    bot.send(&Packet::Disconnect).await?;
    info!("Bot finished");
    Ok(())
}
