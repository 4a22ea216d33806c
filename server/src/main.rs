use clap::Parser;
use log::{error, info};
use server::config::{GameConfig, PhaseTimings, ServerConfig};
use server::network::{Server, ServerMessage};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// How often phase deadlines are checked, in milliseconds
    #[arg(short, long, default_value = "100")]
    tick_ms: u64,

    /// Maximum number of connected participants
    #[arg(short, long, default_value = "256")]
    max_clients: usize,

    /// Rounds per game
    #[arg(long, default_value_t = shared::MAX_ROUNDS)]
    max_rounds: u32,

    /// Seconds players have to submit a response
    #[arg(long, default_value = "60")]
    response_secs: u64,

    /// Seconds players have to vote
    #[arg(long, default_value = "45")]
    voting_secs: u64,

    /// Seconds round results stay on screen
    #[arg(long, default_value = "3")]
    results_secs: u64,

    /// Seconds of silence before a participant is dropped
    #[arg(long, default_value = "10")]
    client_timeout_secs: u64,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            tick_duration: Duration::from_millis(self.tick_ms.max(1)),
            max_clients: self.max_clients,
            client_timeout: Duration::from_secs(self.client_timeout_secs),
            game: GameConfig {
                max_rounds: self.max_rounds.max(1),
                timings: PhaseTimings {
                    response: Duration::from_secs(self.response_secs),
                    voting: Duration::from_secs(self.voting_secs),
                    results: Duration::from_secs(self.results_secs),
                },
                ..GameConfig::default()
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = args.server_config();
    let address = format!("{}:{}", args.host, args.port);

    info!("Starting server on {}", address);
    info!(
        "Rounds: {}, response {}s, voting {}s, results {}s",
        config.game.max_rounds, args.response_secs, args.voting_secs, args.results_secs
    );

    let mut server = Server::new(&address, config).await?;

    let shutdown = server.shutdown_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            if let Err(e) = shutdown.send(ServerMessage::Shutdown) {
                error!("Failed to signal shutdown: {}", e);
            }
        }
    });

    server.run().await?;

    Ok(())
}
