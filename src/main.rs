use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mccrs::client::Client;
use mccrs::error::{ProtocolError, TransportError};
use mccrs::protocol::serverbound::NextState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Query the server list status and measure the ping round trip.
    Status,
    /// Log in offline and keep the connection alive.
    Login,
}

#[derive(Parser)]
#[command(name = "mccrs", about = "Minecraft protocol client core")]
struct Args {
    /// Server hostname or address.
    #[arg(long, default_value = "127.0.0.1")]
    address: String,

    /// Server port.
    #[arg(long, default_value_t = 25565)]
    port: u16,

    /// Username for offline login.
    #[arg(long, default_value = "Player")]
    username: String,

    #[arg(long, value_enum, default_value_t = Mode::Status)]
    mode: Mode,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if let Err(err) = run(&args).await {
        error!(%err, "connection failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(args: &Args) -> Result<(), ProtocolError> {
    let mut client = Client::connect(&args.address, args.port, &args.username).await?;
    match args.mode {
        Mode::Status => status(&mut client).await,
        Mode::Login => login(&mut client).await,
    }
}

async fn status(client: &mut Client) -> Result<(), ProtocolError> {
    client.handshake(NextState::Status).await?;
    client.request_status().await?;
    while client.status_json().is_none() {
        client.receive_packet().await?;
    }
    if let Some(status) = client.status() {
        info!(
            version = %status.version.name,
            protocol = status.version.protocol,
            online = status.players.as_ref().map(|p| p.online).unwrap_or(0),
            max = status.players.as_ref().map(|p| p.max).unwrap_or(0),
            "server status"
        );
    }

    let sent_at = unix_millis();
    client.ping(sent_at).await?;
    while client.last_pong().is_none() {
        client.receive_packet().await?;
    }
    info!(ms = unix_millis() - sent_at, "ping round trip");
    Ok(())
}

async fn login(client: &mut Client) -> Result<(), ProtocolError> {
    client.handshake(NextState::Login).await?;
    client.login().await?;
    let err = client.run().await;
    if let Some(reason) = client.disconnect_reason() {
        info!(%reason, "server closed the session");
    }
    match err {
        // A hangup after an explicit disconnect is a normal end.
        ProtocolError::Transport(TransportError::Eof) if client.disconnect_reason().is_some() => {
            Ok(())
        }
        other => Err(other),
    }
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
