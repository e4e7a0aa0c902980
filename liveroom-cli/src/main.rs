use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use liveroom::client::{EndReason, EngineConfig, EngineEvent, EngineHandle, NoCapture};
use liveroom::model::IceServerConfig;
use liveroom::server::{DEFAULT_WS_PATH, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "liveroom", version, about = "Peer-to-peer room relay and headless participant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Serve {
        #[arg(long, env = "LIVEROOM_ADDR", default_value = "0.0.0.0:8080")]
        addr: SocketAddr,

        #[arg(long, env = "LIVEROOM_WS_PATH", default_value = DEFAULT_WS_PATH)]
        ws_path: String,
    },
    /// Join a room as a chat-only participant. Stdin lines are sent as chat.
    Join {
        #[arg(long, env = "LIVEROOM_WS_URL", default_value = "ws://127.0.0.1:8080/api/ws")]
        url: String,

        #[arg(short, long)]
        room: String,

        #[arg(short, long, default_value = "guest")]
        name: String,

        /// Create the room and become its host.
        #[arg(long)]
        create: bool,

        #[arg(long, env = "LIVEROOM_TURN_URL")]
        turn_url: Option<String>,

        #[arg(long, env = "LIVEROOM_TURN_USER", requires = "turn_url")]
        turn_user: Option<String>,

        #[arg(long, env = "LIVEROOM_TURN_CREDENTIAL", requires = "turn_url")]
        turn_credential: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve { addr, ws_path } => {
            println!("{}", "📡 Starting relay...".green().bold());
            liveroom::server::serve(ServerConfig {
                bind: addr,
                ws_path,
            })
            .await
        }
        Commands::Join {
            url,
            room,
            name,
            create,
            turn_url,
            turn_user,
            turn_credential,
        } => {
            let mut config = EngineConfig::new(room.as_str(), name);
            config.create_room = create;
            config.start_with_video = false;
            config.start_with_audio = false;
            if let Some(turn_url) = turn_url {
                config.ice_servers.push(IceServerConfig {
                    urls: vec![turn_url],
                    username: turn_user,
                    credential: turn_credential,
                });
            }

            println!("{} {} {}", "🔗 Joining".cyan(), room.bold(), format!("via {url}").dimmed());
            let handle = liveroom::client::join(&url, config, Arc::new(NoCapture))
                .await
                .with_context(|| format!("failed to reach relay at {url}"))?;
            run_participant(handle).await
        }
    }
}

async fn run_participant(handle: EngineHandle) -> Result<()> {
    let mut events = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if let Some(reason) = print_event(&event) {
                        println!("{} {:?}", "👋 Session ended:".yellow().bold(), reason);
                        return Ok(());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Dropped {} engine events", n);
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
            line = lines.next_line(), if stdin_open => match line.context("failed to read stdin")? {
                Some(line) if line.trim() == "/leave" => handle.leave().await,
                Some(line) if line.trim().is_empty() => {}
                Some(line) => handle.send_chat(line).await,
                None => {
                    stdin_open = false;
                    handle.leave().await;
                }
            },
        }
    }
}

/// Prints one engine event; returns the end reason once the session is over.
fn print_event(event: &EngineEvent) -> Option<EndReason> {
    match event {
        EngineEvent::Connected(up) => {
            if !up {
                println!("{}", "⚠️  Relay connection lost".red());
            }
        }
        EngineEvent::JoinedRoom {
            self_id, is_host, ..
        } => {
            let role = if *is_host { " (host)" } else { "" };
            println!("{} {}{}", "✨ Joined as".green().bold(), self_id, role);
        }
        EngineEvent::RosterReplaced(participants) => {
            for p in participants {
                println!("   👤 {} ({})", p.display_name, p.id);
            }
        }
        EngineEvent::ParticipantJoined(p) => {
            println!("{} {} ({})", "➕".green(), p.display_name, p.id);
        }
        EngineEvent::ParticipantLeft(id) => println!("{} {}", "➖".red(), id),
        EngineEvent::HostChanged { host_id, self_is_host } => {
            if *self_is_host {
                println!("{}", "👑 You are now the host".yellow());
            } else {
                println!("👑 Host is now {}", host_id);
            }
        }
        EngineEvent::ChatReceived(msg) if !msg.is_own => {
            println!("{} {}", format!("[{}]", msg.username).cyan().bold(), msg.content);
        }
        EngineEvent::LinkStateChanged {
            participant_id,
            state,
        } => tracing::debug!("Link to {} is {}", participant_id, state),
        EngineEvent::Warning { kind, message } => {
            println!("{} {:?}: {}", "⚠️ ".yellow(), kind, message);
        }
        EngineEvent::SessionEnded(reason) => return Some(*reason),
        _ => {}
    }
    None
}
