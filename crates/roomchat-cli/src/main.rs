//! roomchat: terminal client for room-based chat.
//!
//! Joins a room on a Socket.IO chat server, prints the conversation and
//! sends every line typed on stdin.

mod input;
mod settings;
mod view;

use std::path::PathBuf;

use clap::Parser;
use roomchat_client::{run_view, ChatClient, ClientError, SocketIoConnector};
use roomchat_common::ConfigError;
use roomchat_config::{LogLevel, RoomchatConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::input::{parse_line, Input, HELP};
use crate::settings::Settings;
use crate::view::TerminalView;

#[derive(Parser, Debug)]
#[command(name = "roomchat", version, about = "Terminal client for room-based chat")]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Chat server URL (http, https, ws or wss).
    #[arg(long)]
    pub url: Option<String>,

    /// Room to join on startup.
    #[arg(short, long)]
    pub room: Option<String>,

    /// Display name; empty joins anonymously.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Log filter directive (e.g. "debug" or "roomchat_client=trace").
    #[arg(long)]
    pub log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Start logging before the config loads so its messages are kept; the
    // configured level replaces this filter afterwards.
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(
            args.log_level
                .as_deref()
                .unwrap_or(LogLevel::default().directive()),
        ))
        .with_filter_reloading();
    let filter = subscriber.reload_handle();
    subscriber.init();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            RoomchatConfig::default()
        }
    };
    let settings = Settings::resolve(&config, &args);
    if let Err(e) = filter.reload(log_filter(&settings.log_directive)) {
        warn!(error = %e, "Failed to apply configured log level");
    }

    if let Err(e) = run(settings).await {
        error!(error = %e, "roomchat exited with an error");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over `directive`.
fn log_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new(LogLevel::default().directive()))
}

fn load_config(args: &Args) -> Result<RoomchatConfig, ConfigError> {
    match &args.config {
        Some(path) => roomchat_config::load_config_from(path),
        None => roomchat_config::load_config(),
    }
}

async fn run(settings: Settings) -> roomchat_common::Result<()> {
    let connector = SocketIoConnector::new(&settings.server_url)
        .with_connect_timeout(settings.connect_timeout);
    info!(url = %connector.url(), "Using chat server");

    let (client, state, notices) = ChatClient::spawn(connector, settings.policy.clone());
    let view_task = tokio::spawn(async move {
        let mut view = TerminalView::new(std::io::stdout());
        run_view(&mut view, state, notices).await;
    });

    println!("Type /help for commands.");
    if let Some(room) = &settings.room {
        report(client.join(room, settings.display_name.as_deref()).await)?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parse_line(&line, settings.display_name.as_deref()) {
            Input::Intent(intent) => report(client.dispatch(intent).await)?,
            Input::Help => println!("{HELP}"),
            Input::Quit => break,
            Input::Nothing => {}
            Input::Invalid(reason) => eprintln!("{reason}"),
        }
    }

    client.shutdown().await?;
    drop(client);
    if let Err(e) = view_task.await {
        warn!(error = %e, "View task failed");
    }
    Ok(())
}

/// Show failed operations to the user. Only a stopped client is fatal.
fn report(result: Result<(), ClientError>) -> roomchat_common::Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(ClientError::Shutdown) => Err(ClientError::Shutdown.into()),
        Err(e) if e.is_rejection() => {
            eprintln!("Cannot do that: {e}");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Operation failed");
            eprintln!("Failed: {e}");
            Ok(())
        }
    }
}
