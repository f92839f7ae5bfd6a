//! Command-line driver for the medconsole client.
//!
//! Signs in against the API, issues authorized requests, and watches live
//! presence. The session is kept in a file so it survives between runs.
//!
//! ```text
//! console-cli login --email admin@example.com --password secret
//! console-cli get /doctor/get-all --limit 20
//! console-cli watch
//! console-cli logout
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use medconsole::prelude::*;
use medconsole::presence::DEFAULT_SOCKET_PATH;
use medconsole::{
    DEFAULT_API_BASE_URL, ENV_API_BASE_URL, ENV_RECONNECT_ATTEMPTS, ENV_SOCKET_PATH,
    ENV_STORAGE_PATH,
};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Base URL of the API
    #[arg(long, env = ENV_API_BASE_URL, default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,

    /// File the session is stored in
    #[arg(long, env = ENV_STORAGE_PATH, default_value = ".medconsole-session.json")]
    storage: PathBuf,

    /// Socket.IO mount path on the API host
    #[arg(long, env = ENV_SOCKET_PATH, default_value = DEFAULT_SOCKET_PATH)]
    socket_path: String,

    /// Presence redials after an unexpected drop (0 disables)
    #[arg(long, env = ENV_RECONNECT_ATTEMPTS, default_value_t = 0)]
    reconnect_attempts: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in as an administrator
    Login {
        #[arg(long, env = "MEDCONSOLE_EMAIL")]
        email: String,
        #[arg(long, env = "MEDCONSOLE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the signed-in identity
    Whoami,
    /// End the session
    Logout,
    /// GET an API path and print the JSON body
    Get {
        path: String,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        offset: Option<u32>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Print presence snapshots until Ctrl-C
    Watch,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Console(#[from] ConsoleError),

    #[error("not signed in, run `console-cli login` first")]
    NotSignedIn,

    #[error("cannot print response: {0}")]
    Output(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    if let Err(e) = init_tracing("warn,medconsole=info,medconsole_presence=info") {
        eprintln!("tracing disabled: {e}");
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ConsoleConfig {
        api_base_url: cli.api_base_url,
        storage_path: Some(cli.storage),
        socket_path: cli.socket_path,
        reconnect: ReconnectPolicy::exponential(cli.reconnect_attempts),
    };
    let client = ConsoleClient::builder()
        .config(config)
        .navigator(|route: &str| tracing::debug!(route, "redirect"))
        .build()?;

    match cli.command {
        Command::Login { email, password } => {
            let claims = client
                .auth()
                .login(&email, &password)
                .await
                .map_err(ConsoleError::from)?;
            println!("signed in as {} <{}>", claims.name, claims.email);
        }
        Command::Whoami => {
            if !client.session().is_authenticated() {
                return Err(CliError::NotSignedIn);
            }
            let Some(identity) = client.session().current_identity() else {
                return Err(CliError::NotSignedIn);
            };
            println!("{} <{}>", identity.name, identity.email);
            println!("  id:      {}", identity.id);
            println!("  role:    {}", identity.role);
            println!("  expires: {}", identity.exp);
        }
        Command::Logout => {
            client.logout().await?;
            println!("signed out");
        }
        Command::Get {
            path,
            limit,
            offset,
            search,
        } => {
            let query = ListQuery {
                limit,
                offset,
                search,
            };
            let body: Value = client
                .transport()
                .get_with_query(&path, &query)
                .await
                .map_err(ConsoleError::from)?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::Watch => watch(&client).await?,
    }
    Ok(())
}

async fn watch(client: &ConsoleClient) -> Result<(), CliError> {
    let mut reader = client.subscribe_presence();
    if client.resume() == ConnectOutcome::NoToken {
        return Err(CliError::NotSignedIn);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = reader.changed() => {
                if !changed {
                    break;
                }
                let state = reader.snapshot_and_mark_seen();
                println!(
                    "[{}] users: {}  doctors: {}",
                    state.status, state.user_count, state.doctor_count
                );
                if socket_gone(&state, &client.config().reconnect) {
                    break;
                }
            }
        }
    }

    client.presence().disconnect().await;
    Ok(())
}

/// Without a reconnect policy nothing will reopen a dropped socket.
fn socket_gone(state: &PresenceState, reconnect: &ReconnectPolicy) -> bool {
    state.status == ChannelStatus::Disconnected && !reconnect.is_enabled()
}
