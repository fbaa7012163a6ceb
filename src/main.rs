// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Routine-Sync command line driver
//!
//! Signs in against Firebase Auth and runs routine sync against the
//! configured remote backend and local SQLite store.

use clap::{Args, Parser, Subcommand};
use futures_util::StreamExt;
use routine_sync::{
    config::Config, error::SyncError, services::watch_routines, time_utils::format_utc_rfc3339,
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "routine-sync")]
#[command(version)]
#[command(about = "Sync workout routines with the cloud", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Credentials {
    #[arg(long, env = "ROUTINE_SYNC_EMAIL")]
    email: String,
    #[arg(long, env = "ROUTINE_SYNC_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and send the verification email
    Register(Credentials),
    /// Sign in and print the stored profile
    Login(Credentials),
    /// Send a password-reset email
    Recover {
        #[arg(long, env = "ROUTINE_SYNC_EMAIL")]
        email: String,
    },
    /// Replace local routines with the cloud copy
    Download(Credentials),
    /// Replace the cloud copy with local routines
    Upload(Credentials),
    /// Print routine snapshots as they change
    Watch(Credentials),
}

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let state = AppState::from_config(config).await?;

    match cli.command {
        Commands::Register(creds) => {
            state.accounts.register(&creds.email, &creds.password).await?;
            println!("Account created. Check {} for a verification link.", creds.email);
        }
        Commands::Login(creds) => {
            let profile = state.accounts.login(&creds.email, &creds.password).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::Recover { email } => {
            state.accounts.recover_account(&email).await?;
            println!("Password reset email sent to {}.", email);
        }
        Commands::Download(creds) => {
            state.accounts.login(&creds.email, &creds.password).await?;
            report(state.sync.download().await, "Local routines replaced from the cloud.")?;
        }
        Commands::Upload(creds) => {
            state.accounts.login(&creds.email, &creds.password).await?;
            report(state.sync.upload().await, "Cloud routines replaced from this device.")?;
        }
        Commands::Watch(creds) => {
            state.accounts.login(&creds.email, &creds.password).await?;
            let gateway = state.sync.gateway().clone();
            let mut snapshots = watch_routines(gateway, state.config.watch_interval);
            while let Some(item) = snapshots.next().await {
                match item {
                    Ok(snapshot) => println!(
                        "{} {} routine(s)",
                        format_utc_rfc3339(snapshot.taken_at),
                        snapshot.routines.len()
                    ),
                    Err(e) => tracing::warn!(error = %e, "Snapshot failed"),
                }
            }
        }
    }

    Ok(())
}

fn report(outcome: Result<(), SyncError>, success: &str) -> anyhow::Result<()> {
    match outcome {
        Ok(()) => {
            println!("{}", success);
            Ok(())
        }
        Err(SyncError::EmptyCloud) => {
            println!("Nothing stored in the cloud yet; local routines left as they were.");
            Ok(())
        }
        Err(SyncError::EmptyLocalDb) => {
            println!("No routines on this device; cloud copy left as it was.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true)
        .with_writer(std::io::stderr);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("routine_sync=info,warn"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
