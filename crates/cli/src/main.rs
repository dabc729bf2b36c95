//! Storefront Sync CLI - Inspect and edit a user's synced collections.
//!
//! # Usage
//!
//! ```bash
//! # List the configured owner's favorites
//! sync-cli list
//!
//! # Same, as JSON
//! sync-cli list --json
//!
//! # Toggle a product in or out of the collection
//! sync-cli toggle 1042 --name "Pineapple Tee"
//!
//! # Add or remove explicitly
//! sync-cli add 1042 --name "Pineapple Tee"
//! sync-cli remove 1042
//! ```
//!
//! # Commands
//!
//! - `list` - Fetch and print the collection
//! - `toggle` / `add` / `remove` - Apply a mutation intent and report the outcome
//!
//! Configuration comes from the environment (see `storefront_sync::config`);
//! `SYNC_OWNER_ID` and `SYNC_OWNER_TOKEN` select the owner to act as.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_sync_core::MemberId;

mod commands;

#[derive(Parser)]
#[command(name = "sync-cli")]
#[command(author, version, about = "Storefront collection sync tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and print the collection
    List {
        /// Print members as JSON instead of one line each
        #[arg(long)]
        json: bool,
    },
    /// Add the member if absent, remove it if present
    Toggle {
        /// Member (product) ID
        id: MemberId,

        /// Display name stored with the member
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Add a member
    Add {
        /// Member (product) ID
        id: MemberId,

        /// Display name stored with the member
        #[arg(short, long)]
        name: Option<String>,

        /// Product handle stored with the member
        #[arg(long)]
        handle: Option<String>,
    },
    /// Remove a member
    Remove {
        /// Member (product) ID
        id: MemberId,
    },
}

#[tokio::main]
async fn main() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storefront_sync=info,sync_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    let favorites = commands::open().await?;

    match cli.command {
        Commands::List { json } => commands::list(&favorites, json)?,
        Commands::Toggle { id, name } => {
            commands::toggle(&favorites, commands::member(id, name, None)).await?;
        }
        Commands::Add { id, name, handle } => {
            commands::add(&favorites, commands::member(id, name, handle)).await?;
        }
        Commands::Remove { id } => commands::remove(&favorites, id).await?,
    }
    Ok(())
}
