//! `shop-cli`: operational commands for a Shopfront database.
//!
//! ```bash
//! shop-cli migrate
//! shop-cli admin create -e admin@example.com -n "Admin Name" -p 'a long password'
//! shop-cli seed catalog seed/catalog.yaml --dry-run
//! shop-cli seed catalog seed/catalog.yaml --clear
//! ```
//!
//! Every command reads `SHOP_DATABASE_URL` (a `.env` file is honoured).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shop-cli", author, version, about = "Shopfront database tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending schema migrations
    Migrate,
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Load data from files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create an admin account, or promote the existing account with this email
    Create {
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// At least 8 characters; ignored when promoting
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Upsert catalog products by slug
    Catalog {
        /// YAML file with a top-level `products` list
        file: PathBuf,

        /// Delete every existing product first
        #[arg(long, conflicts_with = "dry_run")]
        clear: bool,

        /// Validate the file without touching the database
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run(Cli::parse().command).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Migrate => commands::migrate::run().await?,
        Command::Admin {
            action:
                AdminAction::Create {
                    email,
                    name,
                    password,
                },
        } => {
            commands::admin::create_user(&email, &name, &password).await?;
        }
        Command::Seed {
            target:
                SeedTarget::Catalog {
                    file,
                    clear,
                    dry_run,
                },
        } => {
            let options = commands::seed::SeedOptions {
                clear_existing: clear,
                dry_run,
            };
            commands::seed::catalog(&file, options).await?;
        }
    }
    Ok(())
}
