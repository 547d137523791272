//! Sillage CLI - Database migrations and demo data.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! sillage-cli migrate
//!
//! # Load the demo catalog
//! sillage-cli seed products crates/cli/seed/products.yaml
//!
//! # Replace the catalog with the demo data
//! sillage-cli seed products crates/cli/seed/products.yaml --clear
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed products` - Insert catalog products from a YAML file

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sillage-cli")]
#[command(author, version, about = "Sillage CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Seed the database with demo data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert catalog products from a YAML file
    Products {
        /// Path to the YAML file
        file: String,

        /// Delete every existing product first
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Products { file, clear } => {
                commands::seed::products(&file, clear).await?;
            }
        },
    }
    Ok(())
}
