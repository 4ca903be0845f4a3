//! Gainsy CLI - operator tools for the hosted backend.
//!
//! # Usage
//!
//! ```bash
//! # Check that the backend is reachable
//! gainsy check
//!
//! # Load demo stores, products and templates into a seller account
//! gainsy seed --email maker@example.com --password '...'
//! ```
//!
//! # Commands
//!
//! - `check` - Ping the hosted backend
//! - `seed` - Insert demo data for a seller

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use secrecy::SecretString;

mod commands;

#[derive(Parser)]
#[command(name = "gainsy")]
#[command(author, version, about = "Gainsy CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check connectivity to the hosted backend
    Check,
    /// Seed a seller account with demo data
    Seed {
        /// Seller email address
        #[arg(short, long)]
        email: String,

        /// Seller password
        #[arg(short, long, env = "GAINSY_SEED_PASSWORD", hide_env_values = true)]
        password: String,

        /// Seed even if the account already has stores
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Check => commands::check::run().await?,
        Commands::Seed {
            email,
            password,
            force,
        } => {
            let password = SecretString::from(password);
            let summary = commands::seed::run(&email, &password, force).await?;
            tracing::info!(
                stores = summary.stores,
                products = summary.products,
                templates = summary.templates,
                "Seeding complete"
            );
        }
    }
    Ok(())
}
