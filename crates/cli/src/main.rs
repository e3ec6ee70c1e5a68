//! Clubmart CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! clubmart migrate
//!
//! # Load products from a YAML file
//! clubmart seed --file products.yaml
//!
//! # Check a seed file without touching the database
//! clubmart seed --file products.yaml --dry-run
//!
//! # Create an admin account
//! clubmart admin create -e admin@example.com -n "Admin Name" -p secret
//!
//! # Expire pending orders whose payment window has passed
//! clubmart orders reconcile
//! ```
//!
//! Commands read the same environment as the server (`CLUBMART_DATABASE_URL`
//! or `DATABASE_URL`, `.env` supported) and need a `PostgreSQL` store.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "clubmart")]
#[command(author, version, about = "Clubmart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Load catalog products from a YAML file
    Seed {
        /// Path to the YAML file
        #[arg(short, long)]
        file: String,

        /// Validate the file only
        #[arg(long)]
        dry_run: bool,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage checkout orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin account
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Initial password
        #[arg(short, long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// Expire pending orders past their payment window
    Reconcile,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file, dry_run } => {
            commands::seed::products(&file, dry_run).await?;
        }
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create_user(&email, &name, &password).await?;
            }
        },
        Commands::Orders { action } => match action {
            OrdersAction::Reconcile => commands::orders::reconcile().await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_seed() {
        let cli = Cli::try_parse_from(["clubmart", "seed", "--file", "p.yaml", "--dry-run"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Seed { dry_run: true, .. })
        ));
    }
}
