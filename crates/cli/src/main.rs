//! GeoArt CLI - Database migrations.
//!
//! # Usage
//!
//! ```bash
//! # Create or update the application tables (users, places, likes, comments)
//! geoart-cli migrate app
//!
//! # Create the session table used by the web server
//! geoart-cli migrate sessions
//!
//! # Both of the above
//! geoart-cli migrate all
//! ```
//!
//! # Environment Variables
//!
//! - `GEOART_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "geoart-cli")]
#[command(author, version, about = "GeoArt CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum MigrateTarget {
    /// Run application schema migrations
    App,
    /// Create the session store table
    Sessions,
    /// Run every migration
    All,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::migrate::MigrationError> {
    match cli.command {
        Commands::Migrate { target } => {
            let pool = commands::migrate::connect().await?;
            match target {
                MigrateTarget::App => commands::migrate::app(&pool).await?,
                MigrateTarget::Sessions => commands::migrate::sessions(&pool).await?,
                MigrateTarget::All => {
                    commands::migrate::app(&pool).await?;
                    commands::migrate::sessions(&pool).await?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_migrate_targets() {
        for (arg, expected) in [
            ("app", MigrateTarget::App),
            ("sessions", MigrateTarget::Sessions),
            ("all", MigrateTarget::All),
        ] {
            let cli = Cli::try_parse_from(["geoart-cli", "migrate", arg]).unwrap();
            let Commands::Migrate { target } = cli.command;
            assert_eq!(target, expected);
        }
    }

    #[test]
    fn test_migrate_requires_target() {
        assert!(Cli::try_parse_from(["geoart-cli", "migrate"]).is_err());
        assert!(Cli::try_parse_from(["geoart-cli", "migrate", "everything"]).is_err());
    }
}
