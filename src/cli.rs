use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod commands;

use commands::{create_superuser, init_database, serve};

const DEFAULT_DATABASE_URL: &str = "sqlite://recipebook.db?mode=rwc";

#[derive(Parser)]
#[command(name = "recipebook")]
#[command(about = "Recipebook API server and administration tools")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply pending migrations, then start the web server
    Serve {
        /// Database URL
        ///
        /// Examples:
        ///   SQLite: sqlite://recipebook.db?mode=rwc
        ///   SQLite (absolute path): sqlite:///var/lib/recipebook/recipebook.db?mode=rwc
        #[arg(short, long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
        database_url: String,

        /// Bind address for the web server
        ///
        /// Format: IP:PORT (e.g., 0.0.0.0:8000, 127.0.0.1:8080)
        #[arg(short, long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8000")]
        bind_address: String,
    },
    /// Initialize the database using migrations
    InitDb {
        /// Database URL
        #[arg(short, long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Create a staff user with superuser rights
    CreateSuperuser {
        /// Email address of the new superuser
        #[arg(short, long)]
        email: String,

        /// Password of the new superuser
        #[arg(short, long, env = "RECIPEBOOK_SUPERUSER_PASSWORD")]
        password: String,

        /// Database URL
        #[arg(short, long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
        database_url: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Serve {
                database_url,
                bind_address,
            } => {
                serve(&database_url, &bind_address).await?;
            }
            Commands::InitDb { database_url } => {
                init_database(&database_url).await?;
            }
            Commands::CreateSuperuser {
                email,
                password,
                database_url,
            } => {
                create_superuser(&database_url, &email, &password).await?;
            }
        }
        Ok(())
    }
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
    fn test_parse_create_superuser() {
        let cli = Cli::try_parse_from([
            "recipebook",
            "create-superuser",
            "--email",
            "admin@gmail.com",
            "--password",
            "myinsecurepassword!",
            "--database-url",
            "sqlite::memory:",
        ])
        .unwrap();

        match cli.command {
            Commands::CreateSuperuser { email, .. } => assert_eq!(email, "admin@gmail.com"),
            _ => panic!("Expected create-superuser command"),
        }
    }
}
