use anyhow::Context;
use bookshelf_db::Database;
use bookshelf_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Operate the book collection service
#[derive(Debug, Parser)]
#[command(name = "bookshelf", version, about)]
struct Cli {
    /// Override the configured database url
    #[arg(long, global = true, env = "BOOKSHELF_DATABASE__URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Check that the database is reachable
    CheckDb,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    if let Some(url) = cli.database_url {
        settings.database.url = url;
    }
    bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(env = ?settings.environment, command = ?cli.command, "bookshelf cli");

    match cli.command {
        Command::Serve => bookshelf_app::run(settings).await,
        Command::Migrate => {
            let db = Database::connect(&settings.database).await?;
            let registry = bookshelf_app::build_registry(&db)?;
            let applied = bookshelf_app::migrate(&registry, &db).await?;
            println!("applied {applied} migration(s)");
            db.close().await;
            Ok(())
        }
        Command::CheckDb => {
            let db = Database::connect(&settings.database).await?;
            let checked = db.ping().await;
            db.close().await;
            checked?;
            println!("database reachable: {}", settings.database.url);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["bookshelf", "check-db", "--database-url", "sqlite::memory:"])
            .unwrap();
        assert!(matches!(cli.command, Command::CheckDb));
        assert_eq!(cli.database_url.as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["bookshelf"]).is_err());
    }
}
