use anyhow::Context;
use bookstock_db::MigrationDirection;
use bookstock_kernel::settings::Settings;
use clap::{Parser, Subcommand};

/// Operate the book stock manager
#[derive(Debug, Parser)]
#[command(name = "bookstock-cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server until Ctrl-C or SIGTERM
    Serve,
    /// Apply (`up`) or revert (`down`) database migrations
    Migrate {
        /// `up` or `down`
        direction: MigrationDirection,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().context("failed to load settings")?;
    bookstock_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve => bookstock::serve(settings).await,
        Command::Migrate { direction } => {
            let count = bookstock::migrate(&settings, direction).await?;
            tracing::info!(%direction, count, "migrations finished");
            println!("{direction}: {count} migration(s) run");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_takes_a_direction() {
        let cli = Cli::try_parse_from(["bookstock-cli", "migrate", "down"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Migrate {
                direction: MigrationDirection::Down
            }
        ));

        assert!(Cli::try_parse_from(["bookstock-cli", "migrate", "sideways"]).is_err());
        assert!(Cli::try_parse_from(["bookstock-cli"]).is_err());
    }
}
