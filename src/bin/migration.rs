use anyhow::Context;
use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use pedidos_api::{db, migrator::Migrator};

#[derive(Parser)]
#[command(name = "migration", about = "Apply or roll back the pedidos-api schema", version)]
struct Cli {
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite://pedidos.db?mode=rwc",
        help = "Database to migrate"
    )]
    database_url: String,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending migrations (default)
    Up,
    /// Roll back the last `steps` migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// List applied and pending migrations
    Status,
    /// Drop every table and reapply all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    let config = db::DbConfig {
        url: cli.database_url.clone(),
        max_connections: 1,
        min_connections: 1,
        ..db::DbConfig::default()
    };
    let conn = db::establish_connection_with_config(&config)
        .await
        .context("failed to connect to the database")?;

    match cli.command.unwrap_or(Command::Up) {
        Command::Up => {
            Migrator::up(&conn, None).await.context("migration failed")?;
            info!("Migrations applied");
        }
        Command::Down { steps } => {
            Migrator::down(&conn, Some(steps))
                .await
                .context("rollback failed")?;
            info!(steps, "Migrations rolled back");
        }
        Command::Status => {
            Migrator::status(&conn).await.context("status failed")?;
        }
        Command::Fresh => {
            Migrator::fresh(&conn).await.context("fresh migration failed")?;
            info!("Schema recreated");
        }
    }

    Ok(())
}
