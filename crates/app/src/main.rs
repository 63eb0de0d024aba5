use std::path::Path;

use clap::{Parser, Subcommand, ValueEnum};
use migration::{LegacyMigrator, Migrator, MigratorTrait};
use settings::{Database, Settings};

mod settings;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Copy a Sentry database and convert the copy to the Sentinel schema.
#[derive(Debug, Parser)]
#[command(name = "sentinel_cycle", disable_version_flag = true)]
struct Args {
    /// Settings file, without extension.
    #[arg(long, default_value = "settings")]
    config: String,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Overwrite the target database with the source one and migrate it.
    Cycle,
    /// Run the migrator against one connection.
    Migrate {
        #[arg(value_enum)]
        action: Action,
        /// Connection name, defaults to the cycle target.
        #[arg(long)]
        connection: Option<String>,
        /// Number of migrations to apply or revert.
        #[arg(long)]
        steps: Option<u32>,
    },
    /// Create the Sentry schema on a connection, defaults to the cycle source.
    Legacy {
        #[arg(long)]
        connection: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Action {
    Up,
    Down,
    Fresh,
    Status,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();
    let settings = Settings::new(&args.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "sentinel_cycle={level},migration={level},sea_orm_migration={level}",
            level = settings.app.level
        ))
        .init();

    let result = match args.command.unwrap_or(Command::Cycle) {
        Command::Cycle => cycle(&settings).await,
        Command::Migrate {
            action,
            connection,
            steps,
        } => {
            let name = connection.as_deref().unwrap_or(&settings.cycle.target);
            migrate(settings.connection(name)?, action, steps).await
        }
        Command::Legacy { connection } => {
            let name = connection.as_deref().unwrap_or(&settings.cycle.source);
            let db = sea_orm::Database::connect(settings.connection(name)?.url()).await?;
            LegacyMigrator::up(&db, None).await.map_err(Into::into)
        }
    };

    if let Err(err) = &result {
        tracing::error!("sentinel_cycle failed: {err}");
    }
    result
}

/// Replace the target database file with a copy of the source and run every
/// pending migration on it. The source is never written.
async fn cycle(settings: &Settings) -> Result<(), BoxError> {
    let source = file_of(settings, &settings.cycle.source)?;
    let target = file_of(settings, &settings.cycle.target)?;

    let bytes = copy_database(source, target).await?;
    tracing::info!(
        source = %source.display(),
        target = %target.display(),
        bytes,
        "database copied"
    );

    let db = sea_orm::Database::connect(settings.connection(&settings.cycle.target)?.url()).await?;
    Migrator::up(&db, None).await?;
    tracing::info!(target = %target.display(), "migrations applied");
    Ok(())
}

fn file_of<'a>(settings: &'a Settings, name: &str) -> Result<&'a Path, BoxError> {
    settings
        .connection(name)?
        .path()
        .ok_or_else(|| format!("connection \"{name}\" is not a sqlite file").into())
}

/// Copy `source` over `target`, creating the target directory if needed.
async fn copy_database(source: &Path, target: &Path) -> std::io::Result<u64> {
    if let Some(parent) = target.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::copy(source, target).await
}

async fn migrate(database: &Database, action: Action, steps: Option<u32>) -> Result<(), BoxError> {
    let db = sea_orm::Database::connect(database.url()).await?;
    match action {
        Action::Up => Migrator::up(&db, steps).await?,
        Action::Down => Migrator::down(&db, steps).await?,
        Action::Fresh => Migrator::fresh(&db).await?,
        Action::Status => Migrator::status(&db).await?,
    }
    tracing::info!(?action, "migrate done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use sea_orm::{ConnectionTrait, DbBackend, Statement};
    use uuid::Uuid;

    use super::*;

    fn test_dir() -> PathBuf {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../target/test_dbs")
            .join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(&root).unwrap();
        root
    }

    fn settings_for(source: &Path, target: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.connections.insert(
            "sentry".to_string(),
            Database::Sqlite(source.display().to_string()),
        );
        settings.connections.insert(
            "sentinel".to_string(),
            Database::Sqlite(target.display().to_string()),
        );
        settings
    }

    async fn has_table(url: &str, table: &str) -> bool {
        let db = sea_orm::Database::connect(url).await.unwrap();
        db.query_one(Statement::from_sql_and_values(
            DbBackend::Sqlite,
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            vec![table.into()],
        ))
        .await
        .unwrap()
        .is_some()
    }

    #[tokio::test]
    async fn copy_overwrites_the_target() {
        let root = test_dir();
        let source = root.join("source.db");
        let target = root.join("nested/target.db");
        std::fs::write(&source, b"source").unwrap();

        assert_eq!(copy_database(&source, &target).await.unwrap(), 6);
        std::fs::write(&source, b"changed").unwrap();
        copy_database(&source, &target).await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"changed");
    }

    #[tokio::test]
    async fn cycle_converts_the_copy_only() {
        let root = test_dir();
        let source = root.join("sentry.db");
        let target = root.join("sentinel.db");
        let settings = settings_for(&source, &target);

        let source_url = settings.connection("sentry").unwrap().url();
        let db = sea_orm::Database::connect(&source_url).await.unwrap();
        LegacyMigrator::up(&db, None).await.unwrap();
        db.execute(Statement::from_string(
            DbBackend::Sqlite,
            "INSERT INTO users (email, password, activated, activated_at) \
             VALUES ('user@user.com', 'hash', 1, '2020-01-01 00:00:00')",
        ))
        .await
        .unwrap();
        db.close().await.unwrap();

        cycle(&settings).await.unwrap();

        let target_url = settings.connection("sentinel").unwrap().url();
        assert!(has_table(&target_url, "activations").await);
        assert!(!has_table(&target_url, "groups").await);
        assert!(has_table(&source_url, "groups").await);
        assert!(!has_table(&source_url, "activations").await);
    }

    #[tokio::test]
    async fn cycle_rejects_memory_connections() {
        let mut settings = Settings::default();
        settings
            .connections
            .insert("sentry".to_string(), Database::Memory);
        settings
            .connections
            .insert("sentinel".to_string(), Database::Memory);

        assert!(cycle(&settings).await.is_err());
    }
}
