//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and from `SENTINEL__`-prefixed environment
//! variables, e.g. `SENTINEL__APP__LEVEL=debug`.
//!
//! See `settings.toml` for an example.
use std::{collections::HashMap, path::Path};

use config::{Config, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;

/// Where a named connection points to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Database {
    pub fn url(&self) -> String {
        match self {
            Database::Memory => String::from("sqlite::memory:"),
            Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
        }
    }

    /// The database file, if the connection has one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Database::Memory => None,
            Database::Sqlite(path) => Some(Path::new(path)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Connection names used by the `cycle` command.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Cycle {
    pub source: String,
    pub target: String,
}

impl Default for Cycle {
    fn default() -> Self {
        Self {
            source: "sentry".to_string(),
            target: "sentinel".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub connections: HashMap<String, Database>,
    pub cycle: Cycle,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name(path).required(false))
                .add_source(Environment::with_prefix("SENTINEL").separator("__")),
        )
    }

    fn from_builder(builder: config::ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }

    pub fn connection(&self, name: &str) -> Result<&Database, ConfigError> {
        self.connections
            .get(name)
            .ok_or_else(|| ConfigError::NotFound(format!("connections.{name}")))
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn parse(toml: &str) -> Settings {
        Settings::from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
            .unwrap()
    }

    #[test]
    fn reads_named_connections() {
        let settings = parse(
            r#"
            [app]
            level = "debug"

            [connections]
            scratch = "memory"

            [connections.sentry]
            sqlite = "database/sentry.sqlite"

            [cycle]
            source = "sentry"
            target = "scratch"
            "#,
        );

        assert_eq!(settings.app.level, "debug");
        assert_eq!(settings.connection("scratch").unwrap(), &Database::Memory);
        let sentry = settings.connection("sentry").unwrap();
        assert_eq!(sentry.url(), "sqlite:database/sentry.sqlite?mode=rwc");
        assert_eq!(sentry.path(), Some(Path::new("database/sentry.sqlite")));
        assert_eq!(settings.cycle.target, "scratch");
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let settings = parse("");

        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.cycle.source, "sentry");
        assert_eq!(settings.cycle.target, "sentinel");
        assert!(matches!(
            settings.connection("sentry"),
            Err(ConfigError::NotFound(_))
        ));
    }
}
