use sea_orm::DatabaseConnection;

use crate::ResultSentinel;

mod activations;
mod reminders;
mod roles;
mod sessions;
mod users;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Sentinel {
    database: DatabaseConnection,
}

impl Sentinel {
    /// Return a builder for `Sentinel`. Help to build the struct.
    pub fn builder() -> SentinelBuilder {
        SentinelBuilder::default()
    }
}

/// The builder for `Sentinel`
#[derive(Default)]
pub struct SentinelBuilder {
    database: DatabaseConnection,
}

impl SentinelBuilder {
    /// Pass the required database, already migrated to the Sentinel schema.
    pub fn database(mut self, db: DatabaseConnection) -> SentinelBuilder {
        self.database = db;
        self
    }

    /// Construct `Sentinel`
    pub async fn build(self) -> ResultSentinel<Sentinel> {
        Ok(Sentinel {
            database: self.database,
        })
    }
}
