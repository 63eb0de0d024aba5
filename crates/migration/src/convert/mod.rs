//! Row-level conversion between the Sentry and Sentinel tables.
//!
//! Both directions run as a single pass over every row with no
//! checkpointing. A failure midway leaves some rows converted; the store has
//! to be restored from the copy taken before the migration.

use sea_orm::{ConnectionTrait, DbErr};
use sea_orm_migration::prelude::SelectStatement;

pub(crate) mod activations;
pub(crate) mod groups;
pub(crate) mod users;

/// Run `stmt` and read the `id` column of the first row, if any.
pub(crate) async fn find_id<C: ConnectionTrait>(
    db: &C,
    stmt: &SelectStatement,
) -> Result<Option<i32>, DbErr> {
    let backend = db.get_database_backend();
    db.query_one(backend.build(stmt))
        .await?
        .map(|row| row.try_get("", "id"))
        .transpose()
}
