//! The two activation operations the user conversion needs.

use sea_orm::{ConnectionTrait, DbErr, prelude::DateTimeUtc};
use sea_orm_migration::prelude::*;
use uuid::Uuid;

use super::find_id;
use crate::m20160919_000103_add_sentinel_schema::Activations;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Activation {
    pub(crate) id: i32,
    pub(crate) code: String,
}

/// Create an activation for `user_id`, or return the one it already has.
pub(crate) async fn create<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    now: DateTimeUtc,
) -> Result<Activation, DbErr> {
    let backend = db.get_database_backend();

    let existing = db
        .query_one(
            backend.build(
                &Query::select()
                    .columns([Activations::Id, Activations::Code])
                    .from(Activations::Table)
                    .and_where(Expr::col(Activations::UserId).eq(user_id))
                    .order_by(Activations::Id, Order::Asc)
                    .limit(1)
                    .to_owned(),
            ),
        )
        .await?;
    if let Some(row) = existing {
        return Ok(Activation {
            id: row.try_get("", "id")?,
            code: row.try_get("", "code")?,
        });
    }

    let code = Uuid::new_v4().simple().to_string();
    let stmt = Query::insert()
        .into_table(Activations::Table)
        .columns([
            Activations::UserId,
            Activations::Code,
            Activations::Completed,
            Activations::CreatedAt,
            Activations::UpdatedAt,
        ])
        .values_panic([
            user_id.into(),
            code.clone().into(),
            false.into(),
            now.into(),
            now.into(),
        ])
        .to_owned();
    db.execute(backend.build(&stmt)).await?;

    let id = find_id(
        db,
        &Query::select()
            .column(Activations::Id)
            .from(Activations::Table)
            .and_where(Expr::col(Activations::Code).eq(code.clone()))
            .to_owned(),
    )
    .await?
    .ok_or_else(|| DbErr::RecordNotInserted)?;

    Ok(Activation { id, code })
}

/// Mark the activation identified by `code` as completed.
///
/// Only an incomplete activation is touched, so `completed_at` is written
/// once. Returns whether this call completed it.
pub(crate) async fn complete<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    code: &str,
    now: DateTimeUtc,
) -> Result<bool, DbErr> {
    let backend = db.get_database_backend();
    let result = db
        .execute(
            backend.build(
                &Query::update()
                    .table(Activations::Table)
                    .value(Activations::Completed, true)
                    .value(Activations::CompletedAt, now)
                    .value(Activations::UpdatedAt, now)
                    .and_where(Expr::col(Activations::UserId).eq(user_id))
                    .and_where(Expr::col(Activations::Code).eq(code))
                    .and_where(Expr::col(Activations::Completed).eq(false))
                    .to_owned(),
            ),
        )
        .await?;
    Ok(result.rows_affected() > 0)
}
