//! Sentinel schema and data conversion.
//!
//! `up` creates the Sentinel tables, extends `throttle`, then converts the
//! Sentry rows (see [`crate::convert`]). `down` converts the rows back into
//! the Sentry tables, which `remove_sentry_schema`'s reversal has already
//! restored, and then drops everything `up` added.

use sea_orm::{ConnectionTrait, DbBackend, Statement};
use sea_orm_migration::prelude::*;

use crate::convert;
use crate::m20121206_225921_sentry_schema::{
    self as sentry, legacy_throttle_columns, throttle_user_id_index,
};

#[derive(Iden)]
pub(crate) enum Activations {
    Table,
    Id,
    UserId,
    Code,
    Completed,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub(crate) enum Persistences {
    Table,
    Id,
    UserId,
    Code,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub(crate) enum Reminders {
    Table,
    Id,
    UserId,
    Code,
    Completed,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub(crate) enum Roles {
    Table,
    Id,
    Slug,
    Name,
    Permissions,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub(crate) enum RoleUsers {
    Table,
    UserId,
    RoleId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub(crate) enum Throttle {
    Table,
    Type,
    Ip,
    CreatedAt,
    UpdatedAt,
}

/// How `throttle` is extended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThrottleLayout {
    /// Add `type` and `ip`.
    Standard,
    /// Also make `user_id` nullable (IP-only entries) and add timestamps.
    IpTracking,
}

#[derive(DeriveMigrationName)]
pub struct Migration {
    pub(crate) throttle: ThrottleLayout,
}

impl Migration {
    pub(crate) const fn new(throttle: ThrottleLayout) -> Self {
        Self { throttle }
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // No `if_not_exists`: a leftover table must abort the conversion.
        manager
            .create_table(
                Table::create()
                    .table(Activations::Table)
                    .col(
                        ColumnDef::new(Activations::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Activations::UserId).integer().not_null())
                    .col(ColumnDef::new(Activations::Code).string().not_null())
                    .col(
                        ColumnDef::new(Activations::Completed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Activations::CompletedAt).timestamp().null())
                    .col(ColumnDef::new(Activations::CreatedAt).timestamp().null())
                    .col(ColumnDef::new(Activations::UpdatedAt).timestamp().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Persistences::Table)
                    .col(
                        ColumnDef::new(Persistences::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Persistences::UserId).integer().not_null())
                    .col(ColumnDef::new(Persistences::Code).string().not_null())
                    .col(ColumnDef::new(Persistences::CreatedAt).timestamp().null())
                    .col(ColumnDef::new(Persistences::UpdatedAt).timestamp().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-persistences-code-unique")
                    .table(Persistences::Table)
                    .col(Persistences::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Reminders::Table)
                    .col(
                        ColumnDef::new(Reminders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reminders::UserId).integer().not_null())
                    .col(ColumnDef::new(Reminders::Code).string().not_null())
                    .col(
                        ColumnDef::new(Reminders::Completed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Reminders::CompletedAt).timestamp().null())
                    .col(ColumnDef::new(Reminders::CreatedAt).timestamp().null())
                    .col(ColumnDef::new(Reminders::UpdatedAt).timestamp().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Roles::Table)
                    .col(
                        ColumnDef::new(Roles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Roles::Slug).string().not_null())
                    .col(ColumnDef::new(Roles::Name).string().not_null())
                    .col(ColumnDef::new(Roles::Permissions).text().null())
                    .col(ColumnDef::new(Roles::CreatedAt).timestamp().null())
                    .col(ColumnDef::new(Roles::UpdatedAt).timestamp().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-roles-slug-unique")
                    .table(Roles::Table)
                    .col(Roles::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RoleUsers::Table)
                    .col(ColumnDef::new(RoleUsers::UserId).integer().not_null())
                    .col(ColumnDef::new(RoleUsers::RoleId).integer().not_null())
                    .col(ColumnDef::new(RoleUsers::CreatedAt).timestamp().null())
                    .col(ColumnDef::new(RoleUsers::UpdatedAt).timestamp().null())
                    .primary_key(
                        Index::create()
                            .col(RoleUsers::UserId)
                            .col(RoleUsers::RoleId),
                    )
                    .to_owned(),
            )
            .await?;

        // SQLite accepts a single operation per ALTER TABLE.
        for column in [Throttle::Type, Throttle::Ip] {
            manager
                .alter_table(
                    Table::alter()
                        .table(Throttle::Table)
                        .add_column(ColumnDef::new(column).string().null())
                        .to_owned(),
                )
                .await?;
        }

        if self.throttle == ThrottleLayout::IpTracking {
            relax_throttle(manager).await?;
        }

        let db = manager.get_connection();
        convert::users::forward(db).await?;
        convert::groups::forward(db).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        convert::users::reverse(db).await?;
        convert::groups::reverse(db).await?;

        manager
            .drop_table(Table::drop().table(Activations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Persistences::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Reminders::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Roles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RoleUsers::Table).to_owned())
            .await?;

        // Constraint first, then columns.
        if self.throttle == ThrottleLayout::IpTracking {
            restore_throttle(manager).await?;
        }

        for column in [Throttle::Type, Throttle::Ip] {
            manager
                .alter_table(
                    Table::alter()
                        .table(Throttle::Table)
                        .drop_column(column)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }
}

/// Allow IP-only throttle rows and track row timestamps.
async fn relax_throttle(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    let backend = manager.get_database_backend();
    if backend == DbBackend::Sqlite {
        return rebuild_throttle(manager, true).await;
    }

    manager
        .alter_table(
            Table::alter()
                .table(Throttle::Table)
                .modify_column(ColumnDef::new(sentry::Throttle::UserId).integer().null())
                .to_owned(),
        )
        .await?;
    for column in [Throttle::CreatedAt, Throttle::UpdatedAt] {
        manager
            .alter_table(
                Table::alter()
                    .table(Throttle::Table)
                    .add_column(ColumnDef::new(column).timestamp().null())
                    .to_owned(),
            )
            .await?;
    }
    Ok(())
}

/// Undo [`relax_throttle`]. IP-only rows have no Sentry representation and
/// are deleted before `user_id` becomes NOT NULL again.
async fn restore_throttle(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    let db = manager.get_connection();
    let backend = manager.get_database_backend();

    let deleted = db
        .execute(
            backend.build(
                &Query::delete()
                    .from_table(Throttle::Table)
                    .and_where(Expr::col(sentry::Throttle::UserId).is_null())
                    .to_owned(),
            ),
        )
        .await?
        .rows_affected();
    if deleted > 0 {
        tracing::warn!(deleted, "dropped IP-only throttle rows");
    }

    if backend == DbBackend::Sqlite {
        return rebuild_throttle(manager, false).await;
    }

    manager
        .alter_table(
            Table::alter()
                .table(Throttle::Table)
                .modify_column(ColumnDef::new(sentry::Throttle::UserId).integer().not_null())
                .to_owned(),
        )
        .await?;
    for column in [Throttle::CreatedAt, Throttle::UpdatedAt] {
        manager
            .alter_table(
                Table::alter()
                    .table(Throttle::Table)
                    .drop_column(column)
                    .to_owned(),
            )
            .await?;
    }
    Ok(())
}

/// SQLite cannot change a column's nullability, so the table is recreated
/// and its rows copied over.
async fn rebuild_throttle(manager: &SchemaManager<'_>, ip_tracking: bool) -> Result<(), DbErr> {
    let db = manager.get_connection();
    let backend = manager.get_database_backend();

    db.execute(Statement::from_string(
        backend,
        "ALTER TABLE throttle RENAME TO throttle_old;".to_string(),
    ))
    .await?;

    let mut user_id = ColumnDef::new(sentry::Throttle::UserId);
    user_id.integer();
    if ip_tracking {
        user_id.null();
    } else {
        user_id.not_null();
    }

    let mut table = Table::create();
    table
        .table(Throttle::Table)
        .col(
            ColumnDef::new(sentry::Throttle::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(user_id);
    for column in legacy_throttle_columns() {
        table.col(column);
    }
    table
        .col(ColumnDef::new(Throttle::Type).string().null())
        .col(ColumnDef::new(Throttle::Ip).string().null());
    if ip_tracking {
        table
            .col(ColumnDef::new(Throttle::CreatedAt).timestamp().null())
            .col(ColumnDef::new(Throttle::UpdatedAt).timestamp().null());
    }
    manager.create_table(table.to_owned()).await?;

    let columns = "\"id\", \"user_id\", \"ip_address\", \"attempts\", \"suspended\", \"banned\", \
                   \"last_attempt_at\", \"suspended_at\", \"banned_at\", \"type\", \"ip\"";
    db.execute(Statement::from_string(
        backend,
        format!("INSERT INTO throttle ({columns}) SELECT {columns} FROM throttle_old;"),
    ))
    .await?;

    db.execute(Statement::from_string(
        backend,
        "DROP TABLE throttle_old;".to_string(),
    ))
    .await?;

    // The index followed the old table and was dropped with it.
    manager.create_index(throttle_user_id_index()).await?;

    Ok(())
}
