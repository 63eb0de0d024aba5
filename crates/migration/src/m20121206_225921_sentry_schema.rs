//! Legacy Sentry schema.
//!
//! Creates the tables as Sentry left them:
//!
//! - `users`: credentials, flat integer permissions and the activation /
//!   persistence / reset state Sentry kept inline,
//! - `groups`: named permission sets,
//! - `users_groups`: group memberships,
//! - `throttle`: per-user login attempt tracking.
//!
//! The legacy-only column and table definitions are shared with
//! `remove_sentry_schema`, whose reversal has to restore them exactly.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub(crate) enum Users {
    Table,
    Id,
    Email,
    Password,
    Permissions,
    LastLogin,
    FirstName,
    LastName,
    CreatedAt,
    UpdatedAt,
    Activated,
    ActivationCode,
    ActivatedAt,
    PersistCode,
    ResetPasswordCode,
}

#[derive(Iden)]
pub(crate) enum Groups {
    Table,
    Id,
    Name,
    Permissions,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub(crate) enum UsersGroups {
    Table,
    UserId,
    GroupId,
}

#[derive(Iden)]
pub(crate) enum Throttle {
    Table,
    Id,
    UserId,
    IpAddress,
    Attempts,
    Suspended,
    Banned,
    LastAttemptAt,
    SuspendedAt,
    BannedAt,
}

pub(crate) const USERS_ACTIVATION_CODE_INDEX: &str = "idx-users-activation_code";
pub(crate) const USERS_RESET_PASSWORD_CODE_INDEX: &str = "idx-users-reset_password_code";
pub(crate) const GROUPS_NAME_INDEX: &str = "idx-groups-name-unique";
pub(crate) const THROTTLE_USER_ID_INDEX: &str = "idx-throttle-user_id";

/// `users` columns that only exist in the Sentry model, in table order.
pub(crate) fn legacy_user_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new(Users::Activated)
            .boolean()
            .not_null()
            .default(false)
            .to_owned(),
        ColumnDef::new(Users::ActivationCode).string().null().to_owned(),
        ColumnDef::new(Users::ActivatedAt).timestamp().null().to_owned(),
        ColumnDef::new(Users::PersistCode).string().null().to_owned(),
        ColumnDef::new(Users::ResetPasswordCode).string().null().to_owned(),
    ]
}

/// `throttle` columns that only exist in the Sentry model, in table order.
pub(crate) fn legacy_throttle_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new(Throttle::IpAddress).string().null().to_owned(),
        ColumnDef::new(Throttle::Attempts)
            .integer()
            .not_null()
            .default(0)
            .to_owned(),
        ColumnDef::new(Throttle::Suspended)
            .boolean()
            .not_null()
            .default(false)
            .to_owned(),
        ColumnDef::new(Throttle::Banned)
            .boolean()
            .not_null()
            .default(false)
            .to_owned(),
        ColumnDef::new(Throttle::LastAttemptAt).timestamp().null().to_owned(),
        ColumnDef::new(Throttle::SuspendedAt).timestamp().null().to_owned(),
        ColumnDef::new(Throttle::BannedAt).timestamp().null().to_owned(),
    ]
}

pub(crate) fn legacy_user_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name(USERS_ACTIVATION_CODE_INDEX)
            .table(Users::Table)
            .col(Users::ActivationCode)
            .to_owned(),
        Index::create()
            .name(USERS_RESET_PASSWORD_CODE_INDEX)
            .table(Users::Table)
            .col(Users::ResetPasswordCode)
            .to_owned(),
    ]
}

pub(crate) fn create_groups() -> TableCreateStatement {
    Table::create()
        .table(Groups::Table)
        .col(
            ColumnDef::new(Groups::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(Groups::Name).string().not_null())
        .col(ColumnDef::new(Groups::Permissions).text().null())
        .col(ColumnDef::new(Groups::CreatedAt).timestamp().null())
        .col(ColumnDef::new(Groups::UpdatedAt).timestamp().null())
        .to_owned()
}

pub(crate) fn groups_name_index() -> IndexCreateStatement {
    Index::create()
        .name(GROUPS_NAME_INDEX)
        .table(Groups::Table)
        .col(Groups::Name)
        .unique()
        .to_owned()
}

pub(crate) fn create_users_groups() -> TableCreateStatement {
    Table::create()
        .table(UsersGroups::Table)
        .col(ColumnDef::new(UsersGroups::UserId).integer().not_null())
        .col(ColumnDef::new(UsersGroups::GroupId).integer().not_null())
        .primary_key(
            Index::create()
                .col(UsersGroups::UserId)
                .col(UsersGroups::GroupId),
        )
        .to_owned()
}

pub(crate) fn throttle_user_id_index() -> IndexCreateStatement {
    Index::create()
        .name(THROTTLE_USER_ID_INDEX)
        .table(Throttle::Table)
        .col(Throttle::UserId)
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut users = Table::create();
        users
            .table(Users::Table)
            .col(
                ColumnDef::new(Users::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(Users::Email).string().not_null())
            .col(ColumnDef::new(Users::Password).string().not_null())
            .col(ColumnDef::new(Users::Permissions).text().null())
            .col(ColumnDef::new(Users::LastLogin).timestamp().null())
            .col(ColumnDef::new(Users::FirstName).string().null())
            .col(ColumnDef::new(Users::LastName).string().null())
            .col(ColumnDef::new(Users::CreatedAt).timestamp().null())
            .col(ColumnDef::new(Users::UpdatedAt).timestamp().null());
        for column in legacy_user_columns() {
            users.col(column);
        }
        manager.create_table(users.to_owned()).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-email-unique")
                    .table(Users::Table)
                    .col(Users::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;
        for index in legacy_user_indexes() {
            manager.create_index(index).await?;
        }

        manager.create_table(create_groups()).await?;
        manager.create_index(groups_name_index()).await?;
        manager.create_table(create_users_groups()).await?;

        let mut throttle = Table::create();
        throttle
            .table(Throttle::Table)
            .col(
                ColumnDef::new(Throttle::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(Throttle::UserId).integer().not_null());
        for column in legacy_throttle_columns() {
            throttle.col(column);
        }
        manager.create_table(throttle.to_owned()).await?;
        manager.create_index(throttle_user_id_index()).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Throttle::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UsersGroups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
