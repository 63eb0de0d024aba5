//! Drop what only Sentry used once the conversion has run.
//!
//! The reversal restores the columns, indexes and tables exactly as
//! `sentry_schema` created them. They come back empty; refilling them is
//! `add_sentinel_schema`'s reversal.

use sea_orm_migration::prelude::*;

use crate::m20121206_225921_sentry_schema::{
    Groups, Throttle, Users, UsersGroups, USERS_ACTIVATION_CODE_INDEX,
    USERS_RESET_PASSWORD_CODE_INDEX, create_groups, create_users_groups, groups_name_index,
    legacy_throttle_columns, legacy_user_columns, legacy_user_indexes,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // SQLite refuses to drop an indexed column.
        for index in [USERS_ACTIVATION_CODE_INDEX, USERS_RESET_PASSWORD_CODE_INDEX] {
            manager
                .drop_index(Index::drop().name(index).table(Users::Table).to_owned())
                .await?;
        }

        for column in [
            Users::Activated,
            Users::ActivationCode,
            Users::ActivatedAt,
            Users::PersistCode,
            Users::ResetPasswordCode,
        ] {
            manager
                .alter_table(
                    Table::alter()
                        .table(Users::Table)
                        .drop_column(column)
                        .to_owned(),
                )
                .await?;
        }

        for column in [
            Throttle::IpAddress,
            Throttle::Attempts,
            Throttle::Suspended,
            Throttle::Banned,
            Throttle::LastAttemptAt,
            Throttle::SuspendedAt,
            Throttle::BannedAt,
        ] {
            manager
                .alter_table(
                    Table::alter()
                        .table(Throttle::Table)
                        .drop_column(column)
                        .to_owned(),
                )
                .await?;
        }

        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UsersGroups::Table).to_owned())
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for column in legacy_user_columns() {
            manager
                .alter_table(
                    Table::alter()
                        .table(Users::Table)
                        .add_column(column)
                        .to_owned(),
                )
                .await?;
        }
        for index in legacy_user_indexes() {
            manager.create_index(index).await?;
        }

        for column in legacy_throttle_columns() {
            manager
                .alter_table(
                    Table::alter()
                        .table(Throttle::Table)
                        .add_column(column)
                        .to_owned(),
                )
                .await?;
        }

        manager.create_table(create_groups()).await?;
        manager.create_index(groups_name_index()).await?;
        manager.create_table(create_users_groups()).await?;

        Ok(())
    }
}
