//! Groups become roles, group memberships become role memberships.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ConnectionTrait;
use sea_orm_migration::prelude::*;

use super::find_id;
use crate::m20121206_225921_sentry_schema::{Groups, UsersGroups};
use crate::m20160919_000103_add_sentinel_schema::{RoleUsers, Roles};
use crate::{ConversionError, permissions, slug::slugify};

pub(crate) async fn forward<C: ConnectionTrait>(db: &C) -> Result<(), ConversionError> {
    let backend = db.get_database_backend();
    let now = Utc::now();

    let groups = db
        .query_all(
            backend.build(
                &Query::select()
                    .columns([Groups::Id, Groups::Name, Groups::Permissions])
                    .from(Groups::Table)
                    .order_by(Groups::Id, Order::Asc)
                    .to_owned(),
            ),
        )
        .await?;

    // Lives for this pass only.
    let mut group_to_role: HashMap<i32, i32> = HashMap::with_capacity(groups.len());
    let mut slug_owners: HashMap<String, String> = HashMap::with_capacity(groups.len());

    for row in &groups {
        let group_id: i32 = row.try_get("", "id")?;
        let name: String = row.try_get("", "name")?;
        let stored: Option<String> = row.try_get("", "permissions")?;

        let slug = slugify(&name).ok_or_else(|| ConversionError::EmptySlug(name.clone()))?;
        if let Some(first) = slug_owners.get(&slug) {
            return Err(ConversionError::SlugCollision {
                first: first.clone(),
                second: name,
                slug,
            });
        }
        slug_owners.insert(slug.clone(), name.clone());

        let converted = permissions::encode(&permissions::parse_legacy(stored.as_deref())?);
        db.execute(
            backend.build(
                &Query::insert()
                    .into_table(Roles::Table)
                    .columns([
                        Roles::Slug,
                        Roles::Name,
                        Roles::Permissions,
                        Roles::CreatedAt,
                        Roles::UpdatedAt,
                    ])
                    .values_panic([
                        slug.clone().into(),
                        name.into(),
                        permissions::to_column(&converted)?.into(),
                        now.into(),
                        now.into(),
                    ])
                    .to_owned(),
            ),
        )
        .await?;

        let role_id = find_id(
            db,
            &Query::select()
                .column(Roles::Id)
                .from(Roles::Table)
                .and_where(Expr::col(Roles::Slug).eq(slug))
                .to_owned(),
        )
        .await?
        .ok_or(DbErr::RecordNotInserted)?;
        group_to_role.insert(group_id, role_id);
    }

    let memberships = db
        .query_all(
            backend.build(
                &Query::select()
                    .columns([UsersGroups::UserId, UsersGroups::GroupId])
                    .from(UsersGroups::Table)
                    .order_by(UsersGroups::UserId, Order::Asc)
                    .order_by(UsersGroups::GroupId, Order::Asc)
                    .to_owned(),
            ),
        )
        .await?;

    for row in &memberships {
        let user_id: i32 = row.try_get("", "user_id")?;
        let group_id: i32 = row.try_get("", "group_id")?;
        let role_id = *group_to_role
            .get(&group_id)
            .ok_or(ConversionError::MissingMapping {
                table: "users_groups",
                kind: "group",
                id: group_id,
            })?;

        db.execute(
            backend.build(
                &Query::insert()
                    .into_table(RoleUsers::Table)
                    .columns([RoleUsers::UserId, RoleUsers::RoleId])
                    .values_panic([user_id.into(), role_id.into()])
                    .to_owned(),
            ),
        )
        .await?;
    }

    tracing::info!(
        roles = groups.len(),
        memberships = memberships.len(),
        "converted groups into roles"
    );
    Ok(())
}

/// Roles back into groups. The slug has no Sentry counterpart and is dropped.
///
/// A group that still exists under the same name is reused, and memberships
/// that are already present are left alone. Group names are unique, so two
/// roles sharing a name cannot be restored and abort the reversal.
pub(crate) async fn reverse<C: ConnectionTrait>(db: &C) -> Result<(), ConversionError> {
    let backend = db.get_database_backend();
    let now = Utc::now();

    let roles = db
        .query_all(
            backend.build(
                &Query::select()
                    .columns([Roles::Id, Roles::Name, Roles::Permissions])
                    .from(Roles::Table)
                    .order_by(Roles::Id, Order::Asc)
                    .to_owned(),
            ),
        )
        .await?;

    let mut role_to_group: HashMap<i32, i32> = HashMap::with_capacity(roles.len());
    let mut name_owners: HashMap<String, i32> = HashMap::with_capacity(roles.len());

    for row in &roles {
        let role_id: i32 = row.try_get("", "id")?;
        let name: String = row.try_get("", "name")?;
        let stored: Option<String> = row.try_get("", "permissions")?;

        if let Some(&first) = name_owners.get(&name) {
            return Err(ConversionError::DuplicateRoleName {
                first,
                second: role_id,
                name,
            });
        }
        name_owners.insert(name.clone(), role_id);

        let decoded = permissions::decode(&permissions::parse(stored.as_deref())?);
        let column = permissions::to_column(&decoded)?;

        let by_name = Query::select()
            .column(Groups::Id)
            .from(Groups::Table)
            .and_where(Expr::col(Groups::Name).eq(name.clone()))
            .to_owned();

        let group_id = match find_id(db, &by_name).await? {
            Some(group_id) => {
                db.execute(
                    backend.build(
                        &Query::update()
                            .table(Groups::Table)
                            .value(Groups::Permissions, column)
                            .value(Groups::UpdatedAt, now)
                            .and_where(Expr::col(Groups::Id).eq(group_id))
                            .to_owned(),
                    ),
                )
                .await?;
                group_id
            }
            None => {
                db.execute(
                    backend.build(
                        &Query::insert()
                            .into_table(Groups::Table)
                            .columns([
                                Groups::Name,
                                Groups::Permissions,
                                Groups::CreatedAt,
                                Groups::UpdatedAt,
                            ])
                            .values_panic([name.into(), column.into(), now.into(), now.into()])
                            .to_owned(),
                    ),
                )
                .await?;
                find_id(db, &by_name).await?.ok_or(DbErr::RecordNotInserted)?
            }
        };
        role_to_group.insert(role_id, group_id);
    }

    let memberships = db
        .query_all(
            backend.build(
                &Query::select()
                    .columns([RoleUsers::UserId, RoleUsers::RoleId])
                    .from(RoleUsers::Table)
                    .order_by(RoleUsers::UserId, Order::Asc)
                    .order_by(RoleUsers::RoleId, Order::Asc)
                    .to_owned(),
            ),
        )
        .await?;

    for row in &memberships {
        let user_id: i32 = row.try_get("", "user_id")?;
        let role_id: i32 = row.try_get("", "role_id")?;
        let group_id = *role_to_group
            .get(&role_id)
            .ok_or(ConversionError::MissingMapping {
                table: "role_users",
                kind: "role",
                id: role_id,
            })?;

        db.execute(
            backend.build(
                &Query::insert()
                    .into_table(UsersGroups::Table)
                    .columns([UsersGroups::UserId, UsersGroups::GroupId])
                    .values_panic([user_id.into(), group_id.into()])
                    .on_conflict(
                        OnConflict::columns([UsersGroups::UserId, UsersGroups::GroupId])
                            .do_nothing()
                            .to_owned(),
                    )
                    .to_owned(),
            ),
        )
        .await?;
    }

    tracing::info!(
        groups = roles.len(),
        memberships = memberships.len(),
        "restored Sentry groups"
    );
    Ok(())
}
