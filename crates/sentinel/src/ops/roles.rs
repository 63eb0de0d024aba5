use chrono::Utc;
use sea_orm::{
    ActiveValue, JoinType, QueryFilter, QueryOrder, QuerySelect, prelude::*,
    sea_query::OnConflict,
};

use crate::{Permissions, ResultSentinel, Role, SentinelError, User, role_users, roles};

use super::Sentinel;

impl Sentinel {
    /// Create a role. The slug must be unused.
    pub async fn create_role(
        &self,
        name: &str,
        slug: &str,
        permissions: Permissions,
    ) -> ResultSentinel<Role> {
        let name = name.trim();
        let slug = slug.trim();
        if self.find_role_by_slug(slug).await?.is_some() {
            return Err(SentinelError::ExistingKey(slug.to_string()));
        }

        let now = Utc::now();
        let role = roles::ActiveModel {
            slug: ActiveValue::Set(slug.to_string()),
            name: ActiveValue::Set(name.to_string()),
            permissions: ActiveValue::Set(permissions.to_column()?),
            created_at: ActiveValue::Set(Some(now)),
            updated_at: ActiveValue::Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.database)
        .await?;

        tracing::info!(role_id = role.id, slug = %role.slug, "role created");
        Role::try_from(role)
    }

    pub async fn find_role_by_slug(&self, slug: &str) -> ResultSentinel<Option<Role>> {
        roles::Entity::find()
            .filter(roles::Column::Slug.eq(slug))
            .one(&self.database)
            .await?
            .map(Role::try_from)
            .transpose()
    }

    pub async fn find_role_by_name(&self, name: &str) -> ResultSentinel<Option<Role>> {
        roles::Entity::find()
            .filter(roles::Column::Name.eq(name))
            .order_by_asc(roles::Column::Id)
            .one(&self.database)
            .await?
            .map(Role::try_from)
            .transpose()
    }

    /// Persist the name and permissions of `role`.
    pub async fn save_role(&self, role: &Role) -> ResultSentinel<Role> {
        let model = roles::Entity::find_by_id(role.id)
            .one(&self.database)
            .await?
            .ok_or_else(|| SentinelError::KeyNotFound(format!("role {}", role.id)))?;

        let mut model: roles::ActiveModel = model.into();
        model.name = ActiveValue::Set(role.name.clone());
        model.permissions = ActiveValue::Set(role.permissions.to_column()?);
        model.updated_at = ActiveValue::Set(Some(Utc::now()));
        Role::try_from(model.update(&self.database).await?)
    }

    /// Add `user` to `role`. Attaching twice is a no-op.
    pub async fn attach(&self, role: &Role, user: &User) -> ResultSentinel<()> {
        let now = Utc::now();
        role_users::Entity::insert(role_users::ActiveModel {
            user_id: ActiveValue::Set(user.id),
            role_id: ActiveValue::Set(role.id),
            created_at: ActiveValue::Set(Some(now)),
            updated_at: ActiveValue::Set(Some(now)),
        })
        .on_conflict(
            OnConflict::columns([role_users::Column::UserId, role_users::Column::RoleId])
                .do_nothing()
                .to_owned(),
        )
        .do_nothing()
        .exec(&self.database)
        .await?;
        Ok(())
    }

    /// Remove `user` from `role`. Returns whether a membership existed.
    pub async fn detach(&self, role: &Role, user: &User) -> ResultSentinel<bool> {
        let result = role_users::Entity::delete_many()
            .filter(role_users::Column::UserId.eq(user.id))
            .filter(role_users::Column::RoleId.eq(role.id))
            .exec(&self.database)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Roles `user` belongs to, ordered by id.
    pub async fn user_roles(&self, user: &User) -> ResultSentinel<Vec<Role>> {
        roles::Entity::find()
            .join(JoinType::InnerJoin, roles::Relation::RoleUsers.def())
            .filter(role_users::Column::UserId.eq(user.id))
            .order_by_asc(roles::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Role::try_from)
            .collect()
    }

    pub async fn in_role(&self, user: &User, slug: &str) -> ResultSentinel<bool> {
        Ok(self
            .user_roles(user)
            .await?
            .iter()
            .any(|role| role.slug == slug))
    }

    /// Whether `user` may do `permission`.
    ///
    /// An explicit value on the user wins, including a denial. Otherwise the
    /// permission is granted when any of the user's roles grants it.
    pub async fn has_access(&self, user: &User, permission: &str) -> ResultSentinel<bool> {
        if let Some(value) = user.permissions.get(permission) {
            return Ok(value);
        }
        Ok(self
            .user_roles(user)
            .await?
            .iter()
            .any(|role| role.permissions.has(permission)))
    }
}
