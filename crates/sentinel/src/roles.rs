//! Roles group permissions and are attached to users through `role_users`.

use sea_orm::entity::prelude::*;

use crate::{Permissions, ResultSentinel};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub slug: String,
    pub name: String,
    pub permissions: Option<String>,
    pub created_at: Option<DateTimeUtc>,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::role_users::Entity")]
    RoleUsers,
}

impl Related<super::role_users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoleUsers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Role {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub permissions: Permissions,
}

impl TryFrom<Model> for Role {
    type Error = crate::SentinelError;

    fn try_from(model: Model) -> ResultSentinel<Self> {
        Ok(Self {
            permissions: Permissions::from_column(model.permissions.as_deref())?,
            id: model.id,
            slug: model.slug,
            name: model.name,
        })
    }
}
