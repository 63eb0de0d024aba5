//! Users after conversion: credentials, boolean permissions and profile
//! fields. Activation and persistence state live in their own tables.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use crate::{Permissions, ResultSentinel};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub email: String,
    pub password: String,
    pub permissions: Option<String>,
    pub last_login: Option<DateTimeUtc>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: Option<DateTimeUtc>,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// A user as seen by callers. The password hash never leaves the crate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub permissions: Permissions,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
}

impl TryFrom<Model> for User {
    type Error = crate::SentinelError;

    fn try_from(model: Model) -> ResultSentinel<Self> {
        Ok(Self {
            permissions: Permissions::from_column(model.permissions.as_deref())?,
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            last_login: model.last_login,
        })
    }
}

/// Email and plain-text password, as submitted on login or registration.
#[derive(Clone, Copy, Debug)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

impl<'a> Credentials<'a> {
    pub fn new(email: &'a str, password: &'a str) -> Self {
        Self { email, password }
    }
}
