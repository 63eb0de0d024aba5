//! Errors raised while converting rows between the Sentry and Sentinel models.
//!
//! Every variant is fatal: the migration runner receives it as
//! [`DbErr::Migration`] and halts the batch. Rows converted before the
//! failure stay converted.
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("{table} row references unknown {kind} id {id}")]
    MissingMapping {
        table: &'static str,
        kind: &'static str,
        id: i32,
    },
    #[error("groups \"{first}\" and \"{second}\" both slugify to \"{slug}\"")]
    SlugCollision {
        first: String,
        second: String,
        slug: String,
    },
    #[error("group \"{0}\" has no characters usable in a slug")]
    EmptySlug(String),
    #[error("user {user_id} has an unreadable activated_at \"{value}\"")]
    InvalidTimestamp { user_id: i32, value: String },
    #[error("roles {first} and {second} are both named \"{name}\"")]
    DuplicateRoleName { first: i32, second: i32, name: String },
    #[error("invalid permissions: {0}")]
    InvalidPermissions(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl From<ConversionError> for DbErr {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::Database(err) => err,
            other => DbErr::Migration(other.to_string()),
        }
    }
}
