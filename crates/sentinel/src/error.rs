//! Errors returned by [`Sentinel`](crate::Sentinel) operations.
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("A user with email \"{0}\" already exists")]
    UserExists(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User \"{0}\" is not activated")]
    NotActivated(String),
    #[error("Invalid permissions: {0}")]
    InvalidPermissions(String),
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for SentinelError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::UserExists(a), Self::UserExists(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidCredentials, Self::InvalidCredentials) => true,
            (Self::NotActivated(a), Self::NotActivated(b)) => a == b,
            (Self::InvalidPermissions(a), Self::InvalidPermissions(b)) => a == b,
            (Self::PasswordHash(a), Self::PasswordHash(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
