use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, SqlErr, TransactionTrait, prelude::*};

use crate::{Credentials, ResultSentinel, SentinelError, User, users, util};

use super::{Sentinel, activations, with_tx};

impl Sentinel {
    /// Register a new user with an Argon2-hashed password.
    ///
    /// With `activate` the user also gets a completed activation and can log
    /// in right away. Email uniqueness is enforced by the `users` email index,
    /// so concurrent registrations of one address yield a single user.
    pub async fn register(
        &self,
        credentials: Credentials<'_>,
        activate: bool,
    ) -> ResultSentinel<User> {
        let email = credentials.email.trim();
        if email.is_empty() || credentials.password.is_empty() {
            return Err(SentinelError::InvalidCredentials);
        }
        let password = util::hash_password(credentials.password)?;

        with_tx!(self, |db_tx| {
            let now = Utc::now();
            let user = users::ActiveModel {
                email: ActiveValue::Set(email.to_string()),
                password: ActiveValue::Set(password),
                created_at: ActiveValue::Set(Some(now)),
                updated_at: ActiveValue::Set(Some(now)),
                ..Default::default()
            }
            .insert(&db_tx)
            .await
            .map_err(|err| match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    SentinelError::UserExists(email.to_string())
                }
                _ => err.into(),
            })?;

            if activate {
                let activation = activations::create(&db_tx, user.id, now).await?;
                activations::complete(&db_tx, user.id, &activation.code, now).await?;
            }

            tracing::info!(user_id = user.id, activated = activate, "user registered");
            User::try_from(user)
        })
    }

    /// Look a user up by the email in `credentials`. The password is not
    /// checked here; see [`Sentinel::validate_credentials`].
    pub async fn find_user_by_credentials(
        &self,
        credentials: Credentials<'_>,
    ) -> ResultSentinel<Option<User>> {
        users::Entity::find()
            .filter(users::Column::Email.eq(credentials.email.trim()))
            .one(&self.database)
            .await?
            .map(User::try_from)
            .transpose()
    }

    pub async fn find_user_by_id(&self, user_id: i32) -> ResultSentinel<Option<User>> {
        users::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .map(User::try_from)
            .transpose()
    }

    /// Whether `credentials` match the stored password hash of `user`.
    pub async fn validate_credentials(
        &self,
        user: &User,
        credentials: Credentials<'_>,
    ) -> ResultSentinel<bool> {
        let model = self.user_model(user.id).await?;
        Ok(model.email == credentials.email.trim()
            && util::verify_password(&model.password, credentials.password))
    }

    /// Persist the permissions and profile fields of `user`.
    pub async fn save(&self, user: &User) -> ResultSentinel<User> {
        let mut model: users::ActiveModel = self.user_model(user.id).await?.into();
        model.permissions = ActiveValue::Set(user.permissions.to_column()?);
        model.first_name = ActiveValue::Set(user.first_name.clone());
        model.last_name = ActiveValue::Set(user.last_name.clone());
        model.updated_at = ActiveValue::Set(Some(Utc::now()));

        User::try_from(model.update(&self.database).await?)
    }

    /// Grant `permission` to `user` and save it.
    pub async fn add_permission(&self, user: &mut User, permission: &str) -> ResultSentinel<()> {
        user.permissions.add(permission);
        *user = self.save(user).await?;
        Ok(())
    }

    pub(super) async fn user_model(&self, user_id: i32) -> ResultSentinel<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| SentinelError::KeyNotFound(format!("user {user_id}")))
    }
}
