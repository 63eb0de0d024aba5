use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, prelude::*};

use crate::{
    Credentials, ResultSentinel, SentinelError, Session, User, persistences, users, util,
};

use super::Sentinel;

impl Sentinel {
    /// Check `credentials` and log the user in.
    ///
    /// Fails with [`SentinelError::InvalidCredentials`] for an unknown email
    /// or a wrong password, and with [`SentinelError::NotActivated`] when the
    /// user has no completed activation. A bcrypt hash carried over from
    /// Sentry is replaced with an Argon2 one on success.
    pub async fn authenticate(
        &self,
        session: &mut Session,
        credentials: Credentials<'_>,
        remember: bool,
    ) -> ResultSentinel<User> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(credentials.email.trim()))
            .one(&self.database)
            .await?
            .ok_or(SentinelError::InvalidCredentials)?;
        if !util::verify_password(&model.password, credentials.password) {
            tracing::debug!(user_id = model.id, "wrong password");
            return Err(SentinelError::InvalidCredentials);
        }

        let user = User::try_from(model.clone())?;
        if self.activation_completed(&user).await?.is_none() {
            return Err(SentinelError::NotActivated(user.email));
        }

        if util::needs_rehash(&model.password) {
            let mut model: users::ActiveModel = model.into();
            model.password = ActiveValue::Set(util::hash_password(credentials.password)?);
            model.update(&self.database).await?;
            tracing::info!(user_id = user.id, "legacy password hash upgraded");
        }

        self.login(session, &user, remember).await
    }

    /// Log `user` in without checking credentials.
    ///
    /// A new persistence code is stored in `session`, replacing any previous
    /// one, and `last_login` is updated.
    pub async fn login(
        &self,
        session: &mut Session,
        user: &User,
        remember: bool,
    ) -> ResultSentinel<User> {
        let now = Utc::now();
        let persistence = persistences::ActiveModel {
            user_id: ActiveValue::Set(user.id),
            code: ActiveValue::Set(util::random_code()),
            created_at: ActiveValue::Set(Some(now)),
            updated_at: ActiveValue::Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.database)
        .await?;

        let mut model: users::ActiveModel = self.user_model(user.id).await?.into();
        model.last_login = ActiveValue::Set(Some(now));
        let user = User::try_from(model.update(&self.database).await?)?;

        session.code = Some(persistence.code);
        session.remember = remember;
        tracing::info!(user_id = user.id, remember, "user logged in");
        Ok(user)
    }

    /// Drop the session's persistence and clear the session.
    pub async fn logout(&self, session: &mut Session) -> ResultSentinel<()> {
        if let Some(code) = session.code() {
            persistences::Entity::delete_many()
                .filter(persistences::Column::Code.eq(code))
                .exec(&self.database)
                .await?;
        }
        session.clear();
        Ok(())
    }

    /// Drop every persistence of `user`, logging them out of all sessions.
    pub async fn flush(&self, user: &User) -> ResultSentinel<u64> {
        let result = persistences::Entity::delete_many()
            .filter(persistences::Column::UserId.eq(user.id))
            .exec(&self.database)
            .await?;
        Ok(result.rows_affected)
    }

    /// The user logged in through `session`, if the session is still valid.
    pub async fn check(&self, session: &Session) -> ResultSentinel<Option<User>> {
        let Some(code) = session.code() else {
            return Ok(None);
        };
        let Some(persistence) = persistences::Entity::find()
            .filter(persistences::Column::Code.eq(code))
            .one(&self.database)
            .await?
        else {
            return Ok(None);
        };
        self.find_user_by_id(persistence.user_id).await
    }
}
