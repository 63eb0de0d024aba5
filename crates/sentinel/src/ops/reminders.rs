use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{Reminder, ResultSentinel, SentinelError, User, reminders, users, util};

use super::{Sentinel, with_tx};

impl Sentinel {
    /// Return the user's pending password reminder, creating one if needed.
    pub async fn create_reminder(&self, user: &User) -> ResultSentinel<Reminder> {
        if let Some(existing) = self.reminder_exists(user).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let reminder = reminders::ActiveModel {
            user_id: ActiveValue::Set(user.id),
            code: ActiveValue::Set(util::random_code()),
            completed: ActiveValue::Set(false),
            created_at: ActiveValue::Set(Some(now)),
            updated_at: ActiveValue::Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.database)
        .await?;

        tracing::debug!(user_id = user.id, reminder_id = reminder.id, "reminder created");
        Ok(reminder)
    }

    /// The user's pending reminder, if any.
    pub async fn reminder_exists(&self, user: &User) -> ResultSentinel<Option<Reminder>> {
        Ok(reminders::Entity::find()
            .filter(reminders::Column::UserId.eq(user.id))
            .filter(reminders::Column::Completed.eq(false))
            .order_by_asc(reminders::Column::Id)
            .one(&self.database)
            .await?)
    }

    /// Reset the user's password with a pending reminder.
    ///
    /// Returns `false` when `code` does not match a pending reminder of
    /// `user`; the password is left unchanged in that case. A reminder is
    /// claimed inside the transaction, so it resets the password once even
    /// under concurrent completions.
    pub async fn complete_reminder(
        &self,
        user: &User,
        code: &str,
        new_password: &str,
    ) -> ResultSentinel<bool> {
        let password = util::hash_password(new_password)?;

        with_tx!(self, |db_tx| {
            let now = Utc::now();

            let claimed = reminders::Entity::update_many()
                .col_expr(reminders::Column::Completed, Expr::value(true))
                .col_expr(reminders::Column::CompletedAt, Expr::value(now))
                .col_expr(reminders::Column::UpdatedAt, Expr::value(now))
                .filter(reminders::Column::UserId.eq(user.id))
                .filter(reminders::Column::Code.eq(code))
                .filter(reminders::Column::Completed.eq(false))
                .exec(&db_tx)
                .await?;
            if claimed.rows_affected == 0 {
                return Ok(false);
            }

            let user_model = users::Entity::find_by_id(user.id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| SentinelError::KeyNotFound(format!("user {}", user.id)))?;
            let mut user_model: users::ActiveModel = user_model.into();
            user_model.password = ActiveValue::Set(password);
            user_model.updated_at = ActiveValue::Set(Some(now));
            user_model.update(&db_tx).await?;

            tracing::info!(user_id = user.id, "password reset");
            Ok(true)
        })
    }
}
