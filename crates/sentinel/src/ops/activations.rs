use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, prelude::*};

use crate::{Activation, ResultSentinel, User, activations, util};

use super::Sentinel;

/// The user's pending activation, or a new one.
pub(super) async fn create<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    now: DateTime<Utc>,
) -> Result<Activation, DbErr> {
    if let Some(existing) = find(db, user_id, false).await? {
        return Ok(existing);
    }

    activations::ActiveModel {
        user_id: ActiveValue::Set(user_id),
        code: ActiveValue::Set(util::random_code()),
        completed: ActiveValue::Set(false),
        created_at: ActiveValue::Set(Some(now)),
        updated_at: ActiveValue::Set(Some(now)),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Complete the activation matching `code`.
///
/// An activation that is already completed is left untouched, so
/// `completed_at` keeps its first value.
pub(super) async fn complete<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    code: &str,
    now: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let Some(activation) = activations::Entity::find()
        .filter(activations::Column::UserId.eq(user_id))
        .filter(activations::Column::Code.eq(code))
        .one(db)
        .await?
    else {
        return Ok(false);
    };
    if activation.completed {
        return Ok(true);
    }

    let mut activation: activations::ActiveModel = activation.into();
    activation.completed = ActiveValue::Set(true);
    activation.completed_at = ActiveValue::Set(Some(now));
    activation.updated_at = ActiveValue::Set(Some(now));
    activation.update(db).await?;
    Ok(true)
}

async fn find<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    completed: bool,
) -> Result<Option<Activation>, DbErr> {
    activations::Entity::find()
        .filter(activations::Column::UserId.eq(user_id))
        .filter(activations::Column::Completed.eq(completed))
        .order_by_asc(activations::Column::Id)
        .one(db)
        .await
}

impl Sentinel {
    /// Return the user's pending activation, creating one if needed.
    pub async fn create_activation(&self, user: &User) -> ResultSentinel<Activation> {
        let activation = create(&self.database, user.id, Utc::now()).await?;
        tracing::debug!(user_id = user.id, activation_id = activation.id, "activation ready");
        Ok(activation)
    }

    /// The user's pending activation, if any.
    pub async fn activation_exists(&self, user: &User) -> ResultSentinel<Option<Activation>> {
        Ok(find(&self.database, user.id, false).await?)
    }

    /// Complete the activation identified by `code`. Returns `false` when
    /// the code does not belong to `user`.
    pub async fn complete_activation(&self, user: &User, code: &str) -> ResultSentinel<bool> {
        Ok(complete(&self.database, user.id, code, Utc::now()).await?)
    }

    /// The user's completed activation, if any.
    pub async fn activation_completed(&self, user: &User) -> ResultSentinel<Option<Activation>> {
        Ok(find(&self.database, user.id, true).await?)
    }
}
