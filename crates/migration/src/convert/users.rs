//! Users: activation state and user-level permissions.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sea_orm::{ConnectionTrait, prelude::DateTimeUtc};
use sea_orm_migration::prelude::*;

use super::{activations, find_id};
use crate::m20121206_225921_sentry_schema::Users;
use crate::m20160919_000103_add_sentinel_schema::Activations;
use crate::{ConversionError, permissions};

/// Sentry keeps activation state on the user row; Sentinel wants a completed
/// activation record dated at the original activation time. Permissions are
/// re-encoded as booleans.
pub(crate) async fn forward<C: ConnectionTrait>(db: &C) -> Result<(), ConversionError> {
    let backend = db.get_database_backend();
    let now = Utc::now();

    let rows = db
        .query_all(
            backend.build(
                &Query::select()
                    .columns([
                        Users::Id,
                        Users::Permissions,
                        Users::Activated,
                        Users::ActivatedAt,
                    ])
                    .from(Users::Table)
                    .order_by(Users::Id, Order::Asc)
                    .to_owned(),
            ),
        )
        .await?;

    let mut activated = 0usize;
    for row in &rows {
        let user_id: i32 = row.try_get("", "id")?;
        let stored: Option<String> = row.try_get("", "permissions")?;
        let is_activated: bool = row.try_get("", "activated")?;
        let activated_at: Option<String> = row.try_get("", "activated_at")?;

        if is_activated {
            let activation = activations::create(db, user_id, now).await?;
            activations::complete(db, user_id, &activation.code, now).await?;
            if let Some(raw) = activated_at.as_deref() {
                let completed_at = parse_timestamp(raw).ok_or_else(|| {
                    ConversionError::InvalidTimestamp {
                        user_id,
                        value: raw.to_string(),
                    }
                })?;
                backdate_activation(db, activation.id, completed_at).await?;
            }
            activated += 1;
        }

        let converted = permissions::encode(&permissions::parse_legacy(stored.as_deref())?);
        db.execute(
            backend.build(
                &Query::update()
                    .table(Users::Table)
                    .value(Users::Permissions, permissions::to_column(&converted)?)
                    .and_where(Expr::col(Users::Id).eq(user_id))
                    .to_owned(),
            ),
        )
        .await?;
        tracing::debug!(user_id, is_activated, "converted user");
    }

    tracing::info!(users = rows.len(), activated, "converted users");
    Ok(())
}

/// Replace the completion time with the legacy `activated_at`. A user
/// activated without a recorded time keeps the completion time.
async fn backdate_activation<C: ConnectionTrait>(
    db: &C,
    activation_id: i32,
    completed_at: NaiveDateTime,
) -> Result<(), ConversionError> {
    let backend = db.get_database_backend();
    db.execute(
        backend.build(
            &Query::update()
                .table(Activations::Table)
                .value(
                    Activations::CompletedAt,
                    completed_at.format(TIMESTAMP_FORMAT).to_string(),
                )
                .and_where(Expr::col(Activations::Id).eq(activation_id))
                .to_owned(),
        ),
    )
    .await?;
    Ok(())
}

/// `YYYY-MM-DD HH:MM:SS`, with fractional seconds only when present.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Read a legacy timestamp as UTC. Sentry wrote `YYYY-MM-DD HH:MM:SS`, but
/// hand-edited rows also carry bare dates (midnight) or RFC 3339 values.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.naive_utc());
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Rebuild `activated` / `activated_at` from completed activations and
/// decode permissions back to integers. An explicit deny cannot be told
/// apart from "unset" anymore and comes back as `0`.
pub(crate) async fn reverse<C: ConnectionTrait>(db: &C) -> Result<(), ConversionError> {
    let backend = db.get_database_backend();

    let rows = db
        .query_all(
            backend.build(
                &Query::select()
                    .columns([Users::Id, Users::Permissions])
                    .from(Users::Table)
                    .order_by(Users::Id, Order::Asc)
                    .to_owned(),
            ),
        )
        .await?;

    let mut activated = 0usize;
    for row in &rows {
        let user_id: i32 = row.try_get("", "id")?;
        let stored: Option<String> = row.try_get("", "permissions")?;

        let completed = find_id(
            db,
            &Query::select()
                .column(Activations::Id)
                .from(Activations::Table)
                .and_where(Expr::col(Activations::UserId).eq(user_id))
                .and_where(Expr::col(Activations::Completed).eq(true))
                .order_by(Activations::Id, Order::Asc)
                .limit(1)
                .to_owned(),
        )
        .await?;

        let decoded = permissions::decode(&permissions::parse(stored.as_deref())?);

        let mut update = Query::update();
        update
            .table(Users::Table)
            .value(Users::Permissions, permissions::to_column(&decoded)?)
            .and_where(Expr::col(Users::Id).eq(user_id));
        match completed {
            Some(activation_id) => {
                update.value(Users::Activated, true).value(
                    Users::ActivatedAt,
                    Expr::cust_with_values(
                        "(SELECT completed_at FROM activations WHERE id = ?)",
                        [activation_id],
                    ),
                );
                activated += 1;
            }
            None => {
                update
                    .value(Users::Activated, false)
                    .value(Users::ActivatedAt, Option::<DateTimeUtc>::None);
            }
        }
        db.execute(backend.build(&update)).await?;
    }

    tracing::info!(users = rows.len(), activated, "restored Sentry users");
    Ok(())
}
