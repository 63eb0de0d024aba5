//! Sentry → Sentinel schema conversion.
//!
//! Migrations run strictly in the declared order:
//!
//! 1. `sentry_schema`: the legacy baseline, so the whole sequence also runs
//!    on an empty database,
//! 2. `add_sentinel_schema`: create the Sentinel tables and convert the rows,
//! 3. `remove_sentry_schema`: drop what only Sentry used.
//!
//! [`Migrator`] extends `throttle` with `type` / `ip`; [`IpThrottleMigrator`]
//! additionally lets `throttle.user_id` be NULL and adds timestamps.
//! [`LegacyMigrator`] only creates the baseline and is used to build a
//! Sentry database to convert later.

pub use sea_orm_migration::prelude::*;

pub use error::ConversionError;
pub use m20160919_000103_add_sentinel_schema::ThrottleLayout;

pub mod permissions;
pub mod slug;

mod convert;
mod error;
mod m20121206_225921_sentry_schema;
mod m20160919_000103_add_sentinel_schema;
mod m20160919_000113_remove_sentry_schema;

fn migrations(throttle: ThrottleLayout) -> Vec<Box<dyn MigrationTrait>> {
    vec![
        Box::new(m20121206_225921_sentry_schema::Migration),
        Box::new(m20160919_000103_add_sentinel_schema::Migration::new(
            throttle,
        )),
        Box::new(m20160919_000113_remove_sentry_schema::Migration),
    ]
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        migrations(ThrottleLayout::Standard)
    }
}

pub struct IpThrottleMigrator;

#[async_trait::async_trait]
impl MigratorTrait for IpThrottleMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        migrations(ThrottleLayout::IpTracking)
    }
}

pub struct LegacyMigrator;

#[async_trait::async_trait]
impl MigratorTrait for LegacyMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20121206_225921_sentry_schema::Migration)]
    }
}
