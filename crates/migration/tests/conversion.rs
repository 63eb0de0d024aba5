use std::collections::BTreeMap;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};

use migration::{Migrator, MigratorTrait, permissions};

mod common;
use common::*;

struct Seeded {
    admin: i32,
    user: i32,
    pending: i32,
    admins: i32,
    editors: i32,
}

async fn seeded_db() -> (DatabaseConnection, Seeded) {
    let db = legacy_db().await;

    let admin = insert_user(
        &db,
        "admin@admin.com",
        Some(r#"{"superuser":1}"#),
        Some("2019-06-01 10:00:00"),
    )
    .await;
    let user = insert_user(
        &db,
        "user@user.com",
        Some(r#"{"violin.play":-1,"blog":1}"#),
        Some("2020-01-01"),
    )
    .await;
    let pending = insert_user(&db, "pending@user.com", None, None).await;

    let admins = insert_group(&db, "Admins", Some(r#"{"admin":1}"#)).await;
    let editors = insert_group(
        &db,
        "Blog Editors",
        Some(r#"{"blog.edit":1,"blog.delete":0,"blog.publish":-1}"#),
    )
    .await;

    add_membership(&db, user, admins).await;
    add_membership(&db, admin, admins).await;
    add_membership(&db, admin, editors).await;

    (
        db,
        Seeded {
            admin,
            user,
            pending,
            admins,
            editors,
        },
    )
}

async fn stored_permissions(db: &DatabaseConnection, sql: &str, id: i32) -> Option<String> {
    db.query_one(Statement::from_sql_and_values(
        DbBackend::Sqlite,
        sql,
        vec![id.into()],
    ))
    .await
    .unwrap()
    .unwrap()
    .try_get("", "permissions")
    .unwrap()
}

#[tokio::test]
async fn converts_seeded_sentry_database() {
    let (db, seeded) = seeded_db().await;
    Migrator::up(&db, None).await.unwrap();

    let role = db
        .query_one(Statement::from_string(
            DbBackend::Sqlite,
            "SELECT id, slug, name, permissions FROM roles WHERE name = 'Admins'",
        ))
        .await
        .unwrap()
        .unwrap();
    let role_id: i32 = role.try_get("", "id").unwrap();
    let slug: String = role.try_get("", "slug").unwrap();
    let stored: Option<String> = role.try_get("", "permissions").unwrap();
    assert_eq!(slug, "admins");
    assert_eq!(
        permissions::parse(stored.as_deref()).unwrap(),
        BTreeMap::from([("admin".to_string(), true)])
    );

    assert_eq!(
        count(
            &db,
            "SELECT COUNT(*) FROM role_users WHERE user_id = ? AND role_id = ?",
            vec![seeded.user.into(), role_id.into()],
        )
        .await,
        1
    );

    let activation = db
        .query_one(Statement::from_sql_and_values(
            DbBackend::Sqlite,
            "SELECT completed, completed_at FROM activations WHERE user_id = ?",
            vec![seeded.user.into()],
        ))
        .await
        .unwrap()
        .unwrap();
    let completed: bool = activation.try_get("", "completed").unwrap();
    let completed_at: String = activation.try_get("", "completed_at").unwrap();
    assert!(completed);
    // The bare legacy date is stored as a full timestamp at midnight.
    assert_eq!(completed_at, "2020-01-01 00:00:00");

    assert!(!table_exists(&db, "groups").await);
    assert!(!table_exists(&db, "users_groups").await);
}

#[tokio::test]
async fn only_activated_users_get_one_completed_activation() {
    let (db, seeded) = seeded_db().await;
    Migrator::up(&db, None).await.unwrap();

    for user_id in [seeded.admin, seeded.user] {
        assert_eq!(
            count(
                &db,
                "SELECT COUNT(*) FROM activations WHERE user_id = ? AND completed = 1",
                vec![user_id.into()],
            )
            .await,
            1
        );
    }
    assert_eq!(
        count(
            &db,
            "SELECT COUNT(*) FROM activations WHERE user_id = ?",
            vec![seeded.pending.into()],
        )
        .await,
        0
    );

    let completed_at: String = db
        .query_one(Statement::from_sql_and_values(
            DbBackend::Sqlite,
            "SELECT completed_at FROM activations WHERE user_id = ?",
            vec![seeded.admin.into()],
        ))
        .await
        .unwrap()
        .unwrap()
        .try_get("", "completed_at")
        .unwrap();
    assert_eq!(completed_at, "2019-06-01 10:00:00");
}

#[tokio::test]
async fn user_permissions_become_booleans() {
    let (db, seeded) = seeded_db().await;
    Migrator::up(&db, None).await.unwrap();

    let stored =
        stored_permissions(&db, "SELECT permissions FROM users WHERE id = ?", seeded.user).await;
    assert_eq!(
        permissions::parse(stored.as_deref()).unwrap(),
        BTreeMap::from([
            ("blog".to_string(), true),
            ("violin.play".to_string(), false),
        ])
    );

    let stored =
        stored_permissions(&db, "SELECT permissions FROM users WHERE id = ?", seeded.pending)
            .await;
    assert_eq!(stored, None);
}

#[tokio::test]
async fn every_membership_maps_to_the_converted_role() {
    let (db, seeded) = seeded_db().await;
    Migrator::up(&db, None).await.unwrap();

    let editors_role = id_of(&db, "SELECT id FROM roles WHERE slug = ?", "blog-editors").await;
    let admins_role = id_of(&db, "SELECT id FROM roles WHERE slug = ?", "admins").await;

    let rows = db
        .query_all(Statement::from_string(
            DbBackend::Sqlite,
            "SELECT user_id, role_id FROM role_users ORDER BY user_id, role_id",
        ))
        .await
        .unwrap();
    let mut pairs: Vec<(i32, i32)> = rows
        .iter()
        .map(|row| {
            (
                row.try_get("", "user_id").unwrap(),
                row.try_get("", "role_id").unwrap(),
            )
        })
        .collect();
    pairs.sort();

    let mut expected = vec![
        (seeded.user, admins_role),
        (seeded.admin, admins_role),
        (seeded.admin, editors_role),
    ];
    expected.sort();
    assert_eq!(pairs, expected);
}

#[tokio::test]
async fn membership_of_unknown_group_aborts() {
    let (db, seeded) = seeded_db().await;
    add_membership(&db, seeded.pending, 99).await;

    let err = Migrator::up(&db, None).await.unwrap_err();
    assert!(
        err.to_string().contains("unknown group id 99"),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn groups_with_colliding_slugs_abort() {
    let (db, _) = seeded_db().await;
    insert_group(&db, "blog-editors", None).await;

    let err = Migrator::up(&db, None).await.unwrap_err();
    assert!(
        err.to_string().contains("both slugify to \"blog-editors\""),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn invalid_legacy_permissions_abort() {
    let (db, _) = seeded_db().await;
    insert_user(&db, "broken@user.com", Some("{not json"), None).await;

    assert!(Migrator::up(&db, None).await.is_err());
}

#[tokio::test]
async fn unreadable_activation_time_aborts() {
    let (db, _) = seeded_db().await;
    insert_user(&db, "broken@user.com", None, Some("last tuesday")).await;

    let err = Migrator::up(&db, None).await.unwrap_err();
    assert!(
        err.to_string().contains("unreadable activated_at \"last tuesday\""),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn existing_target_table_is_a_conflict() {
    let (db, _) = seeded_db().await;
    exec(&db, "CREATE TABLE roles (id INTEGER PRIMARY KEY)", vec![]).await;

    assert!(Migrator::up(&db, None).await.is_err());
}

#[tokio::test]
async fn reversal_restores_groups_and_activation_state() {
    let (db, seeded) = seeded_db().await;
    Migrator::up(&db, None).await.unwrap();
    Migrator::down(&db, Some(2)).await.unwrap();

    assert!(!table_exists(&db, "roles").await);
    assert!(!table_exists(&db, "activations").await);

    let admins = id_of(&db, "SELECT id FROM groups WHERE name = ?", "Admins").await;
    let editors = id_of(&db, "SELECT id FROM groups WHERE name = ?", "Blog Editors").await;
    assert_eq!(admins, seeded.admins);
    assert_eq!(editors, seeded.editors);

    let stored =
        stored_permissions(&db, "SELECT permissions FROM groups WHERE id = ?", admins).await;
    assert_eq!(
        permissions::parse_legacy(stored.as_deref()).unwrap(),
        BTreeMap::from([("admin".to_string(), 1)])
    );

    // -1 comes back as 0.
    let stored =
        stored_permissions(&db, "SELECT permissions FROM groups WHERE id = ?", editors).await;
    let restored = permissions::parse_legacy(stored.as_deref()).unwrap();
    assert_eq!(restored.get("blog.edit"), Some(&1));
    assert_eq!(restored.get("blog.delete"), Some(&0));
    assert_eq!(restored.get("blog.publish"), Some(&0));

    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM users_groups", vec![]).await,
        3
    );
    assert_eq!(
        count(
            &db,
            "SELECT COUNT(*) FROM users_groups WHERE user_id = ? AND group_id = ?",
            vec![seeded.user.into(), admins.into()],
        )
        .await,
        1
    );

    let row = db
        .query_one(Statement::from_sql_and_values(
            DbBackend::Sqlite,
            "SELECT activated, activated_at FROM users WHERE id = ?",
            vec![seeded.user.into()],
        ))
        .await
        .unwrap()
        .unwrap();
    let activated: bool = row.try_get("", "activated").unwrap();
    let activated_at: Option<String> = row.try_get("", "activated_at").unwrap();
    assert!(activated);
    assert_eq!(activated_at.as_deref(), Some("2020-01-01 00:00:00"));

    let row = db
        .query_one(Statement::from_sql_and_values(
            DbBackend::Sqlite,
            "SELECT activated, activated_at FROM users WHERE id = ?",
            vec![seeded.pending.into()],
        ))
        .await
        .unwrap()
        .unwrap();
    let activated: bool = row.try_get("", "activated").unwrap();
    let activated_at: Option<String> = row.try_get("", "activated_at").unwrap();
    assert!(!activated);
    assert_eq!(activated_at, None);
}

#[tokio::test]
async fn roles_sharing_a_name_abort_the_reversal() {
    let (db, _) = seeded_db().await;
    Migrator::up(&db, None).await.unwrap();
    exec(
        &db,
        "INSERT INTO roles (slug, name) VALUES ('admins-2', 'Admins')",
        vec![],
    )
    .await;
    let second = id_of(&db, "SELECT id FROM roles WHERE slug = ?", "admins-2").await;

    let err = Migrator::down(&db, Some(2)).await.unwrap_err();
    assert!(
        err.to_string()
            .contains(&format!("and {second} are both named \"Admins\"")),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn reversing_only_the_conversion_reuses_existing_groups() {
    let (db, seeded) = seeded_db().await;
    Migrator::up(&db, None).await.unwrap();
    Migrator::down(&db, Some(1)).await.unwrap();
    // Legacy tables are back, empty; undo the conversion as well.
    Migrator::down(&db, Some(1)).await.unwrap();
    Migrator::up(&db, Some(1)).await.unwrap();
    Migrator::down(&db, Some(1)).await.unwrap();

    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM groups", vec![]).await,
        2
    );
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM users_groups", vec![]).await,
        3
    );
    assert_eq!(
        id_of(&db, "SELECT id FROM groups WHERE name = ?", "Admins").await,
        seeded.admins
    );
}
