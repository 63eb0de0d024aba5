#![allow(dead_code)]

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement, Value};

use migration::{LegacyMigrator, MigratorTrait};

pub async fn legacy_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    LegacyMigrator::up(&db, None).await.unwrap();
    db
}

pub async fn exec(db: &DatabaseConnection, sql: &str, values: Vec<Value>) {
    db.execute(Statement::from_sql_and_values(DbBackend::Sqlite, sql, values))
        .await
        .unwrap();
}

pub async fn insert_user(
    db: &DatabaseConnection,
    email: &str,
    permissions: Option<&str>,
    activated_at: Option<&str>,
) -> i32 {
    exec(
        db,
        "INSERT INTO users (email, password, permissions, activated, activated_at) \
         VALUES (?, ?, ?, ?, ?)",
        vec![
            email.into(),
            "hash".into(),
            permissions.map(str::to_string).into(),
            activated_at.is_some().into(),
            activated_at.map(str::to_string).into(),
        ],
    )
    .await;
    id_of(db, "SELECT id FROM users WHERE email = ?", email).await
}

pub async fn insert_group(db: &DatabaseConnection, name: &str, permissions: Option<&str>) -> i32 {
    exec(
        db,
        "INSERT INTO groups (name, permissions) VALUES (?, ?)",
        vec![name.into(), permissions.map(str::to_string).into()],
    )
    .await;
    id_of(db, "SELECT id FROM groups WHERE name = ?", name).await
}

pub async fn add_membership(db: &DatabaseConnection, user_id: i32, group_id: i32) {
    exec(
        db,
        "INSERT INTO users_groups (user_id, group_id) VALUES (?, ?)",
        vec![user_id.into(), group_id.into()],
    )
    .await;
}

pub async fn id_of(db: &DatabaseConnection, sql: &str, key: &str) -> i32 {
    db.query_one(Statement::from_sql_and_values(
        DbBackend::Sqlite,
        sql,
        vec![key.into()],
    ))
    .await
    .unwrap()
    .unwrap()
    .try_get("", "id")
    .unwrap()
}

pub async fn count(db: &DatabaseConnection, sql: &str, values: Vec<Value>) -> i64 {
    db.query_one(Statement::from_sql_and_values(DbBackend::Sqlite, sql, values))
        .await
        .unwrap()
        .unwrap()
        .try_get_by_index(0)
        .unwrap()
}

pub async fn table_exists(db: &DatabaseConnection, table: &str) -> bool {
    count(
        db,
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        vec![table.into()],
    )
    .await
        > 0
}

/// Columns and indexes of `table`, in a stable order.
pub async fn schema(db: &DatabaseConnection, table: &str) -> Vec<String> {
    let mut out = Vec::new();

    let columns = db
        .query_all(Statement::from_string(
            DbBackend::Sqlite,
            format!("PRAGMA table_info('{table}')"),
        ))
        .await
        .unwrap();
    for row in columns {
        let name: String = row.try_get("", "name").unwrap();
        let ty: String = row.try_get("", "type").unwrap();
        let notnull: i32 = row.try_get("", "notnull").unwrap();
        let default: Option<String> = row.try_get("", "dflt_value").unwrap();
        let pk: i32 = row.try_get("", "pk").unwrap();
        out.push(format!(
            "column {name} {ty} notnull={notnull} default={default:?} pk={pk}"
        ));
    }

    let indexes = db
        .query_all(Statement::from_string(
            DbBackend::Sqlite,
            format!("PRAGMA index_list('{table}')"),
        ))
        .await
        .unwrap();
    for row in indexes {
        let name: String = row.try_get("", "name").unwrap();
        let unique: i32 = row.try_get("", "unique").unwrap();
        let cols = db
            .query_all(Statement::from_string(
                DbBackend::Sqlite,
                format!("PRAGMA index_info('{name}')"),
            ))
            .await
            .unwrap()
            .iter()
            .map(|col| col.try_get::<String>("", "name").unwrap())
            .collect::<Vec<_>>()
            .join(",");
        out.push(format!("index {name} unique={unique} on ({cols})"));
    }

    out.sort();
    out
}

pub async fn legacy_schema(db: &DatabaseConnection) -> Vec<Vec<String>> {
    let mut out = Vec::new();
    for table in ["users", "groups", "users_groups", "throttle"] {
        out.push(schema(db, table).await);
    }
    out
}
