use mangaparty_core::db::migrations::latest_version;
use mangaparty_core::db::{open_db, open_db_in_memory, open_store, DbError};
use mangaparty_core::{
    CoreConfig, EntityKind, Layer, RepoError, SqliteEntityRepository,
    SqliteRelationshipRepository,
};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "mp_res");
    assert_table_exists(&conn, "mp_rel");
    for kind in EntityKind::ALL {
        assert_table_exists(&conn, kind.own_layer().table());
    }
    assert_eq!(Layer::Resource.table(), "mp_res");
}

#[test]
fn returned_connections_enforce_foreign_keys() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mangaparty.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "mp_rel");

    let journal_mode: String = conn_second
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode.to_ascii_lowercase(), "wal");
}

#[test]
fn open_store_uses_configured_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("configured.db");
    let config = CoreConfig {
        db_path: Some(path.clone()),
        ..CoreConfig::default()
    };

    let conn = open_store(&config).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert!(path.exists());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn repositories_reject_unmigrated_connections() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqliteEntityRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        RepoError::Storage(DbError::UninitializedSchema {
            actual_version: 0,
            ..
        })
    ));
    assert!(!err.is_retryable());
    assert!(SqliteRelationshipRepository::try_new(&conn).is_err());
}

#[test]
fn relationship_kind_check_rejects_unknown_values() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO mp_res (id, kind) VALUES ('a', 'work'), ('b', 'work');",
        [],
    )
    .unwrap();

    let inserted = conn.execute(
        "INSERT INTO mp_rel (id, source_id, target_id, rel_type)
         VALUES ('r', 'a', 'b', 'work_befriends');",
        [],
    );
    assert!(inserted.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
