mod common;

use common::{count_rows, sample_entity};
use mangaparty_core::{
    open_db, EntityKind, EntityRepository, NewRelationship, RelType, RelationshipRepository,
    RepoError, SqliteEntityRepository, SqliteRelationshipRepository,
};
use std::thread;
use std::time::Duration;

const WRITERS: usize = 4;
const ENTITIES_PER_WRITER: usize = 25;

#[test]
fn concurrent_writers_on_separate_connections_all_commit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrent.db");
    let conn = open_db(&path).unwrap();

    let handles = (0..WRITERS)
        .map(|_| {
            let path = path.clone();
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let entities = SqliteEntityRepository::try_new(&conn).unwrap();
                let graph = SqliteRelationshipRepository::try_new(&conn).unwrap();
                let person = entities
                    .create_entity(&sample_entity(EntityKind::Person))
                    .unwrap();
                for _ in 0..ENTITIES_PER_WRITER {
                    let work = entities
                        .create_entity(&sample_entity(EntityKind::Work))
                        .unwrap();
                    graph
                        .create_relationship(&NewRelationship::new(
                            work.id,
                            RelType::WorkCreatedBy,
                            person.id,
                        ))
                        .unwrap();
                }
            })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.join().unwrap();
    }

    let expected_entities = (WRITERS * (ENTITIES_PER_WRITER + 1)) as i64;
    assert_eq!(count_rows(&conn, "mp_res"), expected_entities);
    assert_eq!(count_rows(&conn, "mp_person"), WRITERS as i64);
    assert_eq!(
        count_rows(&conn, "mp_rel"),
        (WRITERS * ENTITIES_PER_WRITER) as i64
    );
}

#[test]
fn edge_creation_racing_endpoint_delete_never_dangles() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");
    let conn = open_db(&path).unwrap();
    let entities = SqliteEntityRepository::try_new(&conn).unwrap();
    let person = entities
        .create_entity(&sample_entity(EntityKind::Person))
        .unwrap()
        .id;
    let works = (0..ENTITIES_PER_WRITER)
        .map(|_| {
            entities
                .create_entity(&sample_entity(EntityKind::Work))
                .unwrap()
                .id
        })
        .collect::<Vec<_>>();

    let linker = {
        let path = path.clone();
        thread::spawn(move || {
            let conn = open_db(&path).unwrap();
            let graph = SqliteRelationshipRepository::try_new(&conn).unwrap();
            for work in works {
                match graph.create_relationship(&NewRelationship::new(
                    work,
                    RelType::WorkCreatedBy,
                    person,
                )) {
                    Ok(_) | Err(RepoError::EndpointNotFound(_)) => {}
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
        })
    };
    let deleter = {
        let path = path.clone();
        thread::spawn(move || {
            let conn = open_db(&path).unwrap();
            SqliteEntityRepository::try_new(&conn)
                .unwrap()
                .delete_entity(person)
                .unwrap();
        })
    };
    linker.join().unwrap();
    deleter.join().unwrap();

    assert!(entities.entity_kind(person).unwrap().is_none());
    let dangling: i64 = conn
        .query_row(
            "SELECT COUNT(*)
             FROM mp_rel
             WHERE source_id NOT IN (SELECT id FROM mp_res)
                OR target_id NOT IN (SELECT id FROM mp_res);",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(dangling, 0);
    assert_eq!(count_rows(&conn, "mp_rel"), 0);
}

#[test]
fn write_lock_contention_is_retryable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contended.db");
    let holder = open_db(&path).unwrap();
    let conn = open_db(&path).unwrap();
    conn.busy_timeout(Duration::ZERO).unwrap();
    let entities = SqliteEntityRepository::try_new(&conn).unwrap();

    holder.execute_batch("BEGIN IMMEDIATE;").unwrap();
    let err = entities
        .create_entity(&sample_entity(EntityKind::Work))
        .unwrap_err();
    assert!(matches!(err, RepoError::StorageUnavailable(_)), "got {err:?}");
    assert_eq!(err.code(), "storage_unavailable");
    assert!(err.is_retryable());

    holder.execute_batch("COMMIT;").unwrap();
    let created = entities
        .create_entity(&sample_entity(EntityKind::Work))
        .unwrap();
    assert_eq!(entities.entity_kind(created.id).unwrap(), Some(EntityKind::Work));
    assert_eq!(count_rows(&conn, "mp_res"), 1);
}
