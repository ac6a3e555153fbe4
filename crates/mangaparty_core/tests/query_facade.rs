mod common;

use common::{create, open, sample_layers};
use mangaparty_core::{
    CreatedEntity, Direction, Entity, EntityKind, EntityListQuery, EntityPage, EntityRepository,
    EntityUpdate, GraphService, NewEntity, NewRelationship, QueryService, RelType, RepoError,
    RepoResult, ResourceId, SqliteEntityRepository, SqliteRelationshipRepository,
};
use rusqlite::Connection;
use std::cell::Cell;
use uuid::Uuid;

fn query(
    conn: &Connection,
) -> QueryService<SqliteEntityRepository<'_>, SqliteRelationshipRepository<'_>> {
    QueryService::new(
        SqliteEntityRepository::try_new(conn).unwrap(),
        SqliteRelationshipRepository::try_new(conn).unwrap(),
    )
}

fn link(conn: &Connection, source: ResourceId, rel_type: RelType, target: ResourceId) {
    GraphService::new(SqliteRelationshipRepository::try_new(conn).unwrap())
        .create_relationship(&NewRelationship::new(source, rel_type, target))
        .unwrap();
}

/// Counts hydration calls made through the entity repository.
struct CountingEntities<'a> {
    inner: SqliteEntityRepository<'a>,
    single_loads: &'a Cell<usize>,
    batch_loads: &'a Cell<usize>,
}

impl EntityRepository for CountingEntities<'_> {
    fn create_entity(&self, entity: &NewEntity) -> RepoResult<CreatedEntity> {
        self.inner.create_entity(entity)
    }

    fn get_entity(&self, id: ResourceId) -> RepoResult<Entity> {
        self.single_loads.set(self.single_loads.get() + 1);
        self.inner.get_entity(id)
    }

    fn get_entities(&self, ids: &[ResourceId]) -> RepoResult<Vec<Entity>> {
        self.batch_loads.set(self.batch_loads.get() + 1);
        self.inner.get_entities(ids)
    }

    fn entity_kind(&self, id: ResourceId) -> RepoResult<Option<EntityKind>> {
        self.inner.entity_kind(id)
    }

    fn update_entity(&self, id: ResourceId, update: &EntityUpdate) -> RepoResult<()> {
        self.inner.update_entity(id, update)
    }

    fn delete_entity(&self, id: ResourceId) -> RepoResult<()> {
        self.inner.delete_entity(id)
    }

    fn list_entities(&self, query: &EntityListQuery) -> RepoResult<EntityPage> {
        self.inner.list_entities(query)
    }
}

fn ids(entities: &[Entity]) -> Vec<ResourceId> {
    entities.iter().map(|entity| entity.id()).collect()
}

#[test]
fn works_created_by_hydrates_full_entities() {
    let conn = open();
    let person = create(&conn, EntityKind::Person);
    let work = create(&conn, EntityKind::Work);
    link(&conn, work, RelType::WorkCreatedBy, person);

    let query = query(&conn);
    let works = query.works_created_by(person).unwrap();
    assert_eq!(ids(&works), vec![work]);
    assert_eq!(works[0].kind(), EntityKind::Work);
    assert_eq!(works[0].layers, sample_layers(EntityKind::Work));

    let creators = query.creators_of(work).unwrap();
    assert_eq!(ids(&creators), vec![person]);
    assert_eq!(creators[0].layers, sample_layers(EntityKind::Person));
}

#[test]
fn related_checks_anchor_exists() {
    let conn = open();
    let query = query(&conn);
    let ghost = Uuid::new_v4();

    let err = query.works_created_by(ghost).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == ghost));
}

#[test]
fn related_checks_anchor_side_of_rule() {
    let conn = open();
    let tag = create(&conn, EntityKind::Tag);
    let query = query(&conn);

    let err = query.works_created_by(tag).unwrap_err();
    match err {
        RepoError::TypeMismatch {
            rel_type,
            source_kind,
            target_kind,
        } => {
            assert_eq!(rel_type, RelType::WorkCreatedBy);
            assert_eq!(source_kind, None);
            assert_eq!(target_kind, Some(EntityKind::Tag));
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = query.creators_of(tag).unwrap_err();
    assert!(matches!(
        err,
        RepoError::TypeMismatch {
            source_kind: Some(EntityKind::Tag),
            target_kind: None,
            ..
        }
    ));
}

#[test]
fn related_removes_duplicate_endpoints() {
    let conn = open();
    let work = create(&conn, EntityKind::Work);
    let first = create(&conn, EntityKind::Tag);
    let second = create(&conn, EntityKind::Tag);
    link(&conn, work, RelType::ResourceHasTag, first);
    link(&conn, work, RelType::ResourceHasTag, second);
    link(&conn, work, RelType::ResourceHasTag, first);

    let tags = query(&conn).tags_of(work).unwrap();
    let mut found = ids(&tags);
    found.sort();
    let mut expected = vec![first, second];
    expected.sort();
    assert_eq!(found, expected);
}

#[test]
fn tagged_with_accepts_any_resource_kind() {
    let conn = open();
    let tag = create(&conn, EntityKind::Tag);
    let work = create(&conn, EntityKind::Work);
    let person = create(&conn, EntityKind::Person);
    let file = create(&conn, EntityKind::File);
    for resource in [work, person, file] {
        link(&conn, resource, RelType::ResourceHasTag, tag);
    }

    let tagged = query(&conn).tagged_with(tag).unwrap();
    let mut kinds = tagged.iter().map(|entity| entity.kind()).collect::<Vec<_>>();
    kinds.sort_by_key(|kind| kind.as_str());
    assert_eq!(
        kinds,
        vec![EntityKind::File, EntityKind::Person, EntityKind::Work]
    );
}

#[test]
fn related_without_edges_is_empty() {
    let conn = open();
    let work = create(&conn, EntityKind::Work);

    let query = query(&conn);
    assert!(query.expressions_of(work).unwrap().is_empty());
    assert!(query
        .related(work, RelType::WorkHasPart, Direction::Outbound)
        .unwrap()
        .is_empty());
}

#[test]
fn work_tree_descends_three_levels() {
    let conn = open();
    let work = create(&conn, EntityKind::Work);
    let expression = create(&conn, EntityKind::Expression);
    let first_print = create(&conn, EntityKind::Manifestation);
    let reprint = create(&conn, EntityKind::Manifestation);
    let copy_a = create(&conn, EntityKind::Item);
    let copy_b = create(&conn, EntityKind::Item);

    link(&conn, expression, RelType::ExpressionRealizesWork, work);
    link(&conn, first_print, RelType::ManifestationEmbodiesExpression, expression);
    link(&conn, reprint, RelType::ManifestationEmbodiesExpression, expression);
    link(&conn, copy_a, RelType::ItemExemplifiesManifestation, first_print);
    link(&conn, copy_b, RelType::ItemExemplifiesManifestation, first_print);

    let query = query(&conn);
    let tree = query.work_tree(work).unwrap();
    assert_eq!(tree.work.id(), work);
    assert_eq!(tree.expressions.len(), 1);

    let branch = &tree.expressions[0];
    assert_eq!(branch.expression.id(), expression);
    assert_eq!(branch.manifestations.len(), 2);

    for manifestation in &branch.manifestations {
        let mut items = ids(&manifestation.items);
        items.sort();
        if manifestation.manifestation.id() == first_print {
            let mut expected = vec![copy_a, copy_b];
            expected.sort();
            assert_eq!(items, expected);
        } else {
            assert_eq!(manifestation.manifestation.id(), reprint);
            assert!(items.is_empty());
        }
    }

    assert_eq!(ids(&query.items_of(first_print).unwrap()).len(), 2);
    assert_eq!(ids(&query.manifestations_of(expression).unwrap()).len(), 2);
}

#[test]
fn work_tree_hydrates_once_per_level() {
    let conn = open();
    let work = create(&conn, EntityKind::Work);
    let original = create(&conn, EntityKind::Expression);
    let translation = create(&conn, EntityKind::Expression);
    let omnibus = create(&conn, EntityKind::Manifestation);
    let tankobon = create(&conn, EntityKind::Manifestation);
    let copy = create(&conn, EntityKind::Item);

    link(&conn, original, RelType::ExpressionRealizesWork, work);
    link(&conn, translation, RelType::ExpressionRealizesWork, work);
    link(&conn, tankobon, RelType::ManifestationEmbodiesExpression, original);
    link(&conn, omnibus, RelType::ManifestationEmbodiesExpression, original);
    link(&conn, omnibus, RelType::ManifestationEmbodiesExpression, translation);
    link(&conn, copy, RelType::ItemExemplifiesManifestation, omnibus);

    let single_loads = Cell::new(0);
    let batch_loads = Cell::new(0);
    let query = QueryService::new(
        CountingEntities {
            inner: SqliteEntityRepository::try_new(&conn).unwrap(),
            single_loads: &single_loads,
            batch_loads: &batch_loads,
        },
        SqliteRelationshipRepository::try_new(&conn).unwrap(),
    );
    let tree = query.work_tree(work).unwrap();

    assert_eq!(batch_loads.get(), 3);
    assert_eq!(single_loads.get(), 0);

    assert_eq!(tree.work.id(), work);
    let mut expressions = tree
        .expressions
        .iter()
        .map(|branch| branch.expression.id())
        .collect::<Vec<_>>();
    expressions.sort();
    let mut expected = vec![original, translation];
    expected.sort();
    assert_eq!(expressions, expected);

    // The shared omnibus hangs under both expressions with its item.
    for branch in &tree.expressions {
        let omnibus_branch = branch
            .manifestations
            .iter()
            .find(|manifestation| manifestation.manifestation.id() == omnibus)
            .unwrap();
        assert_eq!(ids(&omnibus_branch.items), vec![copy]);
        let expected_count = if branch.expression.id() == original { 2 } else { 1 };
        assert_eq!(branch.manifestations.len(), expected_count);
    }
}

#[test]
fn work_tree_without_expressions_loads_only_the_work() {
    let conn = open();
    let work = create(&conn, EntityKind::Work);
    let single_loads = Cell::new(0);
    let batch_loads = Cell::new(0);
    let query = QueryService::new(
        CountingEntities {
            inner: SqliteEntityRepository::try_new(&conn).unwrap(),
            single_loads: &single_loads,
            batch_loads: &batch_loads,
        },
        SqliteRelationshipRepository::try_new(&conn).unwrap(),
    );

    let tree = query.work_tree(work).unwrap();
    assert_eq!(tree.work.id(), work);
    assert!(tree.expressions.is_empty());
    assert_eq!(batch_loads.get(), 1);
}

#[test]
fn work_tree_rejects_non_work_anchor() {
    let conn = open();
    let person = create(&conn, EntityKind::Person);

    let err = query(&conn).work_tree(person).unwrap_err();
    assert!(matches!(err, RepoError::TypeMismatch { .. }));
}
