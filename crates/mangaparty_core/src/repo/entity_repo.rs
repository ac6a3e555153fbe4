//! Entity repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Create, read, update and delete entities across the root table and its
//!   layer tables.
//! - Hydrate entities in batches: one root query plus one query per layer.
//! - Provide keyset pagination ordered by creation time.
//!
//! # Invariants
//! - The root row and every layer row of an entity are written in one
//!   IMMEDIATE transaction, parent layer first.
//! - The supplied layer set must equal `layers_for(kind)` before any write.
//! - A root row without an expected layer row is reported as
//!   `CorruptEntity`, never hydrated partially.
//! - Listing order is `created_at DESC, id DESC`.

use super::layer_sql::{decode_list, insert_layer, load_layer_rows, text_list, update_layer};
use super::{parse_uuid, placeholders, RepoError, RepoResult, ID_CHUNK_SIZE};
use crate::db::migrations::ensure_current_version;
use crate::logging::{EventLine, EventStatus};
use crate::model::entity::{
    CreatedEntity, Entity, EntityUpdate, LayerAttributes, NewEntity, Resource, ResourceId,
};
use crate::model::kind::{EntityKind, Layer};
use crate::registry::layers_for;
use log::error;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction,
    TransactionBehavior,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

const RESOURCE_SELECT_SQL: &str = "SELECT
    id,
    kind,
    note,
    created_at,
    updated_at
FROM mp_res";

/// Current time in epoch milliseconds, evaluated by SQLite.
pub(crate) const NOW_MS_SQL: &str =
    "CAST((julianday('now') - 2440587.5) * 86400000 AS INTEGER)";

/// Opaque position in a creation-time ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    created_at: i64,
    id: ResourceId,
}

impl PageCursor {
    /// Cursor positioned right after `resource`.
    pub fn after(resource: &Resource) -> Self {
        Self {
            created_at: resource.created_at,
            id: resource.id,
        }
    }

    /// Encodes the cursor for transport.
    pub fn to_token(&self) -> String {
        format!("{}:{}", self.created_at, self.id)
    }

    /// Decodes a token produced by `to_token`.
    pub fn from_token(token: &str) -> RepoResult<Self> {
        let invalid = || RepoError::InvalidCursor(token.to_string());
        let (created_at, id) = token.trim().split_once(':').ok_or_else(invalid)?;
        let created_at = created_at.parse::<i64>().map_err(|_| invalid())?;
        let id = Uuid::parse_str(id).map_err(|_| invalid())?;
        Ok(Self { created_at, id })
    }
}

/// Query options for listing entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityListQuery {
    /// `None` lists every kind.
    pub kind: Option<EntityKind>,
    /// Resume after this position; `None` starts from the newest entity.
    pub cursor: Option<PageCursor>,
    /// Page size; callers normalize it (see `CoreConfig::page_size`).
    pub limit: u32,
}

/// One listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPage {
    pub items: Vec<Entity>,
    /// Present only when more entities follow.
    pub next_cursor: Option<PageCursor>,
}

/// Repository interface for multi-layer entity operations.
pub trait EntityRepository {
    fn create_entity(&self, entity: &NewEntity) -> RepoResult<CreatedEntity>;
    fn get_entity(&self, id: ResourceId) -> RepoResult<Entity>;
    /// Batched hydration; preserves input order and fails on the first absent id.
    fn get_entities(&self, ids: &[ResourceId]) -> RepoResult<Vec<Entity>>;
    /// Loads only the root discriminator, if the entity exists.
    fn entity_kind(&self, id: ResourceId) -> RepoResult<Option<EntityKind>>;
    fn update_entity(&self, id: ResourceId, update: &EntityUpdate) -> RepoResult<()>;
    fn delete_entity(&self, id: ResourceId) -> RepoResult<()>;
    fn list_entities(&self, query: &EntityListQuery) -> RepoResult<EntityPage>;
}

/// SQLite-backed entity repository.
pub struct SqliteEntityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntityRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_current_version(conn)?;
        Ok(Self { conn })
    }
}

impl EntityRepository for SqliteEntityRepository<'_> {
    fn create_entity(&self, entity: &NewEntity) -> RepoResult<CreatedEntity> {
        let ordered = ordered_layers(entity.kind, &entity.layers)?;
        for attrs in &ordered {
            attrs.validate()?;
        }
        let notes = text_list(&entity.notes)?;
        let id = Uuid::new_v4();

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let created_at: i64 = tx.query_row(
            "INSERT INTO mp_res (id, kind, note)
             VALUES (?1, ?2, ?3)
             RETURNING created_at;",
            params![id.to_string(), entity.kind.as_str(), notes],
            |row| row.get(0),
        )?;
        for attrs in ordered {
            insert_layer(&tx, id, attrs)?;
        }
        tx.commit()?;

        Ok(CreatedEntity { id, created_at })
    }

    fn get_entity(&self, id: ResourceId) -> RepoResult<Entity> {
        let resource = load_resource(self.conn, id)?.ok_or(RepoError::NotFound(id))?;
        let mut entities = hydrate(self.conn, vec![resource])?;
        entities.pop().ok_or(RepoError::NotFound(id))
    }

    fn get_entities(&self, ids: &[ResourceId]) -> RepoResult<Vec<Entity>> {
        let unique = ids.iter().copied().collect::<BTreeSet<_>>();
        let unique = unique.into_iter().collect::<Vec<_>>();
        let mut resources = load_resources(self.conn, &unique)?;

        let mut ordered = Vec::with_capacity(unique.len());
        for id in &unique {
            let resource = resources.remove(id).ok_or(RepoError::NotFound(*id))?;
            ordered.push(resource);
        }
        let by_id = hydrate(self.conn, ordered)?
            .into_iter()
            .map(|entity| (entity.id(), entity))
            .collect::<HashMap<_, _>>();

        ids.iter()
            .map(|id| by_id.get(id).cloned().ok_or(RepoError::NotFound(*id)))
            .collect()
    }

    fn entity_kind(&self, id: ResourceId) -> RepoResult<Option<EntityKind>> {
        resource_kind(self.conn, id)
    }

    fn update_entity(&self, id: ResourceId, update: &EntityUpdate) -> RepoResult<()> {
        for attrs in &update.layers {
            attrs.validate()?;
        }
        let notes = update.notes.as_deref().map(text_list).transpose()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let kind = resource_kind(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        let expected = layers_for(kind);
        let mut seen = BTreeSet::new();
        for attrs in &update.layers {
            let layer = attrs.layer();
            if !expected.contains(&layer) || !seen.insert(layer) {
                return Err(RepoError::LayerMismatch {
                    kind,
                    expected: expected.to_vec(),
                    supplied: update.layers.iter().map(LayerAttributes::layer).collect(),
                });
            }
        }

        for attrs in &update.layers {
            if update_layer(&tx, id, attrs)? == 0 {
                error!(
                    "{}",
                    EventLine::new("entity_update", "repo", EventStatus::Error)
                        .error_code("corrupt_entity")
                        .field("id", id)
                        .field("layer", attrs.layer())
                );
                return Err(RepoError::CorruptEntity {
                    id,
                    missing_layer: attrs.layer(),
                });
            }
        }
        tx.execute(
            &format!(
                "UPDATE mp_res
                 SET note = COALESCE(?2, note),
                     updated_at = {NOW_MS_SQL}
                 WHERE id = ?1;"
            ),
            params![id.to_string(), notes],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_entity(&self, id: ResourceId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM mp_res WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn list_entities(&self, query: &EntityListQuery) -> RepoResult<EntityPage> {
        let limit = query.limit.max(1);
        let mut sql = format!("{RESOURCE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(kind) = query.kind {
            sql.push_str(" AND kind = ?");
            bind_values.push(Value::Text(kind.as_str().to_string()));
        }

        if let Some(cursor) = query.cursor {
            sql.push_str(" AND (created_at < ? OR (created_at = ? AND id < ?))");
            bind_values.push(Value::Integer(cursor.created_at));
            bind_values.push(Value::Integer(cursor.created_at));
            bind_values.push(Value::Text(cursor.id.to_string()));
        }

        // One extra row tells whether another page exists.
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit) + 1));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut resources = Vec::new();
        while let Some(row) = rows.next()? {
            resources.push(parse_resource_row(row)?);
        }

        let has_more = resources.len() > limit as usize;
        resources.truncate(limit as usize);
        let next_cursor = if has_more {
            resources.last().map(PageCursor::after)
        } else {
            None
        };

        Ok(EntityPage {
            items: hydrate(self.conn, resources)?,
            next_cursor,
        })
    }
}

/// Loads the root discriminator of one resource.
pub(crate) fn resource_kind(conn: &Connection, id: ResourceId) -> RepoResult<Option<EntityKind>> {
    let value: Option<String> = conn
        .query_row(
            "SELECT kind FROM mp_res WHERE id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    match value {
        None => Ok(None),
        Some(text) => EntityKind::parse(&text)
            .map(Some)
            .ok_or(RepoError::UnknownKind(text)),
    }
}

/// Orders supplied layers along `layers_for(kind)`, rejecting any deviation.
fn ordered_layers(
    kind: EntityKind,
    supplied: &[LayerAttributes],
) -> RepoResult<Vec<&LayerAttributes>> {
    let expected = layers_for(kind);
    let mismatch = || RepoError::LayerMismatch {
        kind,
        expected: expected.to_vec(),
        supplied: supplied.iter().map(LayerAttributes::layer).collect(),
    };
    if supplied.len() != expected.len() {
        return Err(mismatch());
    }

    let mut ordered = Vec::with_capacity(expected.len());
    for layer in expected {
        let mut matching = supplied.iter().filter(|attrs| attrs.layer() == *layer);
        match (matching.next(), matching.next()) {
            (Some(attrs), None) => ordered.push(attrs),
            _ => return Err(mismatch()),
        }
    }
    Ok(ordered)
}

fn load_resource(conn: &Connection, id: ResourceId) -> RepoResult<Option<Resource>> {
    let mut stmt = conn.prepare(&format!("{RESOURCE_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_resource_row(row)?));
    }
    Ok(None)
}

fn load_resources(
    conn: &Connection,
    ids: &[ResourceId],
) -> RepoResult<HashMap<ResourceId, Resource>> {
    let mut found = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(ID_CHUNK_SIZE) {
        let sql = format!(
            "{RESOURCE_SELECT_SQL} WHERE id IN ({});",
            placeholders(chunk.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(chunk.iter().map(|id| id.to_string())))?;
        while let Some(row) = rows.next()? {
            let resource = parse_resource_row(row)?;
            found.insert(resource.id, resource);
        }
    }
    Ok(found)
}

/// Merges root rows with their layer rows, one query per involved layer.
fn hydrate(conn: &Connection, resources: Vec<Resource>) -> RepoResult<Vec<Entity>> {
    let mut ids_by_layer: BTreeMap<Layer, Vec<ResourceId>> = BTreeMap::new();
    for resource in &resources {
        for layer in layers_for(resource.kind) {
            ids_by_layer.entry(*layer).or_default().push(resource.id);
        }
    }

    let mut rows_by_layer = HashMap::with_capacity(ids_by_layer.len());
    for (layer, ids) in ids_by_layer {
        rows_by_layer.insert(layer, load_layer_rows(conn, layer, &ids)?);
    }

    let mut entities = Vec::with_capacity(resources.len());
    for resource in resources {
        let chain = layers_for(resource.kind);
        let mut layers = Vec::with_capacity(chain.len());
        for layer in chain {
            let attrs = rows_by_layer
                .get_mut(layer)
                .and_then(|rows| rows.remove(&resource.id));
            match attrs {
                Some(attrs) => layers.push(attrs),
                None => {
                    error!(
                        "{}",
                        EventLine::new("entity_hydrate", "repo", EventStatus::Error)
                            .error_code("corrupt_entity")
                            .field("id", resource.id)
                            .field("kind", resource.kind)
                            .field("layer", layer)
                    );
                    return Err(RepoError::CorruptEntity {
                        id: resource.id,
                        missing_layer: *layer,
                    });
                }
            }
        }
        entities.push(Entity { resource, layers });
    }
    Ok(entities)
}

fn parse_resource_row(row: &Row<'_>) -> RepoResult<Resource> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "mp_res.id")?;

    let kind_text: String = row.get("kind")?;
    let kind = EntityKind::parse(&kind_text).ok_or(RepoError::UnknownKind(kind_text))?;

    let note_text: String = row.get("note")?;
    let notes = decode_list(&note_text, "mp_res", "note")?;

    Ok(Resource {
        id,
        kind,
        notes,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
