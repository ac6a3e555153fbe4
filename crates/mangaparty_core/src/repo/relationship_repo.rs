//! Relationship repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist typed edges between entities after endpoint-kind checks.
//! - Serve keyset-batched edge scans for lazy traversal.
//!
//! # Invariants
//! - An edge row exists only if both endpoint kinds satisfy the rule of its
//!   relationship kind at insert time.
//! - Endpoint resolution, rule check and insert share one IMMEDIATE
//!   transaction, so an endpoint cannot vanish between check and write.
//! - Batches are ordered by edge id; `after` resumes strictly past it.

use super::entity_repo::resource_kind;
use super::{parse_uuid, RepoError, RepoResult};
use crate::db::migrations::ensure_current_version;
use crate::model::entity::ResourceId;
use crate::model::relationship::{
    Direction, Interval, NewRelationship, RelType, Relationship, RelationshipId,
};
use crate::registry::allowed_endpoint_kinds;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const RELATIONSHIP_SELECT_SQL: &str = "SELECT
    id,
    source_id,
    target_id,
    rel_type,
    valid_from,
    valid_until,
    note,
    created_at
FROM mp_rel";

/// Repository interface for typed edges.
pub trait RelationshipRepository {
    fn create_relationship(&self, relationship: &NewRelationship) -> RepoResult<Relationship>;
    fn get_relationship(&self, id: RelationshipId) -> RepoResult<Relationship>;
    fn delete_relationship(&self, id: RelationshipId) -> RepoResult<()>;
    /// Every edge incident to `anchor`, any kind, ordered by id.
    ///
    /// `None` returns both directions.
    fn relationships_of(
        &self,
        anchor: ResourceId,
        direction: Option<Direction>,
    ) -> RepoResult<Vec<Relationship>>;
    /// One traversal batch of at most `limit` edges with id greater than `after`.
    fn traverse_batch(
        &self,
        anchor: ResourceId,
        rel_type: RelType,
        direction: Direction,
        after: Option<RelationshipId>,
        limit: u32,
    ) -> RepoResult<Vec<Relationship>>;
}

/// SQLite-backed relationship repository.
pub struct SqliteRelationshipRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRelationshipRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_current_version(conn)?;
        Ok(Self { conn })
    }
}

impl RelationshipRepository for SqliteRelationshipRepository<'_> {
    fn create_relationship(&self, relationship: &NewRelationship) -> RepoResult<Relationship> {
        relationship.interval.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let source_kind = resource_kind(&tx, relationship.source_id)?
            .ok_or(RepoError::EndpointNotFound(relationship.source_id))?;
        let target_kind = resource_kind(&tx, relationship.target_id)?
            .ok_or(RepoError::EndpointNotFound(relationship.target_id))?;

        if !allowed_endpoint_kinds(relationship.rel_type).permits(source_kind, target_kind) {
            return Err(RepoError::TypeMismatch {
                rel_type: relationship.rel_type,
                source_kind: Some(source_kind),
                target_kind: Some(target_kind),
            });
        }

        let id = Uuid::new_v4();
        let created_at: i64 = tx.query_row(
            "INSERT INTO mp_rel (
                id,
                source_id,
                target_id,
                rel_type,
                valid_from,
                valid_until,
                note
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING created_at;",
            params![
                id.to_string(),
                relationship.source_id.to_string(),
                relationship.target_id.to_string(),
                relationship.rel_type.as_str(),
                relationship.interval.valid_from,
                relationship.interval.valid_until,
                relationship.note.as_deref(),
            ],
            |row| row.get(0),
        )?;
        tx.commit()?;

        Ok(Relationship {
            id,
            source_id: relationship.source_id,
            target_id: relationship.target_id,
            rel_type: relationship.rel_type,
            interval: relationship.interval,
            note: relationship.note.clone(),
            created_at,
        })
    }

    fn get_relationship(&self, id: RelationshipId) -> RepoResult<Relationship> {
        let mut stmt = self
            .conn
            .prepare(&format!("{RELATIONSHIP_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return parse_relationship_row(row);
        }
        Err(RepoError::NotFound(id))
    }

    fn delete_relationship(&self, id: RelationshipId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM mp_rel WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn relationships_of(
        &self,
        anchor: ResourceId,
        direction: Option<Direction>,
    ) -> RepoResult<Vec<Relationship>> {
        let filter = match direction {
            Some(direction) => format!("{} = ?1", anchor_column(direction)),
            None => "(source_id = ?1 OR target_id = ?1)".to_string(),
        };
        let sql = format!("{RELATIONSHIP_SELECT_SQL} WHERE {filter} ORDER BY id ASC;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([anchor.to_string()])?;

        let mut relationships = Vec::new();
        while let Some(row) = rows.next()? {
            relationships.push(parse_relationship_row(row)?);
        }
        Ok(relationships)
    }

    fn traverse_batch(
        &self,
        anchor: ResourceId,
        rel_type: RelType,
        direction: Direction,
        after: Option<RelationshipId>,
        limit: u32,
    ) -> RepoResult<Vec<Relationship>> {
        let mut sql = format!(
            "{RELATIONSHIP_SELECT_SQL} WHERE {} = ? AND rel_type = ?",
            anchor_column(direction)
        );
        let mut bind_values = vec![
            Value::Text(anchor.to_string()),
            Value::Text(rel_type.as_str().to_string()),
        ];
        if let Some(after) = after {
            sql.push_str(" AND id > ?");
            bind_values.push(Value::Text(after.to_string()));
        }
        sql.push_str(" ORDER BY id ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit.max(1))));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut relationships = Vec::new();
        while let Some(row) = rows.next()? {
            relationships.push(parse_relationship_row(row)?);
        }
        Ok(relationships)
    }
}

/// Column holding the anchor for the given direction.
fn anchor_column(direction: Direction) -> &'static str {
    match direction {
        Direction::Outbound => "source_id",
        Direction::Inbound => "target_id",
    }
}

fn parse_relationship_row(row: &Row<'_>) -> RepoResult<Relationship> {
    let id_text: String = row.get("id")?;
    let source_text: String = row.get("source_id")?;
    let target_text: String = row.get("target_id")?;
    let rel_type_text: String = row.get("rel_type")?;
    let rel_type = RelType::parse(&rel_type_text).ok_or(RepoError::UnknownKind(rel_type_text))?;

    Ok(Relationship {
        id: parse_uuid(&id_text, "mp_rel.id")?,
        source_id: parse_uuid(&source_text, "mp_rel.source_id")?,
        target_id: parse_uuid(&target_text, "mp_rel.target_id")?,
        rel_type,
        interval: Interval::new(row.get("valid_from")?, row.get("valid_until")?),
        note: row.get("note")?,
        created_at: row.get("created_at")?,
    })
}
