//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for entities and edges.
//! - Isolate SQLite query details from service orchestration.
//! - Own the shared error taxonomy of the entity store and the graph.
//!
//! # Invariants
//! - Validation failures are returned before any SQL mutation.
//! - Every multi-row write runs inside one IMMEDIATE transaction.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::entity::{ResourceId, ValidationError};
use crate::model::kind::{EntityKind, Layer};
use crate::model::relationship::RelType;
use crate::registry::UnknownKindError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod entity_repo;
mod layer_sql;
pub mod relationship_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error taxonomy shared by the entity store, the graph and the query façade.
#[derive(Debug)]
pub enum RepoError {
    /// Discriminator outside the closed catalog.
    UnknownKind(String),
    /// Entity or relationship id is absent.
    NotFound(Uuid),
    /// Edge endpoint does not exist.
    EndpointNotFound(ResourceId),
    /// Endpoint kinds violate the rule of `rel_type`.
    ///
    /// A side is `None` when only the other side was checked, as with a
    /// traversal anchor.
    TypeMismatch {
        rel_type: RelType,
        source_kind: Option<EntityKind>,
        target_kind: Option<EntityKind>,
    },
    /// Root row exists without an expected layer row.
    CorruptEntity {
        id: ResourceId,
        missing_layer: Layer,
    },
    /// Supplied layer set does not match the kind's layer chain.
    LayerMismatch {
        kind: EntityKind,
        expected: Vec<Layer>,
        supplied: Vec<Layer>,
    },
    Validation(ValidationError),
    /// Page cursor token cannot be decoded.
    InvalidCursor(String),
    /// Persisted value cannot be converted to the domain model.
    InvalidData(String),
    /// Store is busy, locked or failing at the I/O level.
    StorageUnavailable(DbError),
    /// Store rejected the statement: constraint abort, schema mismatch or
    /// malformed SQL. Retrying the same request fails the same way.
    Storage(DbError),
}

impl RepoError {
    /// Returns whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(err) if err.is_transient())
    }

    /// Stable machine-readable code for logs and transport mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownKind(_) => "unknown_kind",
            Self::NotFound(_) => "not_found",
            Self::EndpointNotFound(_) => "endpoint_not_found",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::CorruptEntity { .. } => "corrupt_entity",
            Self::LayerMismatch { .. } => "layer_mismatch",
            Self::Validation(_) => "validation",
            Self::InvalidCursor(_) => "invalid_cursor",
            Self::InvalidData(_) => "invalid_data",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::Storage(_) => "storage_failure",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownKind(value) => write!(f, "unknown kind `{value}`"),
            Self::NotFound(id) => write!(f, "not found: {id}"),
            Self::EndpointNotFound(id) => write!(f, "relationship endpoint not found: {id}"),
            Self::TypeMismatch {
                rel_type,
                source_kind,
                target_kind,
            } => write!(
                f,
                "relationship `{rel_type}` does not permit {} -> {}",
                kind_or_any(*source_kind),
                kind_or_any(*target_kind)
            ),
            Self::CorruptEntity { id, missing_layer } => write!(
                f,
                "entity {id} is missing its `{missing_layer}` layer row"
            ),
            Self::LayerMismatch {
                kind,
                expected,
                supplied,
            } => write!(
                f,
                "kind `{kind}` requires layers {} but got {}",
                join_layers(expected),
                join_layers(supplied)
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidCursor(token) => write!(f, "invalid page cursor `{token}`"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::StorageUnavailable(err) | Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<UnknownKindError> for RepoError {
    fn from(value: UnknownKindError) -> Self {
        Self::UnknownKind(value.0)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        if value.is_transient() {
            Self::StorageUnavailable(value)
        } else {
            Self::Storage(value)
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(DbError::Sqlite(value))
    }
}

fn kind_or_any(kind: Option<EntityKind>) -> &'static str {
    kind.map_or("*", EntityKind::as_str)
}

fn join_layers(layers: &[Layer]) -> String {
    let names = layers.iter().map(|layer| layer.as_str()).collect::<Vec<_>>();
    format!("[{}]", names.join(", "))
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

/// Builds `?, ?, ...` for an `IN (...)` list.
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Maximum bound ids per `IN (...)` statement.
pub(crate) const ID_CHUNK_SIZE: usize = 500;

#[cfg(test)]
mod tests {
    use super::{placeholders, RepoError};
    use crate::db::DbError;
    use crate::model::kind::{EntityKind, Layer};
    use crate::model::relationship::RelType;

    fn sqlite_failure(code: std::os::raw::c_int) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    #[test]
    fn lock_contention_is_retryable() {
        for code in [rusqlite::ffi::SQLITE_BUSY, rusqlite::ffi::SQLITE_LOCKED] {
            let err = RepoError::from(sqlite_failure(code));
            assert!(matches!(err, RepoError::StorageUnavailable(_)));
            assert!(err.is_retryable());
            assert_eq!(err.code(), "storage_unavailable");
        }
        assert!(RepoError::from(sqlite_failure(rusqlite::ffi::SQLITE_IOERR)).is_retryable());
    }

    #[test]
    fn permanent_store_failures_are_not_retryable() {
        let unmigrated = RepoError::from(DbError::UninitializedSchema {
            expected_version: 2,
            actual_version: 0,
        });
        assert!(matches!(unmigrated, RepoError::Storage(_)));
        assert!(!unmigrated.is_retryable());
        assert_eq!(unmigrated.code(), "storage_failure");

        let constraint = RepoError::from(sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT));
        assert!(!constraint.is_retryable());
        assert_eq!(constraint.code(), "storage_failure");

        let no_rows = RepoError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(!no_rows.is_retryable());
        assert!(!RepoError::UnknownKind("dragon".to_string()).is_retryable());
    }

    #[test]
    fn layer_mismatch_lists_both_chains() {
        let err = RepoError::LayerMismatch {
            kind: EntityKind::Person,
            expected: vec![Layer::Agent, Layer::Person],
            supplied: vec![Layer::Person],
        };
        assert_eq!(
            err.to_string(),
            "kind `person` requires layers [agent, person] but got [person]"
        );
    }

    #[test]
    fn type_mismatch_marks_unchecked_side() {
        let err = RepoError::TypeMismatch {
            rel_type: RelType::WorkCreatedBy,
            source_kind: Some(EntityKind::Person),
            target_kind: None,
        };
        assert_eq!(
            err.to_string(),
            "relationship `work_created_by` does not permit person -> *"
        );
    }

    #[test]
    fn placeholders_match_count() {
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(1), "?");
    }
}
