//! Core domain logic for MangaParty.
//! This crate is the single source of truth for the bibliographic model,
//! its persistence and its relationship graph.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod registry;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, open_store, DbError};
pub use logging::{
    default_log_level, init_logging, logging_status, EventLine, EventStatus, LoggingError,
};
pub use model::entity::{
    CreatedEntity, Entity, EntityUpdate, LayerAttributes, NewEntity, Resource, ResourceId,
    ValidationError,
};
pub use model::kind::{EntityKind, Layer};
pub use model::relationship::{
    Direction, Interval, NewRelationship, RelType, Relationship, RelationshipId,
};
pub use registry::{
    all_entity_kinds, all_rel_types, allowed_endpoint_kinds, kind_satisfies, layers_for,
    parent_layer, parse_entity_kind, parse_rel_type, EndpointRule, UnknownKindError,
};
pub use repo::entity_repo::{
    EntityListQuery, EntityPage, EntityRepository, PageCursor, SqliteEntityRepository,
};
pub use repo::relationship_repo::{RelationshipRepository, SqliteRelationshipRepository};
pub use repo::{RepoError, RepoResult};
pub use service::entity_service::{EntityListing, EntityService};
pub use service::graph_service::{GraphService, Traversal};
pub use service::query_service::{ExpressionBranch, ManifestationBranch, QueryService, WorkTree};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
