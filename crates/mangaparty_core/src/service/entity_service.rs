//! Entity use-case service.
//!
//! # Responsibility
//! - Provide stable entity CRUD entry points for core callers.
//! - Resolve string discriminators against the type registry.
//! - Apply page size policy and expose lazy listing.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Log lines carry ids, kinds and counts only, never attribute values.

use super::{log_outcome, outcome_line};
use crate::config::CoreConfig;
use crate::logging::{EventLine, EventStatus};
use crate::model::entity::{
    CreatedEntity, Entity, EntityUpdate, LayerAttributes, NewEntity, ResourceId,
};
use crate::model::kind::EntityKind;
use crate::registry::parse_entity_kind;
use crate::repo::entity_repo::{EntityListQuery, EntityPage, EntityRepository, PageCursor};
use crate::repo::RepoResult;
use log::debug;
use std::collections::VecDeque;
use std::time::Instant;

/// Use-case service wrapper for entity operations.
pub struct EntityService<R: EntityRepository> {
    repo: R,
    config: CoreConfig,
}

impl<R: EntityRepository> EntityService<R> {
    /// Creates a service with default paging policy.
    pub fn new(repo: R) -> Self {
        Self::with_config(repo, &CoreConfig::default())
    }

    /// Creates a service using paging knobs from `config`.
    pub fn with_config(repo: R, config: &CoreConfig) -> Self {
        Self {
            repo,
            config: config.clone(),
        }
    }

    /// Creates one entity with its full layer chain.
    pub fn create_entity(&self, entity: &NewEntity) -> RepoResult<CreatedEntity> {
        let started_at = Instant::now();
        let result = self.repo.create_entity(entity);
        let mut line = outcome_line("entity_create", started_at, &result)
            .field("kind", entity.kind)
            .field("layers", entity.layers.len());
        if let Ok(created) = &result {
            line = line.field("id", created.id);
        }
        log_outcome(&result, line);
        result
    }

    /// Creates an entity from a persisted-form kind discriminator.
    ///
    /// # Contract
    /// - Unknown `kind` returns `UnknownKind` without touching storage.
    pub fn create_entity_of_kind(
        &self,
        kind: &str,
        notes: Vec<String>,
        layers: Vec<LayerAttributes>,
    ) -> RepoResult<CreatedEntity> {
        let kind = parse_entity_kind(kind)?;
        self.create_entity(&NewEntity::new(kind, layers).with_notes(notes))
    }

    pub fn get_entity(&self, id: ResourceId) -> RepoResult<Entity> {
        self.repo.get_entity(id)
    }

    /// Hydrates many entities in one batch, preserving input order.
    pub fn get_entities(&self, ids: &[ResourceId]) -> RepoResult<Vec<Entity>> {
        self.repo.get_entities(ids)
    }

    /// Replaces attribute values of the supplied layers.
    ///
    /// Returns repository-level not-found, mismatch or validation errors unchanged.
    pub fn update_entity(&self, id: ResourceId, update: &EntityUpdate) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.repo.update_entity(id, update);
        let line = outcome_line("entity_update", started_at, &result)
            .field("id", id)
            .field("layers", update.layers.len());
        log_outcome(&result, line);
        result
    }

    /// Deletes an entity; its layers and incident edges go with it.
    pub fn delete_entity(&self, id: ResourceId) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.repo.delete_entity(id);
        log_outcome(
            &result,
            outcome_line("entity_delete", started_at, &result).field("id", id),
        );
        result
    }

    /// Lists one page, newest first.
    ///
    /// `limit = None` or `0` uses the configured default; larger values are
    /// clamped to the configured maximum.
    pub fn list_entities(
        &self,
        kind: Option<EntityKind>,
        cursor: Option<PageCursor>,
        limit: Option<u32>,
    ) -> RepoResult<EntityPage> {
        let query = EntityListQuery {
            kind,
            cursor,
            limit: self.config.page_size(limit),
        };
        let page = self.repo.list_entities(&query)?;
        debug!(
            "{}",
            EventLine::new("entity_list", "service", EventStatus::Ok)
                .field("kind", kind.map_or("*", EntityKind::as_str))
                .field("limit", query.limit)
                .field("items", page.items.len())
                .field("has_more", page.next_cursor.is_some())
        );
        Ok(page)
    }

    /// Same as `list_entities` with a transport cursor token.
    pub fn list_entities_after(
        &self,
        kind: Option<EntityKind>,
        cursor_token: Option<&str>,
        limit: Option<u32>,
    ) -> RepoResult<EntityPage> {
        let cursor = cursor_token.map(PageCursor::from_token).transpose()?;
        self.list_entities(kind, cursor, limit)
    }

    /// Lazily walks every entity (of `kind`, if given), page by page.
    pub fn listing(&self, kind: Option<EntityKind>) -> EntityListing<'_, R> {
        EntityListing {
            repo: &self.repo,
            kind,
            page_size: self.config.default_page_size,
            cursor: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }
}

/// Lazy entity iterator fetching one page per refill.
///
/// Yields one `Err` and then stops if a page fetch fails.
pub struct EntityListing<'repo, R: EntityRepository> {
    repo: &'repo R,
    kind: Option<EntityKind>,
    page_size: u32,
    cursor: Option<PageCursor>,
    buffer: VecDeque<Entity>,
    exhausted: bool,
}

impl<R: EntityRepository> Iterator for EntityListing<'_, R> {
    type Item = RepoResult<Entity>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entity) = self.buffer.pop_front() {
                return Some(Ok(entity));
            }
            if self.exhausted {
                return None;
            }

            let query = EntityListQuery {
                kind: self.kind,
                cursor: self.cursor,
                limit: self.page_size,
            };
            match self.repo.list_entities(&query) {
                Ok(page) => {
                    self.exhausted = page.next_cursor.is_none();
                    self.cursor = page.next_cursor;
                    self.buffer.extend(page.items);
                }
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
