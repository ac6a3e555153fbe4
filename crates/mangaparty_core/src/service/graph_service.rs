//! Relationship graph use-case service.
//!
//! # Responsibility
//! - Create and delete typed edges through the repository contract.
//! - Expose traversal as a lazy iterator over endpoint ids.
//!
//! # Invariants
//! - Traversal fetches at most `traversal_batch_size` edges per round-trip.
//! - A traversal from a nonexistent anchor yields nothing.

use super::{log_outcome, outcome_line};
use crate::config::CoreConfig;
use crate::model::entity::ResourceId;
use crate::model::relationship::{
    Direction, NewRelationship, RelType, Relationship, RelationshipId,
};
use crate::registry::parse_rel_type;
use crate::repo::relationship_repo::RelationshipRepository;
use crate::repo::RepoResult;
use std::collections::VecDeque;
use std::time::Instant;

/// Use-case service wrapper for the relationship graph.
pub struct GraphService<R: RelationshipRepository> {
    repo: R,
    batch_size: u32,
}

impl<R: RelationshipRepository> GraphService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_config(repo, &CoreConfig::default())
    }

    pub fn with_config(repo: R, config: &CoreConfig) -> Self {
        Self {
            repo,
            batch_size: config.traversal_batch_size.max(1),
        }
    }

    /// Links two existing entities after checking endpoint kinds.
    pub fn create_relationship(&self, relationship: &NewRelationship) -> RepoResult<Relationship> {
        let started_at = Instant::now();
        let result = self.repo.create_relationship(relationship);
        let mut line = outcome_line("relationship_create", started_at, &result)
            .field("rel_type", relationship.rel_type)
            .field("source_id", relationship.source_id)
            .field("target_id", relationship.target_id);
        if let Ok(created) = &result {
            line = line.field("id", created.id);
        }
        log_outcome(&result, line);
        result
    }

    /// Links two entities using a persisted-form relationship discriminator.
    pub fn link(
        &self,
        source_id: ResourceId,
        rel_type: &str,
        target_id: ResourceId,
    ) -> RepoResult<Relationship> {
        let rel_type = parse_rel_type(rel_type)?;
        self.create_relationship(&NewRelationship::new(source_id, rel_type, target_id))
    }

    pub fn get_relationship(&self, id: RelationshipId) -> RepoResult<Relationship> {
        self.repo.get_relationship(id)
    }

    pub fn delete_relationship(&self, id: RelationshipId) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.repo.delete_relationship(id);
        log_outcome(
            &result,
            outcome_line("relationship_delete", started_at, &result).field("id", id),
        );
        result
    }

    /// Every edge touching `anchor`; `None` covers both directions.
    pub fn relationships_of(
        &self,
        anchor: ResourceId,
        direction: Option<Direction>,
    ) -> RepoResult<Vec<Relationship>> {
        self.repo.relationships_of(anchor, direction)
    }

    /// Lazily yields the far endpoint of every `rel_type` edge at `anchor`.
    ///
    /// `Outbound` yields targets of edges whose source is `anchor`;
    /// `Inbound` yields sources of edges whose target is `anchor`.
    pub fn traverse(
        &self,
        anchor: ResourceId,
        rel_type: RelType,
        direction: Direction,
    ) -> Traversal<'_, R> {
        Traversal {
            repo: &self.repo,
            anchor,
            rel_type,
            direction,
            batch_size: self.batch_size,
            after: None,
            buffer: VecDeque::new(),
            exhausted: false,
        }
    }
}

/// Lazy traversal over endpoint ids, fetched in keyset batches by edge id.
///
/// Order is stable for a fixed snapshot. Yields one `Err` and then stops if a
/// batch fetch fails.
pub struct Traversal<'repo, R: RelationshipRepository> {
    repo: &'repo R,
    anchor: ResourceId,
    rel_type: RelType,
    direction: Direction,
    batch_size: u32,
    after: Option<RelationshipId>,
    buffer: VecDeque<ResourceId>,
    exhausted: bool,
}

impl<R: RelationshipRepository> Iterator for Traversal<'_, R> {
    type Item = RepoResult<ResourceId>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(id) = self.buffer.pop_front() {
                return Some(Ok(id));
            }
            if self.exhausted {
                return None;
            }

            let batch = match self.repo.traverse_batch(
                self.anchor,
                self.rel_type,
                self.direction,
                self.after,
                self.batch_size,
            ) {
                Ok(batch) => batch,
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            };

            // A short batch means the scan reached the end.
            self.exhausted = batch.len() < self.batch_size as usize;
            if let Some(last) = batch.last() {
                self.after = Some(last.id);
            }
            let direction = self.direction;
            self.buffer
                .extend(batch.iter().map(|edge| edge.far_end(direction)));
        }
    }
}
