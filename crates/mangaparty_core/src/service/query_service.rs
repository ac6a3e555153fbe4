//! Read-side façade over the entity store and the relationship graph.
//!
//! # Responsibility
//! - Answer "entities related to X by R" with fully hydrated entities.
//! - Provide named bibliographic lookups and the work tree descent.
//!
//! # Invariants
//! - The anchor must exist (`NotFound`) and be allowed on its side of the
//!   rule (`TypeMismatch`) before any traversal runs.
//! - Far endpoints are hydrated with one batched call, first occurrence
//!   order, duplicates removed. `work_tree` hydrates once per level.

use crate::config::CoreConfig;
use crate::logging::{EventLine, EventStatus};
use crate::model::entity::{Entity, ResourceId};
use crate::model::relationship::{Direction, RelType};
use crate::registry::{allowed_endpoint_kinds, kind_satisfies};
use crate::repo::entity_repo::EntityRepository;
use crate::repo::relationship_repo::RelationshipRepository;
use crate::repo::{RepoError, RepoResult};
use crate::service::graph_service::GraphService;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Manifestation with its items.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestationBranch {
    pub manifestation: Entity,
    pub items: Vec<Entity>,
}

/// Expression with its manifestations.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionBranch {
    pub expression: Entity,
    pub manifestations: Vec<ManifestationBranch>,
}

/// Work → Expressions → Manifestations → Items.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkTree {
    pub work: Entity,
    pub expressions: Vec<ExpressionBranch>,
}

/// Composite read service.
pub struct QueryService<E: EntityRepository, G: RelationshipRepository> {
    entities: E,
    graph: GraphService<G>,
}

impl<E: EntityRepository, G: RelationshipRepository> QueryService<E, G> {
    pub fn new(entities: E, relationships: G) -> Self {
        Self::with_config(entities, relationships, &CoreConfig::default())
    }

    pub fn with_config(entities: E, relationships: G, config: &CoreConfig) -> Self {
        Self {
            entities,
            graph: GraphService::with_config(relationships, config),
        }
    }

    /// Entities reached from `anchor` over `rel_type` edges in `direction`.
    ///
    /// # Errors
    /// - `NotFound` when `anchor` does not exist.
    /// - `TypeMismatch` when the anchor kind cannot stand on the anchor side
    ///   of the rule.
    pub fn related(
        &self,
        anchor: ResourceId,
        rel_type: RelType,
        direction: Direction,
    ) -> RepoResult<Vec<Entity>> {
        let started_at = Instant::now();
        self.check_anchor(anchor, rel_type, direction)?;
        let ids = self.far_ends(anchor, rel_type, direction)?;
        let related = self.entities.get_entities(&ids)?;

        debug!(
            "{}",
            EventLine::new("query_related", "service", EventStatus::Ok)
                .field("rel_type", rel_type)
                .field("direction", direction.as_str())
                .field("items", related.len())
                .elapsed(started_at)
        );
        Ok(related)
    }

    /// Works whose creator is `agent`.
    pub fn works_created_by(&self, agent: ResourceId) -> RepoResult<Vec<Entity>> {
        self.related(agent, RelType::WorkCreatedBy, Direction::Inbound)
    }

    /// Agents credited as creators of `work`.
    pub fn creators_of(&self, work: ResourceId) -> RepoResult<Vec<Entity>> {
        self.related(work, RelType::WorkCreatedBy, Direction::Outbound)
    }

    pub fn expressions_of(&self, work: ResourceId) -> RepoResult<Vec<Entity>> {
        self.related(work, RelType::ExpressionRealizesWork, Direction::Inbound)
    }

    pub fn manifestations_of(&self, expression: ResourceId) -> RepoResult<Vec<Entity>> {
        self.related(
            expression,
            RelType::ManifestationEmbodiesExpression,
            Direction::Inbound,
        )
    }

    pub fn items_of(&self, manifestation: ResourceId) -> RepoResult<Vec<Entity>> {
        self.related(
            manifestation,
            RelType::ItemExemplifiesManifestation,
            Direction::Inbound,
        )
    }

    /// Tags attached to any resource.
    pub fn tags_of(&self, resource: ResourceId) -> RepoResult<Vec<Entity>> {
        self.related(resource, RelType::ResourceHasTag, Direction::Outbound)
    }

    /// Resources carrying `tag`.
    pub fn tagged_with(&self, tag: ResourceId) -> RepoResult<Vec<Entity>> {
        self.related(tag, RelType::ResourceHasTag, Direction::Inbound)
    }

    /// Three-level descent from a work to its items.
    ///
    /// Edges are walked per parent; entities are hydrated with one batched
    /// call per level (work and expressions, manifestations, items). A
    /// manifestation shared by two expressions appears under both.
    pub fn work_tree(&self, work: ResourceId) -> RepoResult<WorkTree> {
        let started_at = Instant::now();
        self.check_anchor(work, RelType::ExpressionRealizesWork, Direction::Inbound)?;

        let expression_ids =
            self.far_ends(work, RelType::ExpressionRealizesWork, Direction::Inbound)?;
        let manifestations_per_expression =
            self.children_of(&expression_ids, RelType::ManifestationEmbodiesExpression)?;
        let manifestation_ids = distinct(manifestations_per_expression.iter().flatten().copied());
        let items_per_manifestation =
            self.children_of(&manifestation_ids, RelType::ItemExemplifiesManifestation)?;
        let item_ids = distinct(items_per_manifestation.iter().flatten().copied());

        let mut top_ids = Vec::with_capacity(expression_ids.len() + 1);
        top_ids.push(work);
        top_ids.extend_from_slice(&expression_ids);
        let mut top = self.load_level(&top_ids)?;
        let manifestations = self.load_level(&manifestation_ids)?;
        let items = self.load_level(&item_ids)?;

        let items_by_manifestation = manifestation_ids
            .iter()
            .copied()
            .zip(items_per_manifestation.iter().map(Vec::as_slice))
            .collect::<HashMap<_, _>>();

        let mut expression_branches = Vec::with_capacity(expression_ids.len());
        for (expression_id, child_ids) in expression_ids.iter().zip(&manifestations_per_expression)
        {
            let mut manifestation_branches = Vec::with_capacity(child_ids.len());
            for manifestation_id in child_ids {
                let child_items = items_by_manifestation
                    .get(manifestation_id)
                    .copied()
                    .unwrap_or_default();
                manifestation_branches.push(ManifestationBranch {
                    manifestation: take(&manifestations, *manifestation_id)?,
                    items: child_items
                        .iter()
                        .map(|item_id| take(&items, *item_id))
                        .collect::<RepoResult<Vec<_>>>()?,
                });
            }
            expression_branches.push(ExpressionBranch {
                expression: take(&top, *expression_id)?,
                manifestations: manifestation_branches,
            });
        }
        let work = top.remove(&work).ok_or(RepoError::NotFound(work))?;

        debug!(
            "{}",
            EventLine::new("query_work_tree", "service", EventStatus::Ok)
                .field("id", work.id())
                .field("expressions", expression_ids.len())
                .field("manifestations", manifestation_ids.len())
                .field("items", item_ids.len())
                .elapsed(started_at)
        );
        Ok(WorkTree {
            work,
            expressions: expression_branches,
        })
    }

    /// Rejects anchors that are missing or cannot stand on the anchor side
    /// of `rel_type`.
    fn check_anchor(
        &self,
        anchor: ResourceId,
        rel_type: RelType,
        direction: Direction,
    ) -> RepoResult<()> {
        let anchor_kind = self
            .entities
            .entity_kind(anchor)?
            .ok_or(RepoError::NotFound(anchor))?;

        let rule = allowed_endpoint_kinds(rel_type);
        let (anchor_layer, source_kind, target_kind) = match direction {
            Direction::Outbound => (rule.source, Some(anchor_kind), None),
            Direction::Inbound => (rule.target, None, Some(anchor_kind)),
        };
        if kind_satisfies(anchor_kind, anchor_layer) {
            Ok(())
        } else {
            Err(RepoError::TypeMismatch {
                rel_type,
                source_kind,
                target_kind,
            })
        }
    }

    /// Far endpoint ids in traversal order, duplicates removed.
    fn far_ends(
        &self,
        anchor: ResourceId,
        rel_type: RelType,
        direction: Direction,
    ) -> RepoResult<Vec<ResourceId>> {
        let mut ids = Vec::new();
        let mut seen = HashSet::new();
        for id in self.graph.traverse(anchor, rel_type, direction) {
            let id = id?;
            if seen.insert(id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Inbound far ends of every parent, aligned with `parents`.
    fn children_of(
        &self,
        parents: &[ResourceId],
        rel_type: RelType,
    ) -> RepoResult<Vec<Vec<ResourceId>>> {
        parents
            .iter()
            .map(|parent| self.far_ends(*parent, rel_type, Direction::Inbound))
            .collect()
    }

    /// Hydrates one tree level in a single batch.
    fn load_level(&self, ids: &[ResourceId]) -> RepoResult<HashMap<ResourceId, Entity>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .entities
            .get_entities(ids)?
            .into_iter()
            .map(|entity| (entity.id(), entity))
            .collect())
    }
}

fn distinct(ids: impl IntoIterator<Item = ResourceId>) -> Vec<ResourceId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

fn take(level: &HashMap<ResourceId, Entity>, id: ResourceId) -> RepoResult<Entity> {
    level.get(&id).cloned().ok_or(RepoError::NotFound(id))
}
