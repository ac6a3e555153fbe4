//! Relationship (edge) domain model.
//!
//! # Responsibility
//! - Define the closed set of relationship kinds stored in `mp_rel.rel_type`.
//! - Define edge records and their creation request.
//!
//! # Invariants
//! - Edges are directed: `source_id` is the subject of the kind name, e.g. the
//!   Work in `work_created_by`.
//! - `valid_until` must not be earlier than `valid_from` when both are set.

use crate::model::entity::{ResourceId, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one edge.
pub type RelationshipId = Uuid;

/// Relationship kind between two resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelType {
    ExpressionRealizesWork,
    ManifestationEmbodiesExpression,
    ItemExemplifiesManifestation,
    WorkCreatedBy,
    ExpressionCreatedBy,
    ManifestationCreatedBy,
    ManifestationManufacturedBy,
    ManifestationDistributedBy,
    ItemOwnedBy,
    ItemModifiedBy,
    PersonMemberOf,
    CollectiveAgentPartOf,
    CollectiveAgentPrecededBy,
    AgentAssociatedWithPlace,
    ResourceHasAppellation,
    NomenDerivedFrom,
    NomenEquivalentTo,
    NomenInLanguage,
    WorkHasSubject,
    WorkHasPart,
    WorkPrecedes,
    WorkAccompanies,
    WorkInspiredBy,
    WorkTransformedFrom,
    ExpressionHasPart,
    ExpressionDerivedFrom,
    ExpressionInLanguage,
    ExpressionHasContentRating,
    ManifestationHasPart,
    ManifestationReproduces,
    ManifestationReproducesItem,
    ResourceHasPlace,
    ResourceHasTimeSpan,
    PlacePartOf,
    TimeSpanPartOf,
    ResourceHasType,
    ResourceHasStatus,
    ResourceHasTag,
    TagNarrowerThan,
    ResourceDepictedBy,
    ResourceHasLink,
    AgentHasRssFeed,
    ItemHasFile,
}

impl RelType {
    /// All relationship kinds in declaration order.
    pub const ALL: [RelType; 43] = [
        RelType::ExpressionRealizesWork,
        RelType::ManifestationEmbodiesExpression,
        RelType::ItemExemplifiesManifestation,
        RelType::WorkCreatedBy,
        RelType::ExpressionCreatedBy,
        RelType::ManifestationCreatedBy,
        RelType::ManifestationManufacturedBy,
        RelType::ManifestationDistributedBy,
        RelType::ItemOwnedBy,
        RelType::ItemModifiedBy,
        RelType::PersonMemberOf,
        RelType::CollectiveAgentPartOf,
        RelType::CollectiveAgentPrecededBy,
        RelType::AgentAssociatedWithPlace,
        RelType::ResourceHasAppellation,
        RelType::NomenDerivedFrom,
        RelType::NomenEquivalentTo,
        RelType::NomenInLanguage,
        RelType::WorkHasSubject,
        RelType::WorkHasPart,
        RelType::WorkPrecedes,
        RelType::WorkAccompanies,
        RelType::WorkInspiredBy,
        RelType::WorkTransformedFrom,
        RelType::ExpressionHasPart,
        RelType::ExpressionDerivedFrom,
        RelType::ExpressionInLanguage,
        RelType::ExpressionHasContentRating,
        RelType::ManifestationHasPart,
        RelType::ManifestationReproduces,
        RelType::ManifestationReproducesItem,
        RelType::ResourceHasPlace,
        RelType::ResourceHasTimeSpan,
        RelType::PlacePartOf,
        RelType::TimeSpanPartOf,
        RelType::ResourceHasType,
        RelType::ResourceHasStatus,
        RelType::ResourceHasTag,
        RelType::TagNarrowerThan,
        RelType::ResourceDepictedBy,
        RelType::ResourceHasLink,
        RelType::AgentHasRssFeed,
        RelType::ItemHasFile,
    ];

    /// Stable value stored in `mp_rel.rel_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExpressionRealizesWork => "expression_realizes_work",
            Self::ManifestationEmbodiesExpression => "manifestation_embodies_expression",
            Self::ItemExemplifiesManifestation => "item_exemplifies_manifestation",
            Self::WorkCreatedBy => "work_created_by",
            Self::ExpressionCreatedBy => "expression_created_by",
            Self::ManifestationCreatedBy => "manifestation_created_by",
            Self::ManifestationManufacturedBy => "manifestation_manufactured_by",
            Self::ManifestationDistributedBy => "manifestation_distributed_by",
            Self::ItemOwnedBy => "item_owned_by",
            Self::ItemModifiedBy => "item_modified_by",
            Self::PersonMemberOf => "person_member_of",
            Self::CollectiveAgentPartOf => "collective_agent_part_of",
            Self::CollectiveAgentPrecededBy => "collective_agent_preceded_by",
            Self::AgentAssociatedWithPlace => "agent_associated_with_place",
            Self::ResourceHasAppellation => "resource_has_appellation",
            Self::NomenDerivedFrom => "nomen_derived_from",
            Self::NomenEquivalentTo => "nomen_equivalent_to",
            Self::NomenInLanguage => "nomen_in_language",
            Self::WorkHasSubject => "work_has_subject",
            Self::WorkHasPart => "work_has_part",
            Self::WorkPrecedes => "work_precedes",
            Self::WorkAccompanies => "work_accompanies",
            Self::WorkInspiredBy => "work_inspired_by",
            Self::WorkTransformedFrom => "work_transformed_from",
            Self::ExpressionHasPart => "expression_has_part",
            Self::ExpressionDerivedFrom => "expression_derived_from",
            Self::ExpressionInLanguage => "expression_in_language",
            Self::ExpressionHasContentRating => "expression_has_content_rating",
            Self::ManifestationHasPart => "manifestation_has_part",
            Self::ManifestationReproduces => "manifestation_reproduces",
            Self::ManifestationReproducesItem => "manifestation_reproduces_item",
            Self::ResourceHasPlace => "resource_has_place",
            Self::ResourceHasTimeSpan => "resource_has_time_span",
            Self::PlacePartOf => "place_part_of",
            Self::TimeSpanPartOf => "time_span_part_of",
            Self::ResourceHasType => "resource_has_type",
            Self::ResourceHasStatus => "resource_has_status",
            Self::ResourceHasTag => "resource_has_tag",
            Self::TagNarrowerThan => "tag_narrower_than",
            Self::ResourceDepictedBy => "resource_depicted_by",
            Self::ResourceHasLink => "resource_has_link",
            Self::AgentHasRssFeed => "agent_has_rss_feed",
            Self::ItemHasFile => "item_has_file",
        }
    }

    /// Parses a stored or caller-supplied discriminator.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|rel_type| rel_type.as_str() == value)
    }
}

impl Display for RelType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which end of an edge the anchor entity sits on during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Anchor is the source; yields targets.
    Outbound,
    /// Anchor is the target; yields sources.
    Inbound,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Outbound => "outbound",
            Self::Inbound => "inbound",
        }
    }
}

/// Optional validity period of an edge, in epoch milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub valid_from: Option<i64>,
    /// Should be >= `valid_from` when both are set.
    pub valid_until: Option<i64>,
}

impl Interval {
    pub fn new(valid_from: Option<i64>, valid_until: Option<i64>) -> Self {
        Self {
            valid_from,
            valid_until,
        }
    }

    pub fn is_open(&self) -> bool {
        self.valid_from.is_none() && self.valid_until.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(valid_from), Some(valid_until)) = (self.valid_from, self.valid_until) {
            if valid_until < valid_from {
                return Err(ValidationError::IntervalEndBeforeStart {
                    valid_from,
                    valid_until,
                });
            }
        }
        Ok(())
    }
}

/// Request to link two existing resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelationship {
    pub source_id: ResourceId,
    pub target_id: ResourceId,
    pub rel_type: RelType,
    pub interval: Interval,
    pub note: Option<String>,
}

impl NewRelationship {
    /// Creates an open-ended edge request without note.
    pub fn new(source_id: ResourceId, rel_type: RelType, target_id: ResourceId) -> Self {
        Self {
            source_id,
            target_id,
            rel_type,
            interval: Interval::default(),
            note: None,
        }
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Persisted edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub source_id: ResourceId,
    pub target_id: ResourceId,
    pub rel_type: RelType,
    pub interval: Interval,
    pub note: Option<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl Relationship {
    /// Returns the endpoint opposite to `anchor` for the given direction.
    pub fn far_end(&self, direction: Direction) -> ResourceId {
        match direction {
            Direction::Outbound => self.target_id,
            Direction::Inbound => self.source_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Interval, RelType};
    use crate::model::entity::ValidationError;
    use std::collections::HashSet;

    #[test]
    fn stored_values_are_unique_and_parse_back() {
        let mut seen = HashSet::new();
        for rel_type in RelType::ALL {
            assert!(seen.insert(rel_type.as_str()), "duplicate {rel_type}");
            assert_eq!(RelType::parse(rel_type.as_str()), Some(rel_type));
        }
        assert_eq!(RelType::parse("created_by"), None);
    }

    #[test]
    fn interval_rejects_reversed_range() {
        let err = Interval::new(Some(200), Some(100)).validate().unwrap_err();
        assert!(matches!(
            err,
            ValidationError::IntervalEndBeforeStart {
                valid_from: 200,
                valid_until: 100
            }
        ));
        assert!(Interval::new(Some(100), Some(100)).validate().is_ok());
        assert!(Interval::new(None, Some(100)).validate().is_ok());
    }
}
