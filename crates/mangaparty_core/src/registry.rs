//! Static catalog of kinds, layer chains and edge endpoint rules.
//!
//! # Responsibility
//! - Map each entity kind to its ordered layer chain.
//! - Map each relationship kind to its allowed (source, target) layers.
//! - Parse external discriminators into closed enums.
//!
//! # Invariants
//! - The catalog is immutable and lock-free; it is plain code and constants.
//! - `layers_for(kind)` never contains `Layer::Resource`; the root row is
//!   implied for every kind.
//! - Every layer except `Resource` has exactly one parent layer.

use crate::model::kind::{EntityKind, Layer};
use crate::model::relationship::RelType;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Discriminator that is not part of the closed catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKindError(pub String);

impl Display for UnknownKindError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown kind `{}`", self.0)
    }
}

impl Error for UnknownKindError {}

/// Layers an edge's endpoints must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointRule {
    pub source: Layer,
    pub target: Layer,
}

impl EndpointRule {
    const fn new(source: Layer, target: Layer) -> Self {
        Self { source, target }
    }

    /// Returns whether a concrete (source, target) kind pair satisfies this rule.
    pub fn permits(&self, source: EntityKind, target: EntityKind) -> bool {
        kind_satisfies(source, self.source) && kind_satisfies(target, self.target)
    }
}

/// Ordered layer chain for a kind, least to most specialized.
pub fn layers_for(kind: EntityKind) -> &'static [Layer] {
    match kind {
        EntityKind::Work => &[Layer::Work],
        EntityKind::Expression => &[Layer::Expression],
        EntityKind::Manifestation => &[Layer::Manifestation],
        EntityKind::Item => &[Layer::Item],
        EntityKind::Agent => &[Layer::Agent],
        EntityKind::Person => &[Layer::Agent, Layer::Person],
        EntityKind::CollectiveAgent => &[Layer::Agent, Layer::CollectiveAgent],
        EntityKind::Nomen => &[Layer::Nomen],
        EntityKind::Place => &[Layer::Place],
        EntityKind::TimeSpan => &[Layer::TimeSpan],
        EntityKind::Language => &[Layer::Language],
        EntityKind::ContentRating => &[Layer::ContentRating],
        EntityKind::Type => &[Layer::Type],
        EntityKind::Status => &[Layer::Status],
        EntityKind::Tag => &[Layer::Tag],
        EntityKind::DigitalResource => &[Layer::DigitalResource],
        EntityKind::Image => &[Layer::DigitalResource, Layer::Image],
        EntityKind::Link => &[Layer::DigitalResource, Layer::Link],
        EntityKind::RssFeed => &[Layer::DigitalResource, Layer::RssFeed],
        EntityKind::File => &[Layer::DigitalResource, Layer::File],
    }
}

/// Parent layer a layer row is foreign-keyed to. `None` for the root.
pub fn parent_layer(layer: Layer) -> Option<Layer> {
    match layer {
        Layer::Resource => None,
        Layer::Person | Layer::CollectiveAgent => Some(Layer::Agent),
        Layer::Image | Layer::Link | Layer::RssFeed | Layer::File => {
            Some(Layer::DigitalResource)
        }
        _ => Some(Layer::Resource),
    }
}

/// Returns whether an entity of `kind` is-a `layer`.
pub fn kind_satisfies(kind: EntityKind, layer: Layer) -> bool {
    layer == Layer::Resource || layers_for(kind).contains(&layer)
}

/// Allowed endpoint layers for a relationship kind.
pub fn allowed_endpoint_kinds(rel_type: RelType) -> EndpointRule {
    use Layer as L;
    match rel_type {
        RelType::ExpressionRealizesWork => EndpointRule::new(L::Expression, L::Work),
        RelType::ManifestationEmbodiesExpression => {
            EndpointRule::new(L::Manifestation, L::Expression)
        }
        RelType::ItemExemplifiesManifestation => EndpointRule::new(L::Item, L::Manifestation),
        RelType::WorkCreatedBy => EndpointRule::new(L::Work, L::Agent),
        RelType::ExpressionCreatedBy => EndpointRule::new(L::Expression, L::Agent),
        RelType::ManifestationCreatedBy
        | RelType::ManifestationManufacturedBy
        | RelType::ManifestationDistributedBy => EndpointRule::new(L::Manifestation, L::Agent),
        RelType::ItemOwnedBy | RelType::ItemModifiedBy => EndpointRule::new(L::Item, L::Agent),
        RelType::PersonMemberOf => EndpointRule::new(L::Person, L::CollectiveAgent),
        RelType::CollectiveAgentPartOf | RelType::CollectiveAgentPrecededBy => {
            EndpointRule::new(L::CollectiveAgent, L::CollectiveAgent)
        }
        RelType::AgentAssociatedWithPlace => EndpointRule::new(L::Agent, L::Place),
        RelType::ResourceHasAppellation => EndpointRule::new(L::Resource, L::Nomen),
        RelType::NomenDerivedFrom | RelType::NomenEquivalentTo => {
            EndpointRule::new(L::Nomen, L::Nomen)
        }
        RelType::NomenInLanguage => EndpointRule::new(L::Nomen, L::Language),
        RelType::WorkHasSubject => EndpointRule::new(L::Work, L::Resource),
        RelType::WorkHasPart
        | RelType::WorkPrecedes
        | RelType::WorkAccompanies
        | RelType::WorkInspiredBy
        | RelType::WorkTransformedFrom => EndpointRule::new(L::Work, L::Work),
        RelType::ExpressionHasPart | RelType::ExpressionDerivedFrom => {
            EndpointRule::new(L::Expression, L::Expression)
        }
        RelType::ExpressionInLanguage => EndpointRule::new(L::Expression, L::Language),
        RelType::ExpressionHasContentRating => {
            EndpointRule::new(L::Expression, L::ContentRating)
        }
        RelType::ManifestationHasPart | RelType::ManifestationReproduces => {
            EndpointRule::new(L::Manifestation, L::Manifestation)
        }
        RelType::ManifestationReproducesItem => EndpointRule::new(L::Manifestation, L::Item),
        RelType::ResourceHasPlace => EndpointRule::new(L::Resource, L::Place),
        RelType::ResourceHasTimeSpan => EndpointRule::new(L::Resource, L::TimeSpan),
        RelType::PlacePartOf => EndpointRule::new(L::Place, L::Place),
        RelType::TimeSpanPartOf => EndpointRule::new(L::TimeSpan, L::TimeSpan),
        RelType::ResourceHasType => EndpointRule::new(L::Resource, L::Type),
        RelType::ResourceHasStatus => EndpointRule::new(L::Resource, L::Status),
        RelType::ResourceHasTag => EndpointRule::new(L::Resource, L::Tag),
        RelType::TagNarrowerThan => EndpointRule::new(L::Tag, L::Tag),
        RelType::ResourceDepictedBy => EndpointRule::new(L::Resource, L::Image),
        RelType::ResourceHasLink => EndpointRule::new(L::Resource, L::Link),
        RelType::AgentHasRssFeed => EndpointRule::new(L::Agent, L::RssFeed),
        RelType::ItemHasFile => EndpointRule::new(L::Item, L::File),
    }
}

/// Parses an entity kind discriminator.
pub fn parse_entity_kind(value: &str) -> Result<EntityKind, UnknownKindError> {
    EntityKind::parse(value.trim()).ok_or_else(|| UnknownKindError(value.to_string()))
}

/// Parses a relationship kind discriminator.
pub fn parse_rel_type(value: &str) -> Result<RelType, UnknownKindError> {
    RelType::parse(value.trim()).ok_or_else(|| UnknownKindError(value.to_string()))
}

pub fn all_entity_kinds() -> &'static [EntityKind] {
    &EntityKind::ALL
}

pub fn all_rel_types() -> &'static [RelType] {
    &RelType::ALL
}
