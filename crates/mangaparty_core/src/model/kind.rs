//! Entity kind and layer discriminators.
//!
//! # Responsibility
//! - Define the closed set of entity kinds persisted in `mp_res.kind`.
//! - Define the specialization layers, one per physical layer table.
//!
//! # Invariants
//! - Persisted string values are stable and never reused.
//! - Every kind except the root owns exactly one layer of the same name.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Concrete type of a stored resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Work,
    Expression,
    Manifestation,
    Item,
    /// Agent of unknown or unspecified nature.
    Agent,
    Person,
    CollectiveAgent,
    /// Appellation (name, identifier, title) of another resource.
    Nomen,
    Place,
    TimeSpan,
    Language,
    ContentRating,
    Type,
    Status,
    Tag,
    /// Digital resource without a more specific shape.
    DigitalResource,
    Image,
    Link,
    RssFeed,
    File,
}

impl EntityKind {
    /// All kinds in declaration order.
    pub const ALL: [EntityKind; 20] = [
        EntityKind::Work,
        EntityKind::Expression,
        EntityKind::Manifestation,
        EntityKind::Item,
        EntityKind::Agent,
        EntityKind::Person,
        EntityKind::CollectiveAgent,
        EntityKind::Nomen,
        EntityKind::Place,
        EntityKind::TimeSpan,
        EntityKind::Language,
        EntityKind::ContentRating,
        EntityKind::Type,
        EntityKind::Status,
        EntityKind::Tag,
        EntityKind::DigitalResource,
        EntityKind::Image,
        EntityKind::Link,
        EntityKind::RssFeed,
        EntityKind::File,
    ];

    /// Stable value stored in `mp_res.kind`.
    pub fn as_str(self) -> &'static str {
        self.own_layer().as_str()
    }

    /// Parses a stored or caller-supplied discriminator.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Most specialized layer of this kind.
    pub fn own_layer(self) -> Layer {
        match self {
            Self::Work => Layer::Work,
            Self::Expression => Layer::Expression,
            Self::Manifestation => Layer::Manifestation,
            Self::Item => Layer::Item,
            Self::Agent => Layer::Agent,
            Self::Person => Layer::Person,
            Self::CollectiveAgent => Layer::CollectiveAgent,
            Self::Nomen => Layer::Nomen,
            Self::Place => Layer::Place,
            Self::TimeSpan => Layer::TimeSpan,
            Self::Language => Layer::Language,
            Self::ContentRating => Layer::ContentRating,
            Self::Type => Layer::Type,
            Self::Status => Layer::Status,
            Self::Tag => Layer::Tag,
            Self::DigitalResource => Layer::DigitalResource,
            Self::Image => Layer::Image,
            Self::Link => Layer::Link,
            Self::RssFeed => Layer::RssFeed,
            Self::File => Layer::File,
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One level of the class hierarchy, backed by its own table.
///
/// `Resource` is the shared root; all other layers hang off it directly or
/// through one intermediate layer (`Agent`, `DigitalResource`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Resource,
    Work,
    Expression,
    Manifestation,
    Item,
    Agent,
    Person,
    CollectiveAgent,
    Nomen,
    Place,
    TimeSpan,
    Language,
    ContentRating,
    Type,
    Status,
    Tag,
    DigitalResource,
    Image,
    Link,
    RssFeed,
    File,
}

impl Layer {
    /// Stable layer name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Work => "work",
            Self::Expression => "expression",
            Self::Manifestation => "manifestation",
            Self::Item => "item",
            Self::Agent => "agent",
            Self::Person => "person",
            Self::CollectiveAgent => "collective_agent",
            Self::Nomen => "nomen",
            Self::Place => "place",
            Self::TimeSpan => "time_span",
            Self::Language => "language",
            Self::ContentRating => "content_rating",
            Self::Type => "type",
            Self::Status => "status",
            Self::Tag => "tag",
            Self::DigitalResource => "digital_resource",
            Self::Image => "image",
            Self::Link => "link",
            Self::RssFeed => "rss_feed",
            Self::File => "file",
        }
    }

    /// Physical table holding rows of this layer.
    pub fn table(self) -> &'static str {
        match self {
            Self::Resource => "mp_res",
            Self::Work => "mp_work",
            Self::Expression => "mp_expression",
            Self::Manifestation => "mp_manifestation",
            Self::Item => "mp_item",
            Self::Agent => "mp_agent",
            Self::Person => "mp_person",
            Self::CollectiveAgent => "mp_collective_agent",
            Self::Nomen => "mp_nomen",
            Self::Place => "mp_place",
            Self::TimeSpan => "mp_time_span",
            Self::Language => "mp_language",
            Self::ContentRating => "mp_content_rating",
            Self::Type => "mp_type",
            Self::Status => "mp_status",
            Self::Tag => "mp_tag",
            Self::DigitalResource => "mp_digital_resource",
            Self::Image => "mp_image",
            Self::Link => "mp_link",
            Self::RssFeed => "mp_rss_feed",
            Self::File => "mp_file",
        }
    }
}

impl Display for Layer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
