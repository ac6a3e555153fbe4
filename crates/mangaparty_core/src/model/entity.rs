//! Entity domain model: root resource plus specialization layers.
//!
//! # Responsibility
//! - Define the root `Resource` record shared by every entity.
//! - Define one attribute set per layer table.
//! - Validate attribute values before they reach storage.
//!
//! # Invariants
//! - `Resource.id` is generated by the store and never reused.
//! - An `Entity` carries exactly the layers of its kind, least specialized
//!   first.
//!
//! # See also
//! - `crate::registry` for kind/layer chains.

use crate::model::kind::{EntityKind, Layer};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier shared by the root row and all layer rows of an entity.
pub type ResourceId = Uuid;

/// Free-form JSON object stored for representative attributes.
pub type AttributeMap = serde_json::Map<String, serde_json::Value>;

static LANGUAGE_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("valid language code regex")
});
static HTTP_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid url regex"));

/// Attribute validation failures detected before any write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is blank after trim.
    BlankField { layer: Layer, field: &'static str },
    /// Numeric field must not be negative.
    NegativeValue {
        layer: Layer,
        field: &'static str,
        value: i64,
    },
    /// Language code is not a lowercase BCP-47-like tag.
    InvalidLanguageCode(String),
    /// Digital resource URL is not an absolute http(s) URL.
    InvalidUrl(String),
    /// Validity interval ends before it starts.
    IntervalEndBeforeStart { valid_from: i64, valid_until: i64 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField { layer, field } => {
                write!(f, "{layer}.{field} must not be blank")
            }
            Self::NegativeValue {
                layer,
                field,
                value,
            } => write!(f, "{layer}.{field} must not be negative, got {value}"),
            Self::InvalidLanguageCode(code) => write!(f, "invalid language code `{code}`"),
            Self::InvalidUrl(url) => write!(f, "invalid http(s) url `{url}`"),
            Self::IntervalEndBeforeStart {
                valid_from,
                valid_until,
            } => write!(
                f,
                "valid_until ({valid_until}) must be >= valid_from ({valid_from})"
            ),
        }
    }
}

impl Error for ValidationError {}

/// Root record every entity extends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub kind: EntityKind,
    /// Ordered free-text notes.
    pub notes: Vec<String>,
    /// Epoch milliseconds, assigned by the store.
    pub created_at: i64,
    /// Epoch milliseconds of the last attribute mutation.
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkAttributes {
    pub category: Vec<String>,
    pub representative_attributes: AttributeMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionAttributes {
    pub category: Vec<String>,
    pub extent: Option<String>,
    pub intended_audience: Vec<String>,
    pub use_rights: Vec<String>,
    pub representative_attributes: AttributeMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestationAttributes {
    pub category: Vec<String>,
    pub extent: Option<String>,
    pub intended_audience: Vec<String>,
    /// Transcribed statements (title page, colophon, imprint).
    pub manifestation_statement: Vec<String>,
    pub access_conditions: Vec<String>,
    pub use_rights: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAttributes {
    pub location: Vec<String>,
    pub use_rights: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAttributes {
    pub contact_info: Vec<String>,
    pub field_of_activity: Vec<String>,
    pub language: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonAttributes {
    pub profession: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectiveAgentAttributes {
    pub category: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NomenAttributes {
    pub nomen_string: String,
    pub scheme: Option<String>,
    pub category: Vec<String>,
    pub context_of_use: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceAttributes {
    pub category: Vec<String>,
    /// Free-form location, e.g. coordinates.
    pub location: Option<String>,
}

/// Begin/end are kept as text so imprecise dates ("1990s") survive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpanAttributes {
    pub beginning: Option<String>,
    pub ending: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageAttributes {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRatingAttributes {
    pub system: String,
    pub rating: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAttributes {
    pub name: String,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusAttributes {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagAttributes {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalResourceAttributes {
    pub url: String,
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttributes {
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAttributes {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RssFeedAttributes {
    pub title: Option<String>,
    /// Epoch milliseconds of the last successful fetch.
    pub last_fetched_at: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttributes {
    pub file_name: String,
    pub byte_size: Option<i64>,
    pub checksum: Option<String>,
}

/// Attribute set of one layer row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum LayerAttributes {
    Work(WorkAttributes),
    Expression(ExpressionAttributes),
    Manifestation(ManifestationAttributes),
    Item(ItemAttributes),
    Agent(AgentAttributes),
    Person(PersonAttributes),
    CollectiveAgent(CollectiveAgentAttributes),
    Nomen(NomenAttributes),
    Place(PlaceAttributes),
    TimeSpan(TimeSpanAttributes),
    Language(LanguageAttributes),
    ContentRating(ContentRatingAttributes),
    Type(TypeAttributes),
    Status(StatusAttributes),
    Tag(TagAttributes),
    DigitalResource(DigitalResourceAttributes),
    Image(ImageAttributes),
    Link(LinkAttributes),
    RssFeed(RssFeedAttributes),
    File(FileAttributes),
}

impl LayerAttributes {
    /// Layer table this attribute set belongs to.
    pub fn layer(&self) -> Layer {
        match self {
            Self::Work(_) => Layer::Work,
            Self::Expression(_) => Layer::Expression,
            Self::Manifestation(_) => Layer::Manifestation,
            Self::Item(_) => Layer::Item,
            Self::Agent(_) => Layer::Agent,
            Self::Person(_) => Layer::Person,
            Self::CollectiveAgent(_) => Layer::CollectiveAgent,
            Self::Nomen(_) => Layer::Nomen,
            Self::Place(_) => Layer::Place,
            Self::TimeSpan(_) => Layer::TimeSpan,
            Self::Language(_) => Layer::Language,
            Self::ContentRating(_) => Layer::ContentRating,
            Self::Type(_) => Layer::Type,
            Self::Status(_) => Layer::Status,
            Self::Tag(_) => Layer::Tag,
            Self::DigitalResource(_) => Layer::DigitalResource,
            Self::Image(_) => Layer::Image,
            Self::Link(_) => Layer::Link,
            Self::RssFeed(_) => Layer::RssFeed,
            Self::File(_) => Layer::File,
        }
    }

    /// Checks field-level constraints that SQL columns cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let layer = self.layer();
        match self {
            Self::Nomen(attrs) => require_text(layer, "nomen_string", &attrs.nomen_string),
            Self::Language(attrs) => {
                require_text(layer, "name", &attrs.name)?;
                if !LANGUAGE_CODE_RE.is_match(&attrs.code) {
                    return Err(ValidationError::InvalidLanguageCode(attrs.code.clone()));
                }
                Ok(())
            }
            Self::ContentRating(attrs) => {
                require_text(layer, "system", &attrs.system)?;
                require_text(layer, "rating", &attrs.rating)
            }
            Self::Type(attrs) => require_text(layer, "name", &attrs.name),
            Self::Status(attrs) => require_text(layer, "name", &attrs.name),
            Self::Tag(attrs) => require_text(layer, "name", &attrs.name),
            Self::DigitalResource(attrs) => {
                if !HTTP_URL_RE.is_match(&attrs.url) {
                    return Err(ValidationError::InvalidUrl(attrs.url.clone()));
                }
                Ok(())
            }
            Self::Image(attrs) => {
                require_non_negative(layer, "width", attrs.width)?;
                require_non_negative(layer, "height", attrs.height)
            }
            Self::File(attrs) => {
                require_text(layer, "file_name", &attrs.file_name)?;
                require_non_negative(layer, "byte_size", attrs.byte_size)
            }
            _ => Ok(()),
        }
    }
}

fn require_text(layer: Layer, field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField { layer, field });
    }
    Ok(())
}

fn require_non_negative(
    layer: Layer,
    field: &'static str,
    value: Option<i64>,
) -> Result<(), ValidationError> {
    match value {
        Some(value) if value < 0 => Err(ValidationError::NegativeValue {
            layer,
            field,
            value,
        }),
        _ => Ok(()),
    }
}

/// Fully hydrated entity: root record merged with all of its layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub resource: Resource,
    /// Ordered least to most specialized.
    pub layers: Vec<LayerAttributes>,
}

impl Entity {
    pub fn id(&self) -> ResourceId {
        self.resource.id
    }

    pub fn kind(&self) -> EntityKind {
        self.resource.kind
    }

    /// Returns the attribute set of one layer, if this entity has it.
    pub fn layer(&self, layer: Layer) -> Option<&LayerAttributes> {
        self.layers.iter().find(|attrs| attrs.layer() == layer)
    }
}

/// Creation request. The full layer chain must be supplied up front.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntity {
    pub kind: EntityKind,
    pub notes: Vec<String>,
    pub layers: Vec<LayerAttributes>,
}

impl NewEntity {
    pub fn new(kind: EntityKind, layers: Vec<LayerAttributes>) -> Self {
        Self {
            kind,
            notes: Vec::new(),
            layers,
        }
    }

    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// Identity and timestamp assigned on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedEntity {
    pub id: ResourceId,
    pub created_at: i64,
}

/// Attribute replacement for an existing entity.
///
/// Only supplied layers are rewritten; layer membership never changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityUpdate {
    /// `None` keeps current notes.
    pub notes: Option<Vec<String>>,
    pub layers: Vec<LayerAttributes>,
}

#[cfg(test)]
mod tests {
    use super::{
        DigitalResourceAttributes, FileAttributes, LanguageAttributes, LayerAttributes,
        TagAttributes, ValidationError,
    };
    use crate::model::kind::Layer;

    #[test]
    fn blank_tag_name_is_rejected() {
        let attrs = LayerAttributes::Tag(TagAttributes {
            name: "   ".to_string(),
        });
        assert_eq!(
            attrs.validate(),
            Err(ValidationError::BlankField {
                layer: Layer::Tag,
                field: "name"
            })
        );
    }

    #[test]
    fn language_code_must_look_like_a_tag() {
        let valid = LayerAttributes::Language(LanguageAttributes {
            code: "ja-Latn".to_string(),
            name: "Japanese (romanized)".to_string(),
        });
        assert!(valid.validate().is_ok());

        let invalid = LayerAttributes::Language(LanguageAttributes {
            code: "Japanese".to_string(),
            name: "Japanese".to_string(),
        });
        assert!(matches!(
            invalid.validate(),
            Err(ValidationError::InvalidLanguageCode(_))
        ));
    }

    #[test]
    fn digital_resource_requires_http_url() {
        let attrs = LayerAttributes::DigitalResource(DigitalResourceAttributes {
            url: "ftp://example.com/cover.png".to_string(),
            media_type: None,
        });
        assert!(matches!(
            attrs.validate(),
            Err(ValidationError::InvalidUrl(_))
        ));

        let attrs = LayerAttributes::DigitalResource(DigitalResourceAttributes {
            url: "https://example.com/cover.png".to_string(),
            media_type: Some("image/png".to_string()),
        });
        assert!(attrs.validate().is_ok());
    }

    #[test]
    fn negative_file_size_is_rejected() {
        let attrs = LayerAttributes::File(FileAttributes {
            file_name: "vol1.cbz".to_string(),
            byte_size: Some(-1),
            checksum: None,
        });
        assert!(matches!(
            attrs.validate(),
            Err(ValidationError::NegativeValue {
                field: "byte_size",
                ..
            })
        ));
    }
}
