//! Column mapping between layer attribute sets and layer tables.
//!
//! # Invariants
//! - `layer_columns(layer)` and `layer_values(attrs)` list columns in the
//!   same order.
//! - List-valued attributes are JSON arrays in TEXT columns; the
//!   representative attribute map is a JSON object.

use super::{parse_uuid, placeholders, RepoError, RepoResult, ID_CHUNK_SIZE};
use crate::model::entity::*;
use crate::model::kind::Layer;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::HashMap;

/// Attribute columns of a layer table, excluding `id`.
pub(super) fn layer_columns(layer: Layer) -> &'static [&'static str] {
    match layer {
        Layer::Resource => &[],
        Layer::Work => &["category", "representative_attributes"],
        Layer::Expression => &[
            "category",
            "extent",
            "intended_audience",
            "use_rights",
            "representative_attributes",
        ],
        Layer::Manifestation => &[
            "category",
            "extent",
            "intended_audience",
            "manifestation_statement",
            "access_conditions",
            "use_rights",
        ],
        Layer::Item => &["location", "use_rights"],
        Layer::Agent => &["contact_info", "field_of_activity", "language"],
        Layer::Person => &["profession"],
        Layer::CollectiveAgent => &["category"],
        Layer::Nomen => &["nomen_string", "scheme", "category", "context_of_use"],
        Layer::Place => &["category", "location"],
        Layer::TimeSpan => &["beginning", "ending"],
        Layer::Language => &["code", "name"],
        Layer::ContentRating => &["system", "rating"],
        Layer::Type => &["name", "scope"],
        Layer::Status | Layer::Tag => &["name"],
        Layer::DigitalResource => &["url", "media_type"],
        Layer::Image => &["width", "height", "alt_text"],
        Layer::Link => &["title"],
        Layer::RssFeed => &["title", "last_fetched_at"],
        Layer::File => &["file_name", "byte_size", "checksum"],
    }
}

/// Bind values for `layer_columns(attrs.layer())`, in order.
pub(super) fn layer_values(attrs: &LayerAttributes) -> RepoResult<Vec<Value>> {
    let values = match attrs {
        LayerAttributes::Work(a) => vec![
            text_list(&a.category)?,
            object(&a.representative_attributes)?,
        ],
        LayerAttributes::Expression(a) => vec![
            text_list(&a.category)?,
            opt_text(&a.extent),
            text_list(&a.intended_audience)?,
            text_list(&a.use_rights)?,
            object(&a.representative_attributes)?,
        ],
        LayerAttributes::Manifestation(a) => vec![
            text_list(&a.category)?,
            opt_text(&a.extent),
            text_list(&a.intended_audience)?,
            text_list(&a.manifestation_statement)?,
            text_list(&a.access_conditions)?,
            text_list(&a.use_rights)?,
        ],
        LayerAttributes::Item(a) => vec![text_list(&a.location)?, text_list(&a.use_rights)?],
        LayerAttributes::Agent(a) => vec![
            text_list(&a.contact_info)?,
            text_list(&a.field_of_activity)?,
            text_list(&a.language)?,
        ],
        LayerAttributes::Person(a) => vec![text_list(&a.profession)?],
        LayerAttributes::CollectiveAgent(a) => vec![text_list(&a.category)?],
        LayerAttributes::Nomen(a) => vec![
            Value::Text(a.nomen_string.clone()),
            opt_text(&a.scheme),
            text_list(&a.category)?,
            text_list(&a.context_of_use)?,
        ],
        LayerAttributes::Place(a) => vec![text_list(&a.category)?, opt_text(&a.location)],
        LayerAttributes::TimeSpan(a) => vec![opt_text(&a.beginning), opt_text(&a.ending)],
        LayerAttributes::Language(a) => {
            vec![Value::Text(a.code.clone()), Value::Text(a.name.clone())]
        }
        LayerAttributes::ContentRating(a) => {
            vec![Value::Text(a.system.clone()), Value::Text(a.rating.clone())]
        }
        LayerAttributes::Type(a) => vec![Value::Text(a.name.clone()), opt_text(&a.scope)],
        LayerAttributes::Status(a) => vec![Value::Text(a.name.clone())],
        LayerAttributes::Tag(a) => vec![Value::Text(a.name.clone())],
        LayerAttributes::DigitalResource(a) => {
            vec![Value::Text(a.url.clone()), opt_text(&a.media_type)]
        }
        LayerAttributes::Image(a) => vec![
            opt_int(a.width),
            opt_int(a.height),
            opt_text(&a.alt_text),
        ],
        LayerAttributes::Link(a) => vec![opt_text(&a.title)],
        LayerAttributes::RssFeed(a) => vec![opt_text(&a.title), opt_int(a.last_fetched_at)],
        LayerAttributes::File(a) => vec![
            Value::Text(a.file_name.clone()),
            opt_int(a.byte_size),
            opt_text(&a.checksum),
        ],
    };
    Ok(values)
}

/// Inserts one layer row keyed by the root identity.
pub(super) fn insert_layer(
    conn: &Connection,
    id: ResourceId,
    attrs: &LayerAttributes,
) -> RepoResult<()> {
    let layer = attrs.layer();
    let columns = layer_columns(layer);
    let sql = format!(
        "INSERT INTO {} (id, {}) VALUES (?, {});",
        layer.table(),
        columns.join(", "),
        placeholders(columns.len())
    );
    let mut values = Vec::with_capacity(columns.len() + 1);
    values.push(Value::Text(id.to_string()));
    values.extend(layer_values(attrs)?);
    conn.execute(&sql, params_from_iter(values))?;
    Ok(())
}

/// Rewrites all attribute columns of one layer row. Returns changed rows.
pub(super) fn update_layer(
    conn: &Connection,
    id: ResourceId,
    attrs: &LayerAttributes,
) -> RepoResult<usize> {
    let layer = attrs.layer();
    let assignments = layer_columns(layer)
        .iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE {} SET {assignments} WHERE id = ?;", layer.table());
    let mut values = layer_values(attrs)?;
    values.push(Value::Text(id.to_string()));
    let changed = conn.execute(&sql, params_from_iter(values))?;
    Ok(changed)
}

/// Loads layer rows for many ids with one statement per id chunk.
///
/// Ids without a row are simply absent from the returned map.
pub(super) fn load_layer_rows(
    conn: &Connection,
    layer: Layer,
    ids: &[ResourceId],
) -> RepoResult<HashMap<ResourceId, LayerAttributes>> {
    let mut found = HashMap::with_capacity(ids.len());
    let columns = layer_columns(layer);
    if columns.is_empty() {
        return Err(RepoError::InvalidData(format!(
            "layer `{layer}` has no attribute table"
        )));
    }

    for chunk in ids.chunks(ID_CHUNK_SIZE) {
        let sql = format!(
            "SELECT id, {} FROM {} WHERE id IN ({});",
            columns.join(", "),
            layer.table(),
            placeholders(chunk.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(chunk.iter().map(|id| id.to_string())))?;
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let id = parse_uuid(&id_text, "layer.id")?;
            found.insert(id, parse_layer_row(layer, row)?);
        }
    }
    Ok(found)
}

fn parse_layer_row(layer: Layer, row: &Row<'_>) -> RepoResult<LayerAttributes> {
    let attrs = match layer {
        Layer::Resource => {
            return Err(RepoError::InvalidData(
                "resource is not a layer table".to_string(),
            ))
        }
        Layer::Work => LayerAttributes::Work(WorkAttributes {
            category: list(row, layer, "category")?,
            representative_attributes: map(row, layer, "representative_attributes")?,
        }),
        Layer::Expression => LayerAttributes::Expression(ExpressionAttributes {
            category: list(row, layer, "category")?,
            extent: row.get("extent")?,
            intended_audience: list(row, layer, "intended_audience")?,
            use_rights: list(row, layer, "use_rights")?,
            representative_attributes: map(row, layer, "representative_attributes")?,
        }),
        Layer::Manifestation => LayerAttributes::Manifestation(ManifestationAttributes {
            category: list(row, layer, "category")?,
            extent: row.get("extent")?,
            intended_audience: list(row, layer, "intended_audience")?,
            manifestation_statement: list(row, layer, "manifestation_statement")?,
            access_conditions: list(row, layer, "access_conditions")?,
            use_rights: list(row, layer, "use_rights")?,
        }),
        Layer::Item => LayerAttributes::Item(ItemAttributes {
            location: list(row, layer, "location")?,
            use_rights: list(row, layer, "use_rights")?,
        }),
        Layer::Agent => LayerAttributes::Agent(AgentAttributes {
            contact_info: list(row, layer, "contact_info")?,
            field_of_activity: list(row, layer, "field_of_activity")?,
            language: list(row, layer, "language")?,
        }),
        Layer::Person => LayerAttributes::Person(PersonAttributes {
            profession: list(row, layer, "profession")?,
        }),
        Layer::CollectiveAgent => LayerAttributes::CollectiveAgent(CollectiveAgentAttributes {
            category: list(row, layer, "category")?,
        }),
        Layer::Nomen => LayerAttributes::Nomen(NomenAttributes {
            nomen_string: row.get("nomen_string")?,
            scheme: row.get("scheme")?,
            category: list(row, layer, "category")?,
            context_of_use: list(row, layer, "context_of_use")?,
        }),
        Layer::Place => LayerAttributes::Place(PlaceAttributes {
            category: list(row, layer, "category")?,
            location: row.get("location")?,
        }),
        Layer::TimeSpan => LayerAttributes::TimeSpan(TimeSpanAttributes {
            beginning: row.get("beginning")?,
            ending: row.get("ending")?,
        }),
        Layer::Language => LayerAttributes::Language(LanguageAttributes {
            code: row.get("code")?,
            name: row.get("name")?,
        }),
        Layer::ContentRating => LayerAttributes::ContentRating(ContentRatingAttributes {
            system: row.get("system")?,
            rating: row.get("rating")?,
        }),
        Layer::Type => LayerAttributes::Type(TypeAttributes {
            name: row.get("name")?,
            scope: row.get("scope")?,
        }),
        Layer::Status => LayerAttributes::Status(StatusAttributes {
            name: row.get("name")?,
        }),
        Layer::Tag => LayerAttributes::Tag(TagAttributes {
            name: row.get("name")?,
        }),
        Layer::DigitalResource => LayerAttributes::DigitalResource(DigitalResourceAttributes {
            url: row.get("url")?,
            media_type: row.get("media_type")?,
        }),
        Layer::Image => LayerAttributes::Image(ImageAttributes {
            width: row.get("width")?,
            height: row.get("height")?,
            alt_text: row.get("alt_text")?,
        }),
        Layer::Link => LayerAttributes::Link(LinkAttributes {
            title: row.get("title")?,
        }),
        Layer::RssFeed => LayerAttributes::RssFeed(RssFeedAttributes {
            title: row.get("title")?,
            last_fetched_at: row.get("last_fetched_at")?,
        }),
        Layer::File => LayerAttributes::File(FileAttributes {
            file_name: row.get("file_name")?,
            byte_size: row.get("byte_size")?,
            checksum: row.get("checksum")?,
        }),
    };
    Ok(attrs)
}

pub(super) fn text_list(values: &[String]) -> RepoResult<Value> {
    serde_json::to_string(values)
        .map(Value::Text)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode text list: {err}")))
}

fn object(values: &AttributeMap) -> RepoResult<Value> {
    serde_json::to_string(values)
        .map(Value::Text)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode attribute map: {err}")))
}

fn opt_text(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::Text)
}

fn opt_int(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

pub(super) fn decode_list(raw: &str, table: &str, column: &str) -> RepoResult<Vec<String>> {
    serde_json::from_str(raw).map_err(|_| {
        RepoError::InvalidData(format!("invalid json text list in {table}.{column}"))
    })
}

fn list(row: &Row<'_>, layer: Layer, column: &'static str) -> RepoResult<Vec<String>> {
    let raw: String = row.get(column)?;
    decode_list(&raw, layer.table(), column)
}

fn map(row: &Row<'_>, layer: Layer, column: &'static str) -> RepoResult<AttributeMap> {
    let raw: String = row.get(column)?;
    serde_json::from_str(&raw).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid json object in {}.{column}",
            layer.table()
        ))
    })
}
