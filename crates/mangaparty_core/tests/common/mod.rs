#![allow(dead_code)]

use mangaparty_core::model::entity::*;
use mangaparty_core::{
    open_db_in_memory, EntityKind, EntityRepository, NewEntity, ResourceId,
    SqliteEntityRepository,
};
use rusqlite::Connection;
use serde_json::json;

pub fn open() -> Connection {
    open_db_in_memory().unwrap()
}

/// Valid layer attributes for every layer of `kind`, parent first.
pub fn sample_layers(kind: EntityKind) -> Vec<LayerAttributes> {
    let dr = || {
        LayerAttributes::DigitalResource(DigitalResourceAttributes {
            url: "https://example.org/resource".to_string(),
            media_type: Some("text/html".to_string()),
        })
    };
    let agent = || {
        LayerAttributes::Agent(AgentAttributes {
            contact_info: vec!["studio@example.org".to_string()],
            field_of_activity: vec!["comics".to_string()],
            language: vec!["ja".to_string()],
        })
    };

    match kind {
        EntityKind::Work => {
            let mut representative = AttributeMap::new();
            representative.insert("title".to_string(), json!("Yotsuba&!"));
            representative.insert("volumes".to_string(), json!(15));
            vec![LayerAttributes::Work(WorkAttributes {
                category: vec!["manga".to_string(), "comedy".to_string()],
                representative_attributes: representative,
            })]
        }
        EntityKind::Expression => vec![LayerAttributes::Expression(ExpressionAttributes {
            category: vec!["text".to_string()],
            extent: Some("220 pages".to_string()),
            intended_audience: vec!["all ages".to_string()],
            use_rights: Vec::new(),
            representative_attributes: AttributeMap::new(),
        })],
        EntityKind::Manifestation => {
            vec![LayerAttributes::Manifestation(ManifestationAttributes {
                category: vec!["volume".to_string()],
                extent: Some("1 volume".to_string()),
                intended_audience: Vec::new(),
                manifestation_statement: vec!["Tokyo : ASCII Media Works, 2003".to_string()],
                access_conditions: Vec::new(),
                use_rights: vec!["all rights reserved".to_string()],
            })]
        }
        EntityKind::Item => vec![LayerAttributes::Item(ItemAttributes {
            location: vec!["shelf 3".to_string()],
            use_rights: Vec::new(),
        })],
        EntityKind::Agent => vec![agent()],
        EntityKind::Person => vec![
            agent(),
            LayerAttributes::Person(PersonAttributes {
                profession: vec!["illustrator".to_string()],
            }),
        ],
        EntityKind::CollectiveAgent => vec![
            agent(),
            LayerAttributes::CollectiveAgent(CollectiveAgentAttributes {
                category: vec!["publisher".to_string()],
            }),
        ],
        EntityKind::Nomen => vec![LayerAttributes::Nomen(NomenAttributes {
            nomen_string: "Azuma Kiyohiko".to_string(),
            scheme: Some("romaji".to_string()),
            category: vec!["name".to_string()],
            context_of_use: Vec::new(),
        })],
        EntityKind::Place => vec![LayerAttributes::Place(PlaceAttributes {
            category: vec!["city".to_string()],
            location: Some("35.68,139.69".to_string()),
        })],
        EntityKind::TimeSpan => vec![LayerAttributes::TimeSpan(TimeSpanAttributes {
            beginning: Some("2003".to_string()),
            ending: None,
        })],
        EntityKind::Language => vec![LayerAttributes::Language(LanguageAttributes {
            code: "ja".to_string(),
            name: "Japanese".to_string(),
        })],
        EntityKind::ContentRating => {
            vec![LayerAttributes::ContentRating(ContentRatingAttributes {
                system: "eirin".to_string(),
                rating: "G".to_string(),
            })]
        }
        EntityKind::Type => vec![LayerAttributes::Type(TypeAttributes {
            name: "one-shot".to_string(),
            scope: Some("work".to_string()),
        })],
        EntityKind::Status => vec![LayerAttributes::Status(StatusAttributes {
            name: "ongoing".to_string(),
        })],
        EntityKind::Tag => vec![LayerAttributes::Tag(TagAttributes {
            name: "Slice of Life".to_string(),
        })],
        EntityKind::DigitalResource => vec![dr()],
        EntityKind::Image => vec![
            dr(),
            LayerAttributes::Image(ImageAttributes {
                width: Some(800),
                height: Some(1200),
                alt_text: Some("cover".to_string()),
            }),
        ],
        EntityKind::Link => vec![
            dr(),
            LayerAttributes::Link(LinkAttributes {
                title: Some("official site".to_string()),
            }),
        ],
        EntityKind::RssFeed => vec![
            dr(),
            LayerAttributes::RssFeed(RssFeedAttributes {
                title: Some("releases".to_string()),
                last_fetched_at: Some(1_700_000_000_000),
            }),
        ],
        EntityKind::File => vec![
            dr(),
            LayerAttributes::File(FileAttributes {
                file_name: "vol01.cbz".to_string(),
                byte_size: Some(52_428_800),
                checksum: Some("sha256:abc".to_string()),
            }),
        ],
    }
}

pub fn sample_entity(kind: EntityKind) -> NewEntity {
    NewEntity::new(kind, sample_layers(kind))
}

/// Creates one entity of `kind` with sample attributes.
pub fn create(conn: &Connection, kind: EntityKind) -> ResourceId {
    let repo = SqliteEntityRepository::try_new(conn).unwrap();
    repo.create_entity(&sample_entity(kind)).unwrap().id
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
