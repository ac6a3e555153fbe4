//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `mangaparty_core` linkage.
//! - Open the configured store and run one create/link/query round-trip.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `mangaparty_cli [config.json]`. Without a config file the probe runs
//! against an in-memory database.

use mangaparty_core::model::entity::{AgentAttributes, PersonAttributes, WorkAttributes};
use mangaparty_core::{
    all_entity_kinds, all_rel_types, open_store, CoreConfig, Direction, EntityKind, EntityService, GraphService, LayerAttributes,
    NewEntity, NewRelationship, QueryService, RelType, SqliteEntityRepository,
    SqliteRelationshipRepository,
};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => CoreConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => CoreConfig::default(),
    };
    config.init_logging()?;

    println!("mangaparty_core ping={}", mangaparty_core::ping());
    println!("mangaparty_core version={}", mangaparty_core::core_version());
    println!(
        "mangaparty_core catalog entity_kinds={} rel_types={}",
        all_entity_kinds().len(),
        all_rel_types().len()
    );

    let conn = open_store(&config)?;
    let entities = EntityService::with_config(SqliteEntityRepository::try_new(&conn)?, &config);
    let graph = GraphService::with_config(SqliteRelationshipRepository::try_new(&conn)?, &config);
    let query = QueryService::with_config(
        SqliteEntityRepository::try_new(&conn)?,
        SqliteRelationshipRepository::try_new(&conn)?,
        &config,
    );

    let person = entities.create_entity(&NewEntity::new(
        EntityKind::Person,
        vec![
            LayerAttributes::Agent(AgentAttributes::default()),
            LayerAttributes::Person(PersonAttributes {
                profession: vec!["illustrator".to_string()],
            }),
        ],
    ))?;
    let work = entities.create_entity(&NewEntity::new(
        EntityKind::Work,
        vec![LayerAttributes::Work(WorkAttributes {
            category: vec!["manga".to_string()],
            ..WorkAttributes::default()
        })],
    ))?;
    graph.create_relationship(&NewRelationship::new(
        work.id,
        RelType::WorkCreatedBy,
        person.id,
    ))?;

    let works = query.works_created_by(person.id)?;
    let creators = graph
        .traverse(work.id, RelType::WorkCreatedBy, Direction::Outbound)
        .collect::<Result<Vec<_>, _>>()?;
    println!("mangaparty_core probe works_created_by={}", works.len());
    println!("mangaparty_core probe creators_of={}", creators.len());
    Ok(())
}
