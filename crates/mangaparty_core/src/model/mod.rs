//! Domain model for bibliographic resources and the edges between them.
//!
//! # Responsibility
//! - Define canonical data structures used by the entity store and the
//!   relationship graph.
//! - Keep discriminators closed so new kinds are compile-time checked.
//!
//! # Invariants
//! - Every entity is identified by the `ResourceId` of its root row.
//! - Deletion is a hard delete; layers and incident edges go with the root.

pub mod entity;
pub mod kind;
pub mod relationship;
