//! Persistence layer for the location relay.
//!
//! This crate contains:
//! - Database connection management and migrations
//! - Entity definitions (database row mappings)
//! - Postgres repositories implementing the domain store traits
//! - An in-memory store for development and tests

pub mod db;
pub mod entities;
pub mod memory;
pub mod metrics;
pub mod repositories;

pub use memory::MemoryStore;
