//! Persistence layer for the skywatch server.
//!
//! SQLite-backed storage for flights, alerts, restricted regions, and
//! operator accounts. Hot reads (latest snapshot, active regions) are
//! served from in-memory caches rebuilt from these tables.

pub mod alerts;
pub mod db;
pub mod flights;
pub mod operators;
pub mod regions;

pub use db::{init_database, Database};
