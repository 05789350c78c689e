//! Outbound adapters implementing domain ports.
//!
//! Purpose: Provide concrete implementations of the persistence, chain
//! lookup, and background dispatch ports defined by the domain.
//!
//! - `persistence` — PostgreSQL repositories via Diesel.
//! - `memory` — in-process store for development and tests.
//! - `chain` — HTTP chain indexer client.
//! - `tasks` — Tokio background task dispatcher.

pub mod chain;
pub mod memory;
pub mod persistence;
pub mod tasks;
