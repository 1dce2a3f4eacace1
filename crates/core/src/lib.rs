#![warn(clippy::all, missing_docs)]

//! Core domain logic for the warscroll roster builder.
//!
//! This crate hosts the catalog, the roster model with its composition
//! rules, battalion reconciliation, configuration handling and the
//! persistence layer used by the command line front end.

pub mod catalog;
pub mod config;
pub mod manifest;
pub mod roster;
pub mod save;
pub mod store;

pub use catalog::{Catalog, CatalogLoader};
pub use config::AppConfig;
pub use manifest::CatalogMetadata;
pub use roster::{BattlelineTiers, Composition, Roster, RosterBattalionId, RosterUnitId};
pub use save::{FileStore, KeyValueStore, MemoryStore, SaveManager, StoreError};
pub use store::{RosterChange, RosterStore};
