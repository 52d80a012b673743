//! Persistence for lighting contexts.
//!
//! Handles profile documents and the settings record:
//! - Document codec with per-layer recovery
//! - Schema migration
//! - Collision-free file naming
//! - Profile storage with quarantine of a corrupt default
//! - Batched autosave

pub mod autosave;
pub mod codec;
pub mod filename;
pub mod migration;
pub mod settings;
pub mod store;

pub use autosave::{AutosaveCoordinator, SaveDecision, SavePolicy};
pub use codec::{decode, encode, DecodeReport, DecodedProfile, LayerIssue};
pub use migration::{migrate_document, CURRENT_SCHEMA_VERSION};
pub use settings::{SettingsFile, SettingsRecord, SETTINGS_FILENAME};
pub use store::{ProfileStore, DEFAULT_PROFILE_ID};
